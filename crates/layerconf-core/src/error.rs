//! Error types for layerconf
//!
//! Structured errors with context: the config path where the error was
//! detected, a source location where available, and an actionable help
//! message. Every error is raised at the point of detection and
//! propagated unchanged to the caller; the engine never recovers locally.

use std::fmt;

/// Result type alias for layerconf operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for layerconf operations
#[derive(Debug, Clone)]
pub struct Error {
    /// The kind of error that occurred
    pub kind: ErrorKind,
    /// Path in the config where the error occurred (e.g., "database.port")
    pub path: Option<String>,
    /// Source location (file, line) if available
    pub source_location: Option<SourceLocation>,
    /// Actionable help message
    pub help: Option<String>,
    /// Underlying cause (as string for Clone compatibility)
    pub cause: Option<String>,
}

/// Location in a source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

/// Categories of errors that can occur
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Error parsing YAML/JSON
    Parse,
    /// Root or extended document does not resolve to a readable file
    DocumentNotFound { path: String },
    /// Error accessing a path that doesn't exist
    PathNotFound,
    /// A reference marker has no matching value and no default
    UnresolvedReference { expr: String },
    /// Interpolation failed to reach a fixpoint
    CyclicReference { expr: String },
    /// The extension graph contains a cycle
    CyclicExtension,
    /// Type coercion failed
    TypeCoercion,
}

impl Error {
    /// Create a new parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Parse,
            path: None,
            source_location: None,
            help: None,
            cause: Some(message.into()),
        }
    }

    /// Create a document not found error
    pub fn document_not_found(file_path: impl Into<String>) -> Self {
        let fp = file_path.into();
        Self {
            kind: ErrorKind::DocumentNotFound { path: fp.clone() },
            path: None,
            source_location: None,
            help: Some(format!("Check that '{}' exists and is readable", fp)),
            cause: None,
        }
    }

    /// Create a path not found error
    pub fn path_not_found(path: impl Into<String>) -> Self {
        let path_str = path.into();
        Self {
            kind: ErrorKind::PathNotFound,
            path: Some(path_str.clone()),
            source_location: None,
            help: Some(format!(
                "Check that '{}' exists in the configuration",
                path_str
            )),
            cause: None,
        }
    }

    /// Create an unresolved reference error
    ///
    /// `expr` is the marker's path expression; `path` is the location of
    /// the scalar that contained the marker.
    pub fn unresolved_reference(expr: impl Into<String>, path: impl Into<String>) -> Self {
        let expr_str = expr.into();
        Self {
            kind: ErrorKind::UnresolvedReference {
                expr: expr_str.clone(),
            },
            path: Some(path.into()),
            source_location: None,
            help: Some(format!(
                "Define '{}' in the document or overrides, or provide a default: ${{{}, value}}",
                expr_str, expr_str
            )),
            cause: None,
        }
    }

    /// Create a cyclic reference error naming one implicated path
    pub fn cyclic_reference(expr: impl Into<String>, path: impl Into<String>) -> Self {
        let expr_str = expr.into();
        Self {
            kind: ErrorKind::CyclicReference {
                expr: expr_str.clone(),
            },
            path: Some(path.into()),
            source_location: None,
            help: Some("Break the cycle by removing one of the references".into()),
            cause: None,
        }
    }

    /// Create a cyclic extension error naming the full cycle sequence
    pub fn cyclic_extension(chain: Vec<String>) -> Self {
        let chain_str = chain.join(" → ");
        Self {
            kind: ErrorKind::CyclicExtension,
            path: None,
            source_location: None,
            help: Some("Remove one of the extension declarations to break the cycle".into()),
            cause: Some(format!("Chain: {}", chain_str)),
        }
    }

    /// Create a type coercion error
    pub fn type_coercion(
        path: impl Into<String>,
        expected: impl Into<String>,
        got: impl Into<String>,
    ) -> Self {
        Self {
            kind: ErrorKind::TypeCoercion,
            path: Some(path.into()),
            source_location: None,
            help: Some(format!(
                "Ensure the value can be converted to {}",
                expected.into()
            )),
            cause: Some(format!("Got: {}", got.into())),
        }
    }

    /// Add path context to the error
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add source location to the error
    pub fn with_source_location(mut self, loc: SourceLocation) -> Self {
        self.source_location = Some(loc);
        self
    }

    /// Add help message to the error
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Main error message
        match &self.kind {
            ErrorKind::Parse => write!(f, "Parse error")?,
            ErrorKind::DocumentNotFound { path } => {
                write!(f, "Document not found: {}", path)?
            }
            ErrorKind::PathNotFound => write!(f, "Path not found")?,
            ErrorKind::UnresolvedReference { expr } => {
                write!(f, "Unresolved reference: {}", expr)?
            }
            ErrorKind::CyclicReference { expr } => {
                write!(f, "Cyclic reference involving: {}", expr)?
            }
            ErrorKind::CyclicExtension => write!(f, "Cyclic extension detected")?,
            ErrorKind::TypeCoercion => write!(f, "Type coercion failed")?,
        }

        // Path context
        if let Some(path) = &self.path {
            write!(f, "\n  Path: {}", path)?;
        }

        // Source location
        if let Some(loc) = &self.source_location {
            write!(f, "\n  File: {}", loc.file)?;
            if let Some(line) = loc.line {
                write!(f, ":{}", line)?;
                if let Some(column) = loc.column {
                    write!(f, ":{}", column)?;
                }
            }
        }

        // Cause
        if let Some(cause) = &self.cause {
            write!(f, "\n  {}", cause)?;
        }

        // Help
        if let Some(help) = &self.help {
            write!(f, "\n  Help: {}", help)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {}
