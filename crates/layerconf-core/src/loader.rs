//! Document loading and extension resolution
//!
//! The loader reads a root document, resolves its extension declarations
//! (a reserved root-level key naming one or more base documents),
//! deep-merges the results in dependency order, and hands the merged
//! tree to the interpolator. Overrides apply exactly once, to the fully
//! merged tree; intermediate documents are never interpolated on their
//! own.

use std::path::{Path, PathBuf};

use log::debug;

use crate::config::Config;
use crate::error::{Error, Result, SourceLocation};
use crate::overrides::Overrides;
use crate::resolve;
use crate::value::Value;

/// Default reserved key for extension declarations
pub const DEFAULT_EXTENDS_KEY: &str = "extends";

/// Options controlling how documents are loaded
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Reserved root-level key naming the document(s) to extend
    pub extends_key: String,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            extends_key: DEFAULT_EXTENDS_KEY.to_string(),
        }
    }
}

/// Load and resolve the document at `path`
///
/// Extension declarations are resolved recursively (later listed bases
/// override earlier ones, the local document overrides all), then the
/// merged tree is interpolated with `overrides` shadowing
/// document-internal values. The returned configuration contains no
/// reference markers and no extension declarations.
pub fn load(path: impl AsRef<Path>, overrides: &Overrides) -> Result<Config> {
    load_with_options(path, overrides, &LoadOptions::default())
}

/// Load and resolve with explicit options
pub fn load_with_options(
    path: impl AsRef<Path>,
    overrides: &Overrides,
    options: &LoadOptions,
) -> Result<Config> {
    let mut visiting = Vec::new();
    let merged = load_document(path.as_ref(), options, &mut visiting)?;
    let resolved = resolve::interpolate(merged, overrides)?;
    Ok(Config::new(resolved))
}

/// Read, parse, and extension-merge one document (no interpolation)
///
/// `visiting` holds the canonical paths currently being expanded, root
/// first; re-entering one of them is an extension cycle.
fn load_document(
    path: &Path,
    options: &LoadOptions,
    visiting: &mut Vec<PathBuf>,
) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .map_err(|_| Error::document_not_found(path.display().to_string()))?;

    // Canonicalization follows the successful read, so a dangling path
    // reports DocumentNotFound rather than an I/O oddity.
    let canonical = path
        .canonicalize()
        .map_err(|_| Error::document_not_found(path.display().to_string()))?;

    if visiting.contains(&canonical) {
        // Full paths: two same-named files in different directories must
        // stay distinguishable in the reported chain.
        let mut chain: Vec<String> = visiting
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        chain.push(canonical.display().to_string());
        return Err(Error::cyclic_extension(chain));
    }

    let mut tree: Value = serde_yaml::from_str(&content).map_err(|e| {
        let mut err = Error::parse(e.to_string());
        let mut loc = SourceLocation {
            file: path.display().to_string(),
            line: None,
            column: None,
        };
        if let Some(location) = e.location() {
            loc.line = Some(location.line());
            loc.column = Some(location.column());
        }
        err.source_location = Some(loc);
        err
    })?;

    let bases = take_extension_declaration(&mut tree, &options.extends_key, path)?;
    if bases.is_empty() {
        return Ok(tree);
    }

    debug!(
        "{} extends {} document(s)",
        path.display(),
        bases.len()
    );

    visiting.push(canonical);

    // Merge bases in listed order: the last listed wins among bases,
    // and the local document wins over all of them.
    let mut merged = Value::Mapping(indexmap::IndexMap::new());
    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    for base in &bases {
        let base_path = resolve_base_path(&base_dir, base);
        let base_tree = load_document(&base_path, options, visiting)?;
        merged.merge(base_tree);
    }
    merged.merge(tree);

    visiting.pop();

    Ok(merged)
}

/// Remove the extension declaration from the tree root, returning the
/// listed base paths in declaration order
fn take_extension_declaration(
    tree: &mut Value,
    extends_key: &str,
    path: &Path,
) -> Result<Vec<String>> {
    let Value::Mapping(map) = tree else {
        return Ok(Vec::new());
    };
    let Some(declared) = map.shift_remove(extends_key) else {
        return Ok(Vec::new());
    };

    match declared {
        Value::String(base) => Ok(vec![base]),
        Value::Sequence(entries) => entries
            .into_iter()
            .map(|entry| match entry {
                Value::String(base) => Ok(base),
                other => Err(Error::parse(format!(
                    "'{}' entries must be strings, got {}",
                    extends_key,
                    other.type_name()
                ))
                .with_source_location(SourceLocation {
                    file: path.display().to_string(),
                    line: None,
                    column: None,
                })),
            })
            .collect(),
        other => Err(Error::parse(format!(
            "'{}' must be a string or a list of strings, got {}",
            extends_key,
            other.type_name()
        ))
        .with_source_location(SourceLocation {
            file: path.display().to_string(),
            line: None,
            column: None,
        })),
    }
}

/// Resolve a declared base path against the declaring document's directory
fn resolve_base_path(base_dir: &Path, declared: &str) -> PathBuf {
    let declared_path = Path::new(declared);
    if declared_path.is_absolute() {
        declared_path.to_path_buf()
    } else {
        base_dir.join(declared_path)
    }
}
