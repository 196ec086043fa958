//! Reference marker parsing
//!
//! Parses marker expressions embedded in string scalars:
//! - `${path.to.value}` - reference into the document or the overrides
//! - `${path.to.value, default}` - reference with a fallback default
//! - `${servers[0].host}` - sequence indexing
//! - `\${escaped}` - escaped (literal) marker
//! - `${path, ${other.path}}` - markers nested inside defaults
//!
//! Escaped markers are kept verbatim (backslash included) in `Literal`
//! parts; the interpolator rewrites them to literal `${` only after the
//! fixpoint is reached, so an unescaped result is never re-scanned as a
//! live marker.

use crate::error::{Error, Result};

/// A parsed marker expression
#[derive(Debug, Clone, PartialEq)]
pub enum Interpolation {
    /// A literal string (no marker, or an escaped marker kept verbatim)
    Literal(String),
    /// A reference: ${path} or ${path, default}
    Ref {
        /// The path to reference
        path: String,
        /// Fallback used when the path resolves nowhere
        default: Option<Box<Interpolation>>,
    },
    /// A concatenation of multiple parts
    Concat(Vec<Interpolation>),
}

impl Interpolation {
    /// Check if this expression contains any reference
    pub fn has_refs(&self) -> bool {
        match self {
            Interpolation::Literal(_) => false,
            Interpolation::Ref { .. } => true,
            Interpolation::Concat(parts) => parts.iter().any(Interpolation::has_refs),
        }
    }
}

/// Parser for marker expressions
pub struct MarkerParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> MarkerParser<'a> {
    /// Create a new parser for the given input
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Parse the entire input string
    pub fn parse(&mut self) -> Result<Interpolation> {
        let mut parts = Vec::new();

        while !self.is_eof() {
            if self.check_escape() {
                // Keep \${ verbatim; unescaping happens after the fixpoint
                self.advance(); // backslash
                self.advance(); // $
                self.advance(); // {
                parts.push(Interpolation::Literal("\\${".to_string()));
            } else if self.check_marker_start() {
                parts.push(self.parse_marker()?);
            } else {
                let literal = self.collect_literal();
                if !literal.is_empty() {
                    parts.push(Interpolation::Literal(literal));
                }
            }
        }

        // Simplify result
        match parts.len() {
            0 => Ok(Interpolation::Literal(String::new())),
            1 => Ok(parts.remove(0)),
            _ => {
                let merged = merge_adjacent_literals(parts);
                if merged.len() == 1 {
                    Ok(merged.into_iter().next().unwrap())
                } else {
                    Ok(Interpolation::Concat(merged))
                }
            }
        }
    }

    /// Check if we're at end of input
    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Get current character
    fn current(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    /// Peek at the next character
    fn peek(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    /// Peek at character n positions ahead
    fn peek_n(&self, n: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(n)
    }

    /// Advance by one character
    fn advance(&mut self) {
        if let Some(c) = self.current() {
            self.pos += c.len_utf8();
        }
    }

    /// Check if we're at an escape sequence (\${)
    fn check_escape(&self) -> bool {
        self.current() == Some('\\') && self.peek() == Some('$') && self.peek_n(2) == Some('{')
    }

    /// Check if we're at a marker start (${)
    fn check_marker_start(&self) -> bool {
        self.current() == Some('$') && self.peek() == Some('{')
    }

    /// Collect literal text until the next marker, escape, or end
    fn collect_literal(&mut self) -> String {
        let mut result = String::new();

        while !self.is_eof() {
            if self.check_escape() {
                break;
            }
            if self.check_marker_start() {
                break;
            }
            if let Some(c) = self.current() {
                result.push(c);
                self.advance();
            }
        }

        result
    }

    /// Parse a marker expression (starting at ${)
    fn parse_marker(&mut self) -> Result<Interpolation> {
        // Skip ${
        self.advance(); // $
        self.advance(); // {

        self.skip_whitespace();

        if self.is_eof() {
            return Err(Error::parse("Unexpected end of input in reference marker"));
        }

        let path = self.collect_path();

        if path.is_empty() {
            return Err(Error::parse("Empty reference marker"));
        }

        self.skip_whitespace();

        match self.current() {
            Some('}') => {
                self.advance(); // skip }
                Ok(Interpolation::Ref {
                    path,
                    default: None,
                })
            }
            Some(',') => {
                self.advance(); // skip ,
                let default = self.parse_default()?;
                Ok(Interpolation::Ref {
                    path,
                    default: Some(Box::new(default)),
                })
            }
            Some(c) => Err(Error::parse(format!(
                "Unexpected character '{}' in reference marker '{}'",
                c, path
            ))),
            None => Err(Error::parse("Unexpected end of input in reference marker")),
        }
    }

    /// Parse the default following the comma, up to the closing brace
    ///
    /// The default may itself contain markers: ${a, ${b}} falls back to
    /// the value of b when a is missing.
    fn parse_default(&mut self) -> Result<Interpolation> {
        self.skip_whitespace();

        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut depth = 0; // nested plain braces inside the default text

        loop {
            if self.check_marker_start() {
                if !literal.is_empty() {
                    parts.push(Interpolation::Literal(std::mem::take(&mut literal)));
                }
                parts.push(self.parse_marker()?);
                continue;
            }

            match self.current() {
                Some('{') => {
                    depth += 1;
                    literal.push('{');
                    self.advance();
                }
                Some('}') => {
                    if depth == 0 {
                        self.advance(); // closing brace of the marker
                        break;
                    }
                    depth -= 1;
                    literal.push('}');
                    self.advance();
                }
                Some(c) => {
                    literal.push(c);
                    self.advance();
                }
                None => {
                    return Err(Error::parse("Unexpected end of input in reference marker"));
                }
            }
        }

        let trimmed = literal.trim_end();
        if !trimmed.is_empty() || parts.is_empty() {
            parts.push(Interpolation::Literal(trimmed.to_string()));
        }

        match parts.len() {
            1 => Ok(parts.remove(0)),
            _ => Ok(Interpolation::Concat(merge_adjacent_literals(parts))),
        }
    }

    /// Collect a path expression (alphanumeric, _, -, ., [, ])
    fn collect_path(&mut self) -> String {
        let mut result = String::new();

        while !self.is_eof() {
            match self.current() {
                Some(c)
                    if c.is_alphanumeric()
                        || c == '_'
                        || c == '-'
                        || c == '.'
                        || c == '['
                        || c == ']' =>
                {
                    result.push(c);
                    self.advance();
                }
                _ => break,
            }
        }

        result
    }

    /// Skip whitespace characters
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.current() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }
}

/// Merge adjacent literal parts
fn merge_adjacent_literals(parts: Vec<Interpolation>) -> Vec<Interpolation> {
    let mut result = Vec::new();
    let mut current_literal = String::new();

    for part in parts {
        match part {
            Interpolation::Literal(s) => {
                current_literal.push_str(&s);
            }
            other => {
                if !current_literal.is_empty() {
                    result.push(Interpolation::Literal(current_literal));
                    current_literal = String::new();
                }
                result.push(other);
            }
        }
    }

    if !current_literal.is_empty() {
        result.push(Interpolation::Literal(current_literal));
    }

    result
}

/// Parse a marker string
pub fn parse(input: &str) -> Result<Interpolation> {
    MarkerParser::new(input).parse()
}

/// Check if a string contains any live (unescaped) reference markers
///
/// Scans the same way the parser does: a backslash escapes only a
/// following `${`, so `\\${x}` is a literal backslash plus an escaped
/// marker, not a live one. Marker syntax is ASCII, so a byte scan is
/// safe on any UTF-8 input.
pub fn contains_marker(input: &str) -> bool {
    let bytes = input.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\' && bytes.get(i + 1) == Some(&b'$') && bytes.get(i + 2) == Some(&b'{')
        {
            i += 3;
        } else if bytes[i] == b'$' && bytes.get(i + 1) == Some(&b'{') {
            return true;
        } else {
            i += 1;
        }
    }

    false
}

/// Check if a string needs processing (has markers OR escape sequences)
pub fn needs_processing(input: &str) -> bool {
    contains_marker(input) || input.contains("\\${")
}

/// Rewrite escaped markers (\${) to literal ${
///
/// Applied once, after the fixpoint, so the produced text is never
/// mistaken for a live marker.
pub fn unescape(input: &str) -> String {
    input.replace("\\${", "${")
}

/// Escape marker starts so substituted text survives later passes
///
/// Inverse of [`unescape`]: text protected here comes out of the
/// post-fixpoint rewrite exactly as it went in. Used for override
/// values, which are opaque and never expanded.
pub fn escape(input: &str) -> String {
    input.replace("${", "\\${")
}
