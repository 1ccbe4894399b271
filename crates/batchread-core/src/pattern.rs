//! Content-type patterns used for accept filtering and read-mode rules.
//!
//! Patterns are regular expressions searched (unanchored) within the content
//! type, so `image/*` accepts `image/png` and `text` accepts `text/plain`.

use std::fmt::{self, Display, Formatter};

use regex::Regex;

use crate::error::{ReadError, ReadResult};

/// Compiled content-type pattern that remembers its source text.
#[derive(Clone, Debug)]
pub struct TypePattern {
    source: String,
    regex: Regex,
}

impl TypePattern {
    /// Compile a pattern.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::InvalidPattern`] when the expression is malformed.
    pub fn new(pattern: impl Into<String>) -> ReadResult<Self> {
        let source = pattern.into();
        let regex = Regex::new(&source).map_err(|err| ReadError::InvalidPattern {
            pattern: source.clone(),
            source: err,
        })?;
        Ok(Self { source, regex })
    }

    /// Whether `content_type` matches this pattern.
    #[must_use]
    pub fn matches(&self, content_type: &str) -> bool {
        self.regex.is_match(content_type)
    }

    /// Source text the pattern was compiled from.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl PartialEq for TypePattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for TypePattern {}

impl Display for TypePattern {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.source)
    }
}
