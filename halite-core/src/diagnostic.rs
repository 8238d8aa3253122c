//! Structural diagnostics
//!
//! Formatting never aborts on malformed input; problems are reported
//! alongside the best-effort result.

use std::fmt;

/// A problem found while lexing or reconstructing structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Byte offset into the original source
    pub offset: usize,
    pub message: String,
}

impl Diagnostic {
    pub fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }

    /// Translate the byte offset to a 1-based (line, column) pair
    pub fn line_col(&self, source: &str) -> (usize, usize) {
        let prefix = &source[..self.offset.min(source.len())];
        let line = prefix.matches('\n').count() + 1;
        let column = prefix
            .rsplit('\n')
            .next()
            .map(|tail| tail.chars().count())
            .unwrap_or(0)
            + 1;
        (line, column)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "offset {}: {}", self.offset, self.message)
    }
}
