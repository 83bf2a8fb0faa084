//! Error types anchored to a source position.
//!
//! Phase-specific error enums in the language and compile crates wrap or
//! build on [`SourceError`], the shared atom: a message plus the [`Pos`]
//! it refers to.
//!
//! # Example
//!
//! ```
//! use ppjc_base::{Pos, Result, SourceError};
//!
//! fn parse_digit(c: char, pos: Pos) -> Result<u32> {
//!     c.to_digit(10)
//!         .ok_or_else(|| SourceError::new(format!("expected digit, found '{}'", c), pos))
//! }
//!
//! let err = parse_digit('x', Pos::new(2, 7)).unwrap_err();
//! assert!(err.to_string().contains("2:7"));
//! ```

use crate::pos::Pos;
use std::fmt;

/// An error annotated with the source position it refers to.
///
/// Implements [`std::error::Error`] and [`fmt::Display`]. The display
/// format is `{line}:{column}: {message}`.
#[derive(Debug, Clone)]
pub struct SourceError {
    /// Human-readable error description.
    pub message: String,
    /// Position in source where the error occurred.
    pub pos: Pos,
}

impl SourceError {
    /// Creates an error with the given message and source position.
    pub fn new(message: impl Into<String>, pos: Pos) -> Self {
        Self {
            message: message.into(),
            pos,
        }
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.pos, self.message)
    }
}

impl std::error::Error for SourceError {}

/// Alias for `std::result::Result<T, SourceError>`.
pub type Result<T> = std::result::Result<T, SourceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_error_display_includes_position() {
        let err = SourceError::new("unexpected character", Pos::new(4, 2));
        let display = err.to_string();
        assert!(display.contains("unexpected character"));
        assert!(display.contains("4:2"));
    }
}
