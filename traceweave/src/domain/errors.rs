//! Structured error types for the rewrite engine
//!
//! Using thiserror for automatic Display implementation and error chaining.
//! Lines are 1-based positions in the *input* file; injected text does not
//! shift them.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TranslateError {
    /// A comment, literal or directive was still open when input ran out.
    #[error("unterminated {what} starting on line {line}")]
    Unterminated { what: &'static str, line: usize },

    /// Structure the scanner cannot follow, e.g. a signature opener with no
    /// preceding name, or a closing brace at file scope.
    #[error("malformed input on line {line}: {what}")]
    Malformed { line: usize, what: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unterminated_display() {
        let err = TranslateError::Unterminated { what: "string literal", line: 12 };
        assert_eq!(err.to_string(), "unterminated string literal starting on line 12");
    }

    #[test]
    fn test_malformed_display() {
        let err = TranslateError::Malformed {
            line: 3,
            what: "'(' without a preceding name".to_string(),
        };
        assert!(err.to_string().contains("line 3"));
        assert!(err.to_string().contains("'('"));
    }
}
