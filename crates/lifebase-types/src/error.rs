//! Error types for decoding raw attribute values.

use thiserror::Error;

/// Errors that can occur when decoding a raw attribute value.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum DecodeError {
    /// The value bytes are not valid UTF-8 text.
    #[error("value is not valid UTF-8 text")]
    NotText,

    /// The value decoded to text, but the text is not a decimal number.
    #[error("value '{0}' is not a decimal number")]
    NotNumeric(String),
}

/// Result type alias using [`DecodeError`].
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_display() {
        assert_eq!(
            DecodeError::NotText.to_string(),
            "value is not valid UTF-8 text"
        );
        assert_eq!(
            DecodeError::NotNumeric("abc".into()).to_string(),
            "value 'abc' is not a decimal number"
        );
    }
}
