//! Error types for payload normalization

use sbgw_core::GatewayError;
use thiserror::Error;

/// Errors that can occur while converting between native and canonical forms
#[derive(Debug, Error)]
pub enum ConvError {
    /// Input XML could not be tokenized
    #[error("failed to parse XML: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Input bytes were not valid UTF-8
    #[error("invalid UTF-8 in XML: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// Entity or character reference could not be decoded
    #[error("failed to decode XML text: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),

    /// Structural problem in the document
    #[error("malformed XML: {0}")]
    Malformed(String),

    /// Input JSON could not be parsed
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Well-formed input that has the wrong shape for the operation
    #[error("invalid body: {0}")]
    InvalidBody(String),

    /// Input uses a feature with no lossless mapping
    #[error("{0}")]
    Unsupported(String),
}

/// Result type for normalization
pub type ConvResult<T> = Result<T, ConvError>;

impl ConvError {
    pub fn unsupported(message: impl Into<String>) -> Self {
        ConvError::Unsupported(message.into())
    }
}

impl From<ConvError> for GatewayError {
    fn from(err: ConvError) -> Self {
        match err {
            ConvError::Unsupported(message) => GatewayError::UnsupportedFormat(message),
            other => GatewayError::BadRequest(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_error_mapping() {
        let err: GatewayError = ConvError::Malformed("unclosed".into()).into();
        assert_eq!(err.status_code(), 400);

        let err: GatewayError = ConvError::unsupported("mixed content").into();
        assert!(matches!(err, GatewayError::UnsupportedFormat(m) if m == "mixed content"));
    }
}
