//! Common error types for the gateway core and protocol drivers

use std::time::Duration;

use thiserror::Error;

use crate::value::CanonicalValue;

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors that can occur while resolving, dispatching or executing a device operation
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Device name is not present in the registry
    #[error("Device not found: {0}")]
    NotFound(String),

    /// Registry entry (or gateway configuration) is incomplete or inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Caller supplied a request the gateway cannot act on
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Device could not be reached
    #[error("Device unavailable: {0}")]
    Unavailable(String),

    /// Device did not answer before the request deadline
    #[error("Device did not respond within {0:?}")]
    Timeout(Duration),

    /// Device answered, but the RPC failed or the answer had an unexpected shape
    #[error("Protocol error: {message}")]
    Protocol {
        message: String,
        /// Device-reported error payload, when there is one
        detail: Option<CanonicalValue>,
    },

    /// Value cannot be represented losslessly in the target format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl GatewayError {
    /// Shorthand for a protocol error without a device payload
    pub fn protocol(message: impl Into<String>) -> Self {
        GatewayError::Protocol {
            message: message.into(),
            detail: None,
        }
    }

    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::NotFound(_) => 404,
            GatewayError::InvalidConfig(_) => 500,
            GatewayError::BadRequest(_) => 400,
            GatewayError::Unavailable(_) => 502,
            GatewayError::Timeout(_) => 504,
            GatewayError::Protocol { .. } => 502,
            GatewayError::UnsupportedFormat(_) => 422,
        }
    }

    /// Stable machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::NotFound(_) => "not_found",
            GatewayError::InvalidConfig(_) => "invalid_config",
            GatewayError::BadRequest(_) => "bad_request",
            GatewayError::Unavailable(_) => "unavailable",
            GatewayError::Timeout(_) => "timeout",
            GatewayError::Protocol { .. } => "protocol_error",
            GatewayError::UnsupportedFormat(_) => "unsupported_format",
        }
    }

    /// True for faults on the device side of the gateway (transport or deadline)
    pub fn is_unavailable(&self) -> bool {
        matches!(self, GatewayError::Unavailable(_) | GatewayError::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_and_upstream_faults_are_distinguished() {
        assert_eq!(GatewayError::NotFound("r1".into()).status_code(), 404);
        assert_eq!(GatewayError::BadRequest("no path".into()).status_code(), 400);
        assert_eq!(GatewayError::Unavailable("refused".into()).status_code(), 502);
        assert_eq!(GatewayError::protocol("rpc failed").status_code(), 502);
        assert_eq!(
            GatewayError::Timeout(Duration::from_secs(3)).status_code(),
            504
        );
    }

    #[test]
    fn test_timeout_counts_as_unavailable() {
        assert!(GatewayError::Timeout(Duration::from_millis(10)).is_unavailable());
        assert!(!GatewayError::protocol("x").is_unavailable());
    }
}
