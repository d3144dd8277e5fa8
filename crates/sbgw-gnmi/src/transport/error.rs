//! gNMI transport errors

use sbgw_core::{CanonicalValue, GatewayError, Mapping};
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum GnmiTransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("RPC failed ({code:?}): {message}")]
    Status { code: tonic::Code, message: String },
}

impl From<tonic::Status> for GnmiTransportError {
    fn from(status: tonic::Status) -> Self {
        GnmiTransportError::Status {
            code: status.code(),
            message: status.message().to_string(),
        }
    }
}

impl From<GnmiTransportError> for GatewayError {
    fn from(err: GnmiTransportError) -> Self {
        match err {
            GnmiTransportError::ConnectionFailed(message) => GatewayError::Unavailable(message),
            GnmiTransportError::InvalidTarget(message) => GatewayError::InvalidConfig(message),
            GnmiTransportError::Status { code, message } if code == tonic::Code::Unavailable => {
                GatewayError::Unavailable(message)
            }
            GnmiTransportError::Status { code, message } => {
                let mut detail = Mapping::new();
                detail.insert("code".to_string(), format!("{:?}", code).into());
                detail.insert("message".to_string(), message.clone().into());
                GatewayError::Protocol {
                    message: format!("gNMI RPC failed ({:?}): {}", code, message),
                    detail: Some(CanonicalValue::Mapping(detail)),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let err: GatewayError =
            GnmiTransportError::from(tonic::Status::not_found("no such path")).into();
        match err {
            GatewayError::Protocol { detail, .. } => {
                let detail = detail.unwrap();
                assert_eq!(detail.get("code").and_then(|c| c.as_str()), Some("NotFound"));
            }
            other => panic!("unexpected {:?}", other),
        }

        let err: GatewayError =
            GnmiTransportError::from(tonic::Status::unavailable("reset")).into();
        assert!(matches!(err, GatewayError::Unavailable(_)));
    }
}
