//! NETCONF transport errors

use sbgw_core::GatewayError;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum NetconfTransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed for user '{0}'")]
    AuthenticationFailed(String),

    #[error("Host key rejected for {0}")]
    HostKeyRejected(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("SSH channel error: {0}")]
    Channel(String),

    #[error("Framing error: {0}")]
    Framing(String),
}

impl From<russh::Error> for NetconfTransportError {
    fn from(err: russh::Error) -> Self {
        NetconfTransportError::Channel(err.to_string())
    }
}

impl From<NetconfTransportError> for GatewayError {
    fn from(err: NetconfTransportError) -> Self {
        match err {
            NetconfTransportError::Framing(message) => GatewayError::protocol(message),
            other => GatewayError::Unavailable(other.to_string()),
        }
    }
}
