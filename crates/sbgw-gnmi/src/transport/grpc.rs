//! gRPC transport built on tonic

use std::error::Error as _;
use std::time::Duration;

use async_trait::async_trait;
use tonic::metadata::AsciiMetadataValue;
use tonic::transport::{ClientTlsConfig, Endpoint, Uri};
use tonic::Request;
use tower::service_fn;
use tracing::{debug, warn};

use super::tls::UnverifiedTlsDialer;
use super::{GnmiConnector, GnmiSession, GnmiTarget, GnmiTransportError};
use crate::proto::{GetRequest, GetResponse, GnmiClient, SetRequest, SetResponse};

/// Connects to devices over gRPC.
///
/// Plaintext when `insecure`, TLS verified against the system roots by
/// default, and TLS without certificate verification when `skip_verify`.
#[derive(Debug, Clone)]
pub struct TonicConnector {
    connect_timeout: Duration,
}

impl TonicConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for TonicConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[async_trait]
impl GnmiConnector for TonicConnector {
    async fn connect(&self, target: &GnmiTarget) -> Result<Box<dyn GnmiSession>, GnmiTransportError> {
        // Unverified TLS is layered by our own connector, so tonic sees plaintext
        let unverified_tls = target.skip_verify && !target.insecure;
        let scheme = if target.insecure || unverified_tls {
            "http"
        } else {
            "https"
        };
        let uri = format!("{}://{}", scheme, target.address);

        let mut endpoint = Endpoint::from_shared(uri.clone())
            .map_err(|e| GnmiTransportError::InvalidTarget(format!("{}: {}", uri, e)))?
            .connect_timeout(self.connect_timeout);

        let connected = if unverified_tls {
            warn!(device = %target.device, "Connecting without server certificate verification");
            let dialer = UnverifiedTlsDialer::new(&target.address.host, target.address.to_string())?;
            debug!(device = %target.device, %uri, "Opening gNMI channel over unverified TLS");
            endpoint
                .connect_with_connector(service_fn(move |_: Uri| dialer.clone().dial()))
                .await
        } else {
            if !target.insecure {
                endpoint = endpoint
                    .tls_config(ClientTlsConfig::new().with_native_roots())
                    .map_err(|e| GnmiTransportError::InvalidTarget(e.to_string()))?;
            }
            debug!(device = %target.device, %uri, "Opening gNMI channel");
            endpoint.connect().await
        };

        let channel = connected.map_err(|e| {
            let cause = e
                .source()
                .map(|s| format!("{}: {}", e, s))
                .unwrap_or_else(|| e.to_string());
            GnmiTransportError::ConnectionFailed(format!("{}: {}", target.address, cause))
        })?;

        let username = AsciiMetadataValue::try_from(target.username.as_str()).map_err(|_| {
            GnmiTransportError::InvalidTarget("username is not valid gRPC metadata".to_string())
        })?;
        let password = AsciiMetadataValue::try_from(target.password.expose()).map_err(|_| {
            GnmiTransportError::InvalidTarget("password is not valid gRPC metadata".to_string())
        })?;

        Ok(Box::new(TonicSession {
            client: GnmiClient::new(channel),
            username,
            password,
        }))
    }
}

struct TonicSession {
    client: GnmiClient,
    username: AsciiMetadataValue,
    password: AsciiMetadataValue,
}

impl TonicSession {
    fn authenticated<T>(&self, message: T) -> Request<T> {
        let mut request = Request::new(message);
        request
            .metadata_mut()
            .insert("username", self.username.clone());
        request
            .metadata_mut()
            .insert("password", self.password.clone());
        request
    }
}

#[async_trait]
impl GnmiSession for TonicSession {
    async fn get(&mut self, request: GetRequest) -> Result<GetResponse, GnmiTransportError> {
        let request = self.authenticated(request);
        Ok(self.client.get(request).await?.into_inner())
    }

    async fn set(&mut self, request: SetRequest) -> Result<SetResponse, GnmiTransportError> {
        let request = self.authenticated(request);
        Ok(self.client.set(request).await?.into_inner())
    }
}
