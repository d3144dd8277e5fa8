//! TLS for devices registered with `skipVerify`
//!
//! tonic's `ClientTlsConfig` always verifies the server certificate, so these
//! devices are dialed through a custom connector: TCP, then a rustls handshake
//! that accepts any certificate but still checks handshake signatures.

use std::sync::Arc;

use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use tokio_rustls::rustls::crypto::{
    ring, verify_tls12_signature, verify_tls13_signature, CryptoProvider,
};
use tokio_rustls::rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use tokio_rustls::rustls::{ClientConfig, DigitallySignedStruct, Error, SignatureScheme};
use tokio_rustls::TlsConnector;

use super::GnmiTransportError;

const ALPN_H2: &[u8] = b"h2";

/// Certificate verifier that trusts every server certificate
#[derive(Debug)]
pub(crate) struct AcceptAnyServerCert {
    provider: Arc<CryptoProvider>,
}

impl AcceptAnyServerCert {
    pub(crate) fn new(provider: Arc<CryptoProvider>) -> Self {
        Self { provider }
    }
}

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// rustls client configuration that skips certificate verification, offering h2
pub(crate) fn unverified_client_config() -> Result<ClientConfig, GnmiTransportError> {
    let provider = Arc::new(ring::default_provider());
    let mut config = ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .map_err(|e| GnmiTransportError::InvalidTarget(format!("TLS setup: {}", e)))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert::new(provider)))
        .with_no_client_auth();
    config.alpn_protocols = vec![ALPN_H2.to_vec()];
    Ok(config)
}

/// Dials one device: TCP connect followed by an unverified TLS handshake
#[derive(Clone)]
pub(crate) struct UnverifiedTlsDialer {
    connector: TlsConnector,
    address: String,
    server_name: ServerName<'static>,
}

impl UnverifiedTlsDialer {
    pub(crate) fn new(host: &str, address: String) -> Result<Self, GnmiTransportError> {
        let server_name = ServerName::try_from(host)
            .map(|name| name.to_owned())
            .map_err(|e| {
                GnmiTransportError::InvalidTarget(format!(
                    "'{}' is not a TLS server name: {}",
                    host, e
                ))
            })?;
        Ok(Self {
            connector: TlsConnector::from(Arc::new(unverified_client_config()?)),
            address,
            server_name,
        })
    }

    pub(crate) async fn dial(self) -> std::io::Result<TokioIo<TlsStream<TcpStream>>> {
        let tcp = TcpStream::connect(self.address.as_str()).await?;
        let stream = self.connector.connect(self.server_name, tcp).await?;
        Ok(TokioIo::new(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_certificate_is_accepted() {
        let verifier = AcceptAnyServerCert::new(Arc::new(ring::default_provider()));
        let cert = CertificateDer::from(vec![0x30, 0x03, 0x02, 0x01, 0x00]);
        let name = ServerName::try_from("device.invalid").unwrap();

        assert!(verifier
            .verify_server_cert(&cert, &[], &name, &[], UnixTime::now())
            .is_ok());
        assert!(!verifier.supported_verify_schemes().is_empty());
    }

    #[test]
    fn test_client_config_offers_h2() {
        let config = unverified_client_config().unwrap();
        assert_eq!(config.alpn_protocols, vec![b"h2".to_vec()]);
    }

    #[test]
    fn test_dialer_accepts_ip_and_dns_names() {
        assert!(UnverifiedTlsDialer::new("10.0.0.1", "10.0.0.1:6030".to_string()).is_ok());
        assert!(UnverifiedTlsDialer::new("spine1.lab", "spine1.lab:6030".to_string()).is_ok());
        assert!(matches!(
            UnverifiedTlsDialer::new("not a host", "x:1".to_string()),
            Err(GnmiTransportError::InvalidTarget(_))
        ));
    }
}
