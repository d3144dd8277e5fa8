//! NETCONF over SSH (RFC 6242) built on russh

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client::{self, Handle, Msg};
use russh::{Channel, ChannelMsg, Disconnect};
use russh_keys::key::PublicKey;
use tracing::{debug, warn};

use super::{NetconfConnector, NetconfSession, NetconfTarget, NetconfTransportError};
use crate::framing::{frame, FrameBuffer};
use crate::rpc;

/// Opens `netconf` subsystem channels with password authentication
#[derive(Debug, Clone)]
pub struct SshConnector {
    connect_timeout: Duration,
}

impl SshConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for SshConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

struct HostKeyPolicy {
    host: String,
    port: u16,
    verify: bool,
}

#[async_trait]
impl client::Handler for HostKeyPolicy {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        if !self.verify {
            debug!(host = %self.host, "Host key verification disabled, accepting server key");
            return Ok(true);
        }

        match russh_keys::check_known_hosts(&self.host, self.port, server_public_key) {
            Ok(known) => {
                if !known {
                    warn!(host = %self.host, port = self.port, "Server key not found in known_hosts");
                }
                Ok(known)
            }
            Err(e) => {
                warn!(host = %self.host, port = self.port, error = %e, "Server key check failed");
                Ok(false)
            }
        }
    }
}

#[async_trait]
impl NetconfConnector for SshConnector {
    async fn connect(
        &self,
        target: &NetconfTarget,
    ) -> Result<Box<dyn NetconfSession>, NetconfTransportError> {
        let config = Arc::new(client::Config::default());
        let handler = HostKeyPolicy {
            host: target.address.host.clone(),
            port: target.address.port,
            verify: target.host_key_verify,
        };

        debug!(device = %target.device, address = %target.address, "Opening NETCONF session");
        let addr = (target.address.host.as_str(), target.address.port);
        let connecting = client::connect(config, addr, handler);
        let mut handle = tokio::time::timeout(self.connect_timeout, connecting)
            .await
            .map_err(|_| {
                NetconfTransportError::ConnectionFailed(format!(
                    "{}: no answer within {:?}",
                    target.address, self.connect_timeout
                ))
            })?
            .map_err(|e| match e {
                russh::Error::UnknownKey => {
                    NetconfTransportError::HostKeyRejected(target.address.to_string())
                }
                other => NetconfTransportError::ConnectionFailed(format!(
                    "{}: {}",
                    target.address, other
                )),
            })?;

        let authenticated = handle
            .authenticate_password(target.username.as_str(), target.password.expose())
            .await?;
        if !authenticated {
            return Err(NetconfTransportError::AuthenticationFailed(
                target.username.clone(),
            ));
        }

        let mut channel = handle.channel_open_session().await?;
        channel.request_subsystem(true, "netconf").await?;

        let mut session = SshSession {
            handle,
            channel,
            frames: FrameBuffer::new(),
            message_id: 0,
        };

        let server_hello = session.read_message().await?;
        if !server_hello.contains("hello") {
            return Err(NetconfTransportError::Framing(
                "device did not start with <hello>".to_string(),
            ));
        }
        session.write_message(&rpc::hello()).await?;
        debug!(device = %target.device, "NETCONF hello exchanged");

        Ok(Box::new(session))
    }
}

struct SshSession {
    handle: Handle<HostKeyPolicy>,
    channel: Channel<Msg>,
    frames: FrameBuffer,
    message_id: u64,
}

impl SshSession {
    async fn write_message(&mut self, message: &str) -> Result<(), NetconfTransportError> {
        let bytes = frame(message)?;
        self.channel.data(&bytes[..]).await?;
        Ok(())
    }

    async fn read_message(&mut self) -> Result<String, NetconfTransportError> {
        loop {
            if let Some(message) = self.frames.next_message() {
                return message.map_err(|e| NetconfTransportError::Framing(e.to_string()));
            }

            match self.channel.wait().await {
                Some(ChannelMsg::Data { data }) => self.frames.extend(&data),
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                    return Err(NetconfTransportError::ConnectionClosed)
                }
                Some(other) => debug!(?other, "Ignoring channel message"),
            }
        }
    }
}

#[async_trait]
impl NetconfSession for SshSession {
    async fn rpc(&mut self, operation: &str) -> Result<String, NetconfTransportError> {
        self.message_id += 1;
        self.write_message(&rpc::rpc(self.message_id, operation)).await?;
        self.read_message().await
    }

    async fn close(&mut self) -> Result<(), NetconfTransportError> {
        // The device may drop the channel as soon as it has answered
        if let Err(e) = self.rpc(&rpc::close_session()).await {
            debug!(error = %e, "close-session not acknowledged");
        }
        let _ = self.channel.eof().await;
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await?;
        Ok(())
    }
}
