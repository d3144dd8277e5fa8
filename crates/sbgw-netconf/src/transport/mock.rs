//! Mock NETCONF transport for testing

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use sbgw_conv::NETCONF_BASE_NS;

use super::{NetconfConnector, NetconfSession, NetconfTarget, NetconfTransportError};
use crate::{framing, rpc};

/// Mock transport settings
#[derive(Debug, Clone, Default)]
pub struct MockNetconfConfig {
    /// Delay added to every RPC
    pub latency_ms: u64,
}

/// An operation as seen by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRpc {
    pub device: String,
    pub operation: String,
}

struct MockState {
    config: MockNetconfConfig,
    /// Content of `<data>` in get-config replies
    running: RwLock<String>,
    /// Reply returned for every RPC instead of the defaults
    reply_override: RwLock<Option<String>>,
    unreachable: RwLock<Vec<String>>,
    connects: RwLock<Vec<String>>,
    rpcs: RwLock<Vec<RecordedRpc>>,
    active: AtomicUsize,
    peak: AtomicUsize,
    released: AtomicUsize,
}

/// Mock connector; clones share state
#[derive(Clone)]
pub struct MockNetconfConnector {
    state: Arc<MockState>,
}

impl MockNetconfConnector {
    pub fn new(config: MockNetconfConfig) -> Self {
        Self {
            state: Arc::new(MockState {
                config,
                running: RwLock::new(String::new()),
                reply_override: RwLock::new(None),
                unreachable: RwLock::new(Vec::new()),
                connects: RwLock::new(Vec::new()),
                rpcs: RwLock::new(Vec::new()),
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                released: AtomicUsize::new(0),
            }),
        }
    }

    /// Set the XML returned inside `<data>` by get-config
    pub fn set_running(&self, xml: &str) {
        *self.state.running.write() = xml.to_string();
    }

    /// Answer every RPC with this document
    pub fn set_reply(&self, reply: &str) {
        *self.state.reply_override.write() = Some(reply.to_string());
    }

    pub fn set_unreachable(&self, device: &str) {
        self.state.unreachable.write().push(device.to_string());
    }

    pub fn connects(&self) -> Vec<String> {
        self.state.connects.read().clone()
    }

    /// Operations received, excluding close-session
    pub fn rpcs(&self) -> Vec<RecordedRpc> {
        self.state.rpcs.read().clone()
    }

    pub fn active_sessions(&self) -> usize {
        self.state.active.load(Ordering::SeqCst)
    }

    pub fn peak_sessions(&self) -> usize {
        self.state.peak.load(Ordering::SeqCst)
    }

    pub fn released_sessions(&self) -> usize {
        self.state.released.load(Ordering::SeqCst)
    }
}

impl Default for MockNetconfConnector {
    fn default() -> Self {
        Self::new(MockNetconfConfig::default())
    }
}

#[async_trait]
impl NetconfConnector for MockNetconfConnector {
    async fn connect(
        &self,
        target: &NetconfTarget,
    ) -> Result<Box<dyn NetconfSession>, NetconfTransportError> {
        self.state.connects.write().push(target.device.clone());

        if self.state.unreachable.read().contains(&target.device) {
            return Err(NetconfTransportError::ConnectionFailed(format!(
                "{}: connection refused",
                target.address
            )));
        }

        let active = self.state.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.peak.fetch_max(active, Ordering::SeqCst);

        Ok(Box::new(MockSession {
            device: target.device.clone(),
            state: self.state.clone(),
            closed: false,
        }))
    }
}

struct MockSession {
    device: String,
    state: Arc<MockState>,
    closed: bool,
}

impl Drop for MockSession {
    fn drop(&mut self) {
        self.state.active.fetch_sub(1, Ordering::SeqCst);
        self.state.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl NetconfSession for MockSession {
    async fn rpc(&mut self, operation: &str) -> Result<String, NetconfTransportError> {
        if self.closed {
            return Err(NetconfTransportError::ConnectionClosed);
        }
        // Same framing rules as the SSH transport
        framing::frame(&rpc::rpc(1, operation))?;

        self.state.rpcs.write().push(RecordedRpc {
            device: self.device.clone(),
            operation: operation.to_string(),
        });

        if self.state.config.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.state.config.latency_ms)).await;
        }

        let reply_override = self.state.reply_override.read().clone();
        if let Some(reply) = reply_override {
            return Ok(reply);
        }

        let body = if operation.starts_with("<get-config") {
            format!(
                r#"<data xmlns="{}">{}</data>"#,
                NETCONF_BASE_NS,
                self.state.running.read()
            )
        } else {
            "<ok/>".to_string()
        };
        Ok(format!(
            r#"<rpc-reply message-id="1" xmlns="{}">{}</rpc-reply>"#,
            NETCONF_BASE_NS, body
        ))
    }

    async fn close(&mut self) -> Result<(), NetconfTransportError> {
        self.closed = true;
        Ok(())
    }
}
