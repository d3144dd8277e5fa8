//! Transport layer for NETCONF
//!
//! - [`SshConnector`] runs the `netconf` SSH subsystem with base:1.0 framing
//! - [`MockNetconfConnector`] holds a running datastore in memory for tests

pub mod error;
pub mod mock;
mod ssh;

pub use self::error::NetconfTransportError;
pub use self::mock::{MockNetconfConfig, MockNetconfConnector, RecordedRpc};
pub use self::ssh::SshConnector;

use async_trait::async_trait;
use sbgw_core::{Credential, DeviceAddress, DeviceDescriptor, NetconfOptions};

/// Everything needed to open a session to one device
#[derive(Debug, Clone)]
pub struct NetconfTarget {
    pub device: String,
    pub address: DeviceAddress,
    pub username: String,
    pub password: Credential,
    pub host_key_verify: bool,
}

impl NetconfTarget {
    pub fn new(
        device: &DeviceDescriptor,
        options: &NetconfOptions,
        credential: &Credential,
    ) -> Self {
        Self {
            device: device.name.clone(),
            address: device.address.clone(),
            username: device.username.clone(),
            password: credential.clone(),
            host_key_verify: options.host_key_verify,
        }
    }
}

/// Opens NETCONF sessions (hello exchange included)
#[async_trait]
pub trait NetconfConnector: Send + Sync {
    async fn connect(
        &self,
        target: &NetconfTarget,
    ) -> Result<Box<dyn NetconfSession>, NetconfTransportError>;
}

/// An established NETCONF session
#[async_trait]
pub trait NetconfSession: Send {
    /// Send one operation (the content of `<rpc>`) and return the raw reply
    async fn rpc(&mut self, operation: &str) -> Result<String, NetconfTransportError>;

    /// Ask the device to end the session and disconnect
    async fn close(&mut self) -> Result<(), NetconfTransportError>;
}
