//! Transport layer for gNMI
//!
//! - [`TonicConnector`] talks gRPC to real devices
//! - [`MockGnmiConnector`] serves canned values for tests
//!
//! A session lives for one operation (or one batch of root-path gets) and is
//! released when dropped.

pub mod error;
pub mod mock;
mod grpc;
mod tls;

pub use self::error::GnmiTransportError;
pub use self::mock::{MockGnmiConfig, MockGnmiConnector};
pub use self::grpc::TonicConnector;

use async_trait::async_trait;
use sbgw_core::{Credential, DeviceAddress, DeviceDescriptor, GnmiOptions};

use crate::proto::{GetRequest, GetResponse, SetRequest, SetResponse};

/// Everything needed to open a session to one device
#[derive(Debug, Clone)]
pub struct GnmiTarget {
    pub device: String,
    pub address: DeviceAddress,
    pub username: String,
    pub password: Credential,
    pub skip_verify: bool,
    pub insecure: bool,
}

impl GnmiTarget {
    pub fn new(device: &DeviceDescriptor, options: &GnmiOptions, credential: &Credential) -> Self {
        Self {
            device: device.name.clone(),
            address: device.address.clone(),
            username: device.username.clone(),
            password: credential.clone(),
            skip_verify: options.skip_verify,
            insecure: options.insecure,
        }
    }
}

/// Opens sessions to gNMI targets
#[async_trait]
pub trait GnmiConnector: Send + Sync {
    async fn connect(&self, target: &GnmiTarget) -> Result<Box<dyn GnmiSession>, GnmiTransportError>;
}

/// An open, authenticated gNMI session
#[async_trait]
pub trait GnmiSession: Send {
    async fn get(&mut self, request: GetRequest) -> Result<GetResponse, GnmiTransportError>;

    async fn set(&mut self, request: SetRequest) -> Result<SetResponse, GnmiTransportError>;
}
