//! sbgw-core - Core traits and types for the southbound gateway
//!
//! This crate provides the device model, the canonical value type, the
//! registry and credential sources, and the [`DeviceDriver`] trait that the
//! gNMI and NETCONF drivers implement.

pub mod credential;
pub mod device;
pub mod driver;
pub mod error;
pub mod registry;
pub mod value;

pub use credential::{
    Credential, CredentialResolver, CredentialStore, EnvCredentialStore, FallbackPolicy,
    StaticCredentialStore,
};
pub use device::{
    DeviceAddress, DeviceDescriptor, Encoding, GnmiOptions, NetconfOptions, ProtocolKind,
    ProtocolOptions, RegistryEntry,
};
pub use driver::{
    Deadline, DeviceDriver, NativeDocument, OperationKind, OperationRequest, SetPayload,
};
pub use error::{GatewayError, GatewayResult};
pub use registry::{
    DeviceRegistry, DeviceSummary, FileRegistry, RegistrySnapshot, RegistrySource, StaticRegistry,
};
pub use value::{CanonicalValue, Mapping};
