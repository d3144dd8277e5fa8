//! sbgw-gnmi - gNMI driver for the southbound gateway
//!
//! Translates canonical get/set operations into gNMI Get and Set RPCs.
//! The transport is pluggable: [`TonicConnector`] for real devices and
//! [`MockGnmiConnector`] for tests.

pub mod convert;
pub mod driver;
pub mod path;
pub mod proto;
pub mod transport;

pub use driver::GnmiDriver;
pub use path::{GnmiPathMapper, DEFAULT_PATH_PREFIX};
pub use transport::{
    GnmiConnector, GnmiSession, GnmiTarget, GnmiTransportError, MockGnmiConfig,
    MockGnmiConnector, TonicConnector,
};
