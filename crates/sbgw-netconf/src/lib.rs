//! sbgw-netconf - NETCONF driver for the southbound gateway
//!
//! Runs `<get-config>` and `<edit-config>` against the running datastore over
//! the SSH `netconf` subsystem, and normalizes replies through `sbgw-conv`.

pub mod driver;
pub mod framing;
pub mod rpc;
pub mod transport;

pub use driver::{edit_config_body, NetconfDriver};
pub use transport::{
    MockNetconfConfig, MockNetconfConnector, NetconfConnector, NetconfSession, NetconfTarget,
    NetconfTransportError, SshConnector,
};
