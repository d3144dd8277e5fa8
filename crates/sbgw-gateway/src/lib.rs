//! sbgw-gateway - Dispatches device operations to protocol drivers
//!
//! ```text
//!   OperationRequest
//!         │
//!         ▼
//!   ┌────────────┐   ┌──────────────┐   ┌──────────────┐   ┌─────────┐
//!   │  Resolve   │──▶│ Authenticate │──▶│ SelectDriver │──▶│ Execute │──▶ CanonicalValue
//!   │ (registry) │   │ (credential) │   │ (by kind)    │   │ (driver)│
//!   └────────────┘   └──────────────┘   └──────────────┘   └─────────┘
//! ```
//!
//! The first failing stage ends the request; nothing is retried.

mod context;
mod dispatcher;

pub use context::GatewayContext;
pub use dispatcher::Dispatcher;

// Re-export core types for convenience
pub use sbgw_core::{
    CanonicalValue, DeviceDriver, DeviceSummary, GatewayError, GatewayResult, NativeDocument,
    OperationKind, OperationRequest, SetPayload,
};
