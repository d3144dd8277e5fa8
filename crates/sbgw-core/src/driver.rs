//! DeviceDriver trait - the seam between the dispatcher and protocol drivers

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::credential::Credential;
use crate::device::{DeviceDescriptor, ProtocolKind};
use crate::error::{GatewayError, GatewayResult};
use crate::value::CanonicalValue;

/// Point in time by which a device operation must complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    /// Deadline `budget` from now
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
            budget,
        }
    }

    pub fn instant(&self) -> Instant {
        self.at
    }

    /// Total time granted, reported in `Timeout` errors
    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Error to return when the deadline passed
    pub fn expired(&self) -> GatewayError {
        GatewayError::Timeout(self.budget)
    }
}

/// Body of a set operation
#[derive(Debug, Clone, PartialEq)]
pub enum SetPayload {
    /// Structured body (JSON on the HTTP surface)
    Canonical(CanonicalValue),
    /// Raw XML fragment, for NETCONF edit-config
    Xml(String),
}

/// Document returned by the raw inspection endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeDocument {
    pub content_type: &'static str,
    pub body: String,
}

impl NativeDocument {
    pub fn xml(body: impl Into<String>) -> Self {
        Self {
            content_type: "application/xml",
            body: body.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Get,
    Set,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Get => "get",
            OperationKind::Set => "set",
        }
    }
}

/// One dispatched device operation
#[derive(Debug, Clone, PartialEq)]
pub struct OperationRequest {
    pub device_name: String,
    pub kind: OperationKind,
    pub path: Option<String>,
    pub body: Option<SetPayload>,
}

impl OperationRequest {
    pub fn get(device_name: impl Into<String>, path: Option<String>) -> Self {
        Self {
            device_name: device_name.into(),
            kind: OperationKind::Get,
            path,
            body: None,
        }
    }

    pub fn set(device_name: impl Into<String>, body: SetPayload) -> Self {
        Self {
            device_name: device_name.into(),
            kind: OperationKind::Set,
            path: None,
            body: Some(body),
        }
    }
}

/// A protocol driver.
///
/// Implementations open one session per call (or per batch), and must release
/// it on every exit path, including deadline expiry.
#[async_trait]
pub trait DeviceDriver: Send + Sync {
    /// Protocol kind served by this driver
    fn kind(&self) -> ProtocolKind;

    /// Read configuration or state, normalized to a canonical value
    async fn get(
        &self,
        device: &DeviceDescriptor,
        credential: &Credential,
        path: Option<&str>,
        deadline: Deadline,
    ) -> GatewayResult<CanonicalValue>;

    /// Write configuration; the result is the normalized acknowledgement
    async fn set(
        &self,
        device: &DeviceDescriptor,
        credential: &Credential,
        payload: &SetPayload,
        deadline: Deadline,
    ) -> GatewayResult<CanonicalValue>;

    /// Fetch the device's native document without normalization
    async fn get_native(
        &self,
        device: &DeviceDescriptor,
        _credential: &Credential,
        _deadline: Deadline,
    ) -> GatewayResult<NativeDocument> {
        Err(GatewayError::BadRequest(format!(
            "native documents are not available for {} device '{}'",
            self.kind(),
            device.name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_deadline_expiry() {
        let deadline = Deadline::after(Duration::from_secs(2));
        assert!(!deadline.is_expired());

        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(deadline.is_expired());
        assert!(matches!(
            deadline.expired(),
            GatewayError::Timeout(d) if d == Duration::from_secs(2)
        ));
    }
}
