//! Gateway context, built once at startup

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use sbgw_core::{
    CredentialResolver, DeviceDriver, DeviceRegistry, GatewayError, GatewayResult, ProtocolKind,
};
use tracing::info;

/// Default time allowed for one device operation
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything the dispatcher needs, shared read-only across requests
pub struct GatewayContext {
    registry: DeviceRegistry,
    credentials: CredentialResolver,
    drivers: HashMap<ProtocolKind, Arc<dyn DeviceDriver>>,
    request_timeout: Duration,
}

impl GatewayContext {
    pub fn new(registry: DeviceRegistry, credentials: CredentialResolver) -> Self {
        Self {
            registry,
            credentials,
            drivers: HashMap::new(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Register the driver for its protocol kind, replacing any previous one
    pub fn with_driver(mut self, driver: Arc<dyn DeviceDriver>) -> Self {
        let kind = driver.kind();
        info!(protocol = %kind, "Registering driver");
        self.drivers.insert(kind, driver);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn credentials(&self) -> &CredentialResolver {
        &self.credentials
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Protocol kinds with a registered driver
    pub fn protocols(&self) -> Vec<ProtocolKind> {
        let mut kinds: Vec<ProtocolKind> = self.drivers.keys().copied().collect();
        kinds.sort_by_key(|k| k.to_string());
        kinds
    }

    pub fn driver(&self, kind: ProtocolKind) -> GatewayResult<&Arc<dyn DeviceDriver>> {
        self.drivers.get(&kind).ok_or_else(|| {
            GatewayError::InvalidConfig(format!("no driver registered for protocol '{}'", kind))
        })
    }
}
