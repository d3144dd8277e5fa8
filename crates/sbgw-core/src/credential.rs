//! Credential resolution
//!
//! Secrets are looked up per device name at request time. When no secret is
//! stored, the [`FallbackPolicy`] decides: the default denies the request, an
//! explicitly configured fallback secret is used with an audit log line.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::error::{GatewayError, GatewayResult};

/// Secret used to authenticate against a device.
///
/// Never printed: `Debug` and `Display` are redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// External secret store keyed by device name
pub trait CredentialStore: Send + Sync {
    fn secret(&self, device_name: &str) -> Option<String>;
}

/// Reads `<prefix><device name>` from the process environment
#[derive(Debug, Clone, Default)]
pub struct EnvCredentialStore {
    prefix: String,
}

impl EnvCredentialStore {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn variable_name(&self, device_name: &str) -> String {
        format!("{}{}", self.prefix, device_name)
    }
}

impl CredentialStore for EnvCredentialStore {
    fn secret(&self, device_name: &str) -> Option<String> {
        std::env::var(self.variable_name(device_name)).ok()
    }
}

/// In-memory store
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialStore {
    secrets: HashMap<String, String>,
}

impl StaticCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, device_name: impl Into<String>, secret: impl Into<String>) -> Self {
        self.secrets.insert(device_name.into(), secret.into());
        self
    }
}

impl CredentialStore for StaticCredentialStore {
    fn secret(&self, device_name: &str) -> Option<String> {
        self.secrets.get(device_name).cloned()
    }
}

/// What to do when the store has no secret for a device
#[derive(Clone, Default, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Fail the request with `InvalidConfig`
    #[default]
    Deny,
    /// Use this secret and log the substitution
    Default(String),
}

impl fmt::Debug for FallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackPolicy::Deny => f.write_str("Deny"),
            FallbackPolicy::Default(_) => f.write_str("Default(***)"),
        }
    }
}

/// Maps a device name to its credential
#[derive(Clone)]
pub struct CredentialResolver {
    store: Arc<dyn CredentialStore>,
    fallback: FallbackPolicy,
}

impl CredentialResolver {
    pub fn new(store: Arc<dyn CredentialStore>, fallback: FallbackPolicy) -> Self {
        Self { store, fallback }
    }

    pub fn fallback(&self) -> &FallbackPolicy {
        &self.fallback
    }

    pub fn resolve(&self, device_name: &str) -> GatewayResult<Credential> {
        if let Some(secret) = self.store.secret(device_name) {
            return Ok(Credential(secret));
        }

        match &self.fallback {
            FallbackPolicy::Deny => Err(GatewayError::InvalidConfig(format!(
                "no credential stored for device '{}'",
                device_name
            ))),
            FallbackPolicy::Default(secret) => {
                warn!(
                    device = %device_name,
                    "No credential stored for device, using configured fallback secret"
                );
                Ok(Credential(secret.clone()))
            }
        }
    }
}
