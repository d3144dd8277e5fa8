//! Daemon configuration (TOML)

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Top-level configuration; every section is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub request: RequestConfig,
    #[serde(default)]
    pub gnmi: GnmiConfig,
    #[serde(default)]
    pub netconf: NetconfConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

/// Device registry file, re-read on every request
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_registry_path")]
    pub path: PathBuf,
}

fn default_registry_path() -> PathBuf {
    PathBuf::from("connect.json")
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: default_registry_path(),
        }
    }
}

/// Credentials come from `<env_prefix><device name>` environment variables
#[derive(Clone, Default, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub env_prefix: String,
    /// Secret used when a device has none; unset means such requests fail
    #[serde(default)]
    pub fallback: Option<String>,
}

impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("env_prefix", &self.env_prefix)
            .field("fallback", &self.fallback.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestConfig {
    #[serde(default = "default_request_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl RequestConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GnmiConfig {
    /// Prepended to every logical path
    #[serde(default = "default_path_prefix")]
    pub path_prefix: String,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_path_prefix() -> String {
    sbgw_gnmi::DEFAULT_PATH_PREFIX.to_string()
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

impl Default for GnmiConfig {
    fn default() -> Self {
        Self {
            path_prefix: default_path_prefix(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetconfConfig {
    /// Wrapper elements removed from get-config results, outermost first
    #[serde(default = "default_envelopes")]
    pub envelopes: Vec<String>,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_envelopes() -> Vec<String> {
    sbgw_conv::UnwrapRules::default().envelopes
}

impl Default for NetconfConfig {
    fn default() -> Self {
        Self {
            envelopes: default_envelopes(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl Config {
    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply command-line overrides
    pub fn merge_with_args(mut self, registry: Option<PathBuf>, port: Option<u16>) -> Self {
        if let Some(path) = registry {
            self.registry.path = path;
        }
        if let Some(port) = port {
            self.server.port = port;
        }
        self
    }
}
