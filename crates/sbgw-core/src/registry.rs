//! Device registry
//!
//! The registry is a read-only source of truth external to the gateway.
//! [`FileRegistry`] re-reads its file on every call, so edits on disk are
//! visible to the next request without a restart.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::device::{DeviceDescriptor, RegistryEntry};
use crate::error::{GatewayError, GatewayResult};

/// Content of the registry at one point in time.
///
/// Entries are kept as raw JSON and only typed when looked up, so one
/// malformed entry never hides the others.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrySnapshot {
    entries: IndexMap<String, Value>,
}

impl RegistrySnapshot {
    pub fn new(entries: IndexMap<String, Value>) -> Self {
        Self { entries }
    }

    /// Parse the JSON registry format (device name -> entry).
    ///
    /// Only the top level must be an object keyed by device name.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        Ok(Self {
            entries: serde_json::from_str(text)?,
        })
    }

    /// Typed entry for `name`, `None` when no such device is registered
    pub fn entry(&self, name: &str) -> Option<Result<RegistryEntry, String>> {
        self.entries.get(name).map(|raw| {
            RegistryEntry::deserialize(raw)
                .map_err(|e| format!("device '{}' has an invalid registry entry: {}", name, e))
        })
    }

    /// Device names with their raw entries, in registry order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Listing view of a registry entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceSummary {
    pub name: String,
    /// Protocol kind exactly as written in the registry
    #[serde(rename = "if")]
    pub protocol: Option<String>,
}

/// Where registry content comes from
#[async_trait]
pub trait RegistrySource: Send + Sync {
    async fn load(&self) -> GatewayResult<RegistrySnapshot>;

    /// Human-readable origin, for logs
    fn describe(&self) -> String;
}

/// Registry backed by a JSON file, re-read on every load
#[derive(Debug, Clone)]
pub struct FileRegistry {
    path: PathBuf,
}

impl FileRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RegistrySource for FileRegistry {
    async fn load(&self) -> GatewayResult<RegistrySnapshot> {
        let text = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            GatewayError::InvalidConfig(format!(
                "cannot read device registry {}: {}",
                self.path.display(),
                e
            ))
        })?;

        RegistrySnapshot::from_json(&text).map_err(|e| {
            GatewayError::InvalidConfig(format!(
                "cannot parse device registry {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

/// Registry held in memory
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    snapshot: RegistrySnapshot,
}

impl StaticRegistry {
    pub fn new(snapshot: RegistrySnapshot) -> Self {
        Self { snapshot }
    }

    /// Build from `(name, raw entry)` pairs, keeping their order
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        Self {
            snapshot: RegistrySnapshot::new(entries.into_iter().collect()),
        }
    }
}

#[async_trait]
impl RegistrySource for StaticRegistry {
    async fn load(&self) -> GatewayResult<RegistrySnapshot> {
        Ok(self.snapshot.clone())
    }

    fn describe(&self) -> String {
        format!("static ({} devices)", self.snapshot.len())
    }
}

/// Name-based access to device descriptors
#[derive(Clone)]
pub struct DeviceRegistry {
    source: Arc<dyn RegistrySource>,
}

impl DeviceRegistry {
    pub fn new(source: Arc<dyn RegistrySource>) -> Self {
        Self { source }
    }

    /// Resolve a device name to a validated descriptor.
    ///
    /// Fails with `NotFound` for unknown names and `InvalidConfig` when the
    /// entry lacks a field its protocol kind requires.
    pub async fn lookup(&self, name: &str) -> GatewayResult<DeviceDescriptor> {
        let snapshot = self.source.load().await?;
        let entry = snapshot
            .entry(name)
            .ok_or_else(|| GatewayError::NotFound(name.to_string()))?
            .map_err(GatewayError::InvalidConfig)?;

        entry
            .to_descriptor(name)
            .map_err(GatewayError::InvalidConfig)
    }

    /// Every registered device, in registry order, without validation.
    ///
    /// `if` is reported when it is a string, whatever the rest of the entry holds.
    pub async fn list(&self) -> GatewayResult<Vec<DeviceSummary>> {
        let snapshot = self.source.load().await?;
        Ok(snapshot
            .iter()
            .map(|(name, raw)| DeviceSummary {
                name: name.clone(),
                protocol: raw.get("if").and_then(Value::as_str).map(str::to_string),
            })
            .collect())
    }

    pub fn describe(&self) -> String {
        self.source.describe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::ProtocolKind;
    use std::io::Write;

    const REGISTRY: &str = r#"{
        "spine1": {"if": "gnmi", "ip": "10.0.0.1", "port": 6030, "username": "admin",
                   "skipVerify": true, "insecure": true, "encoding": "json"},
        "leaf1":  {"if": "netconf", "ip": "10.0.0.2", "port": 830, "username": "admin",
                   "hostKeyVerify": false},
        "broken": {"if": "netconf", "ip": "10.0.0.3", "port": 830}
    }"#;

    fn write_registry(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_lookup_and_list() {
        let file = write_registry(REGISTRY);
        let registry = DeviceRegistry::new(Arc::new(FileRegistry::new(file.path())));

        let spine = registry.lookup("spine1").await.unwrap();
        assert_eq!(spine.kind(), ProtocolKind::Gnmi);

        let names: Vec<String> = registry
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, ["spine1", "leaf1", "broken"]);
    }

    #[tokio::test]
    async fn test_unknown_and_invalid_devices() {
        let file = write_registry(REGISTRY);
        let registry = DeviceRegistry::new(Arc::new(FileRegistry::new(file.path())));

        assert!(matches!(
            registry.lookup("nope").await,
            Err(GatewayError::NotFound(_))
        ));
        assert!(matches!(
            registry.lookup("broken").await,
            Err(GatewayError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_mistyped_entry_only_fails_its_own_lookup() {
        let file = write_registry(
            r#"{
                "spine1": {"if": "gnmi", "ip": "10.0.0.1", "port": 6030, "username": "admin",
                           "skipVerify": false, "insecure": true, "encoding": "json"},
                "typo":   {"if": "netconf", "ip": "10.0.0.9", "port": "830", "username": "admin",
                           "hostKeyVerify": false},
                "scalar": 42
            }"#,
        );
        let registry = DeviceRegistry::new(Arc::new(FileRegistry::new(file.path())));

        assert!(registry.lookup("spine1").await.is_ok());

        match registry.lookup("typo").await {
            Err(GatewayError::InvalidConfig(message)) => {
                assert!(message.contains("'typo'"), "{}", message)
            }
            other => panic!("expected InvalidConfig, got {:?}", other),
        }
        assert!(matches!(
            registry.lookup("scalar").await,
            Err(GatewayError::InvalidConfig(_))
        ));

        let listed: Vec<(String, Option<String>)> = registry
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|d| (d.name, d.protocol))
            .collect();
        assert_eq!(
            listed,
            [
                ("spine1".to_string(), Some("gnmi".to_string())),
                ("typo".to_string(), Some("netconf".to_string())),
                ("scalar".to_string(), None),
            ]
        );
    }

    #[tokio::test]
    async fn test_non_object_registry_is_invalid_config() {
        let file = write_registry(r#"["spine1"]"#);
        let registry = DeviceRegistry::new(Arc::new(FileRegistry::new(file.path())));
        assert!(matches!(
            registry.lookup("spine1").await,
            Err(GatewayError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_file_changes_are_picked_up() {
        let file = write_registry(r#"{}"#);
        let registry = DeviceRegistry::new(Arc::new(FileRegistry::new(file.path())));
        assert!(registry.list().await.unwrap().is_empty());

        std::fs::write(file.path(), REGISTRY).unwrap();
        assert_eq!(registry.list().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_missing_file_is_invalid_config() {
        let registry = DeviceRegistry::new(Arc::new(FileRegistry::new("/nonexistent/connect.json")));
        assert!(matches!(
            registry.list().await,
            Err(GatewayError::InvalidConfig(_))
        ));
    }
}
