//! Device descriptors
//!
//! A descriptor is the validated, protocol-specific view of one registry
//! entry. Raw entries are only turned into descriptors at lookup time, so an
//! incomplete entry fails the request that needs it instead of the whole
//! registry.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Network-management protocol spoken by a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolKind {
    Gnmi,
    Netconf,
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProtocolKind::Gnmi => "gnmi",
            ProtocolKind::Netconf => "netconf",
        })
    }
}

impl FromStr for ProtocolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gnmi" => Ok(ProtocolKind::Gnmi),
            "netconf" => Ok(ProtocolKind::Netconf),
            other => Err(format!("unknown protocol kind '{}'", other)),
        }
    }
}

/// gNMI value encoding requested from (and sent to) a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Json,
    Bytes,
    Proto,
    Ascii,
    JsonIetf,
}

impl Encoding {
    /// Wire value of the gNMI `Encoding` enum
    pub fn to_proto(self) -> i32 {
        match self {
            Encoding::Json => 0,
            Encoding::Bytes => 1,
            Encoding::Proto => 2,
            Encoding::Ascii => 3,
            Encoding::JsonIetf => 4,
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Encoding::Json => "json",
            Encoding::Bytes => "bytes",
            Encoding::Proto => "proto",
            Encoding::Ascii => "ascii",
            Encoding::JsonIetf => "json_ietf",
        })
    }
}

impl FromStr for Encoding {
    type Err = String;

    /// Accepts "json", "JSON_IETF", "json-ietf", ...
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "json" => Ok(Encoding::Json),
            "bytes" => Ok(Encoding::Bytes),
            "proto" => Ok(Encoding::Proto),
            "ascii" => Ok(Encoding::Ascii),
            "json_ietf" => Ok(Encoding::JsonIetf),
            other => Err(format!("unknown encoding '{}'", other)),
        }
    }
}

/// Host and port of a managed device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAddress {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// gNMI connection options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GnmiOptions {
    /// Accept any server certificate
    pub skip_verify: bool,
    /// Plaintext gRPC (no TLS)
    pub insecure: bool,
    pub encoding: Encoding,
    /// Paths assembled into the default (path-less) get
    pub root_paths: Option<Vec<String>>,
}

/// NETCONF connection options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetconfOptions {
    /// Check the SSH host key against known_hosts
    pub host_key_verify: bool,
}

/// Protocol-specific part of a descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolOptions {
    Gnmi(GnmiOptions),
    Netconf(NetconfOptions),
}

/// Static connection and protocol metadata for one managed device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub name: String,
    pub address: DeviceAddress,
    pub username: String,
    pub protocol: ProtocolOptions,
}

impl DeviceDescriptor {
    pub fn kind(&self) -> ProtocolKind {
        match self.protocol {
            ProtocolOptions::Gnmi(_) => ProtocolKind::Gnmi,
            ProtocolOptions::Netconf(_) => ProtocolKind::Netconf,
        }
    }

    pub fn gnmi(&self) -> Option<&GnmiOptions> {
        match &self.protocol {
            ProtocolOptions::Gnmi(opts) => Some(opts),
            ProtocolOptions::Netconf(_) => None,
        }
    }

    pub fn netconf(&self) -> Option<&NetconfOptions> {
        match &self.protocol {
            ProtocolOptions::Netconf(opts) => Some(opts),
            ProtocolOptions::Gnmi(_) => None,
        }
    }
}

/// One entry of the registry file, before validation.
///
/// Field names follow the registry file format (`connect.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryEntry {
    #[serde(rename = "if", default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(rename = "ip", default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(rename = "skipVerify", default, skip_serializing_if = "Option::is_none")]
    pub skip_verify: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(rename = "rootpath", default, skip_serializing_if = "Option::is_none")]
    pub root_paths: Option<Vec<String>>,
    #[serde(rename = "hostKeyVerify", default, skip_serializing_if = "Option::is_none")]
    pub host_key_verify: Option<bool>,
}

impl RegistryEntry {
    /// Validate the entry for its declared protocol kind.
    ///
    /// Every field the kind requires must be present; nothing is defaulted.
    pub fn to_descriptor(&self, name: &str) -> Result<DeviceDescriptor, String> {
        let kind: ProtocolKind = self
            .protocol
            .as_deref()
            .ok_or_else(|| missing(name, "if"))?
            .parse()
            .map_err(|e| format!("device '{}': {}", name, e))?;

        let address = DeviceAddress {
            host: self.host.clone().ok_or_else(|| missing(name, "ip"))?,
            port: self.port.ok_or_else(|| missing(name, "port"))?,
        };
        let username = self
            .username
            .clone()
            .ok_or_else(|| missing(name, "username"))?;

        let protocol = match kind {
            ProtocolKind::Gnmi => {
                let encoding = self
                    .encoding
                    .as_deref()
                    .ok_or_else(|| missing(name, "encoding"))?
                    .parse()
                    .map_err(|e| format!("device '{}': {}", name, e))?;
                ProtocolOptions::Gnmi(GnmiOptions {
                    skip_verify: self.skip_verify.ok_or_else(|| missing(name, "skipVerify"))?,
                    insecure: self.insecure.ok_or_else(|| missing(name, "insecure"))?,
                    encoding,
                    root_paths: self.root_paths.clone(),
                })
            }
            ProtocolKind::Netconf => ProtocolOptions::Netconf(NetconfOptions {
                host_key_verify: self
                    .host_key_verify
                    .ok_or_else(|| missing(name, "hostKeyVerify"))?,
            }),
        };

        Ok(DeviceDescriptor {
            name: name.to_string(),
            address,
            username,
            protocol,
        })
    }
}

fn missing(name: &str, field: &str) -> String {
    format!("device '{}' is missing required field '{}'", name, field)
}
