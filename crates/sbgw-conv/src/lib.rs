//! sbgw-conv - Payload normalization for the southbound gateway
//!
//! Converts protocol-native documents (NETCONF XML, gNMI JSON values) into
//! [`CanonicalValue`](sbgw_core::CanonicalValue)s and canonical request bodies
//! back into native payloads.
//!
//! # Quick Start
//!
//! ```rust
//! use sbgw_conv::{wrap_edit_config, xml_to_canonical, canonical_to_xml};
//!
//! let value = xml_to_canonical("<system><hostname>r1</hostname></system>").unwrap();
//! assert_eq!(value.get("system").and_then(|s| s.get("hostname")).and_then(|h| h.as_str()), Some("r1"));
//!
//! let xml = canonical_to_xml(&value).unwrap();
//! assert!(wrap_edit_config(&xml).unwrap().starts_with("<config "));
//! ```

pub mod canonical;
pub mod envelope;
pub mod error;
pub mod native;
pub mod xml;

pub use canonical::{
    canonical_to_nodes, canonical_to_xml, element_value, nodes_to_canonical, xml_to_canonical,
};
pub use envelope::{wrap_edit_config, UnwrapRules, NETCONF_BASE_NS};
pub use error::{ConvError, ConvResult};
pub use native::{from_canonical, from_json_bytes, to_json_bytes, NativePayload, PathUpdate};
pub use xml::{parse_document, parse_fragment, write_nodes, write_pretty, XmlNode};
