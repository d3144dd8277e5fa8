//! Canonical request bodies -> protocol-native payloads

use sbgw_core::{CanonicalValue, ProtocolKind};

use crate::canonical::canonical_to_xml;
use crate::error::{ConvError, ConvResult};

/// One logical path and the value to write there
#[derive(Debug, Clone, PartialEq)]
pub struct PathUpdate {
    pub path: String,
    pub value: CanonicalValue,
}

/// Request payload in the shape a driver sends
#[derive(Debug, Clone, PartialEq)]
pub enum NativePayload {
    /// Body of a NETCONF `<config>` element
    XmlFragment(String),
    /// gNMI updates, in body order
    PathUpdates(Vec<PathUpdate>),
}

/// Convert a canonical set body for the given protocol
pub fn from_canonical(value: &CanonicalValue, kind: ProtocolKind) -> ConvResult<NativePayload> {
    match kind {
        ProtocolKind::Netconf => Ok(NativePayload::XmlFragment(canonical_to_xml(value)?)),
        ProtocolKind::Gnmi => path_updates(value).map(NativePayload::PathUpdates),
    }
}

fn path_updates(value: &CanonicalValue) -> ConvResult<Vec<PathUpdate>> {
    let map = value.as_mapping().ok_or_else(|| {
        ConvError::InvalidBody(format!(
            "set body must be a mapping of path to value, found {}",
            value.type_name()
        ))
    })?;
    if map.is_empty() {
        return Err(ConvError::InvalidBody("set body has no updates".to_string()));
    }

    map.iter()
        .map(|(path, value)| {
            if path.trim().is_empty() {
                return Err(ConvError::InvalidBody("empty path in set body".to_string()));
            }
            Ok(PathUpdate {
                path: path.clone(),
                value: value.clone(),
            })
        })
        .collect()
}

/// Parse JSON bytes (gNMI `json_val` / `json_ietf_val`, HTTP bodies)
pub fn from_json_bytes(bytes: &[u8]) -> ConvResult<CanonicalValue> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Serialize a canonical value as compact JSON
pub fn to_json_bytes(value: &CanonicalValue) -> ConvResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::xml_to_canonical;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_gnmi_updates_keep_body_order() {
        let body: CanonicalValue = serde_json::from_str(
            r#"{"system/config/hostname": "r1",
                "interfaces/interface[name=eth0]/config/mtu": 9000,
                "acl/config/name": "edge"}"#,
        )
        .unwrap();
        let NativePayload::PathUpdates(updates) = from_canonical(&body, ProtocolKind::Gnmi).unwrap()
        else {
            panic!("expected path updates");
        };
        let paths: Vec<&str> = updates.iter().map(|u| u.path.as_str()).collect();
        assert_eq!(
            paths,
            [
                "system/config/hostname",
                "interfaces/interface[name=eth0]/config/mtu",
                "acl/config/name"
            ]
        );
        assert_eq!(updates[0].value, CanonicalValue::from("r1"));
    }

    #[test]
    fn test_gnmi_rejects_non_mapping_or_empty() {
        for body in [json!([1, 2]), json!({}), json!("x")] {
            assert!(matches!(
                from_canonical(&body.into(), ProtocolKind::Gnmi),
                Err(ConvError::InvalidBody(_))
            ));
        }
    }

    #[test]
    fn test_netconf_round_trip() {
        let fragment = r#"<system xmlns="urn:example"><hostname>r1</hostname></system>"#;
        let canonical = xml_to_canonical(fragment).unwrap();
        assert_eq!(
            from_canonical(&canonical, ProtocolKind::Netconf).unwrap(),
            NativePayload::XmlFragment(fragment.to_string())
        );
    }

    #[test]
    fn test_json_helpers() {
        let value = from_json_bytes(br#"{"b": 1, "a": [true, null]}"#).unwrap();
        assert_eq!(to_json_bytes(&value).unwrap(), br#"{"b":1,"a":[true,null]}"#.to_vec());
        assert!(matches!(from_json_bytes(b"{oops"), Err(ConvError::Json(_))));
    }
}
