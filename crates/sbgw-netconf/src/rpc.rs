//! NETCONF RPC construction and reply handling

use sbgw_conv::{nodes_to_canonical, parse_document, XmlNode, NETCONF_BASE_NS};
use sbgw_core::{GatewayError, GatewayResult};
use tracing::warn;

/// Capability advertised in our hello
pub const BASE_1_0: &str = "urn:ietf:params:netconf:base:1.0";

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Client hello advertising base:1.0 only
pub fn hello() -> String {
    format!(
        r#"{}<hello xmlns="{}"><capabilities><capability>{}</capability></capabilities></hello>"#,
        XML_DECLARATION, NETCONF_BASE_NS, BASE_1_0
    )
}

/// Wrap an operation in an `<rpc>` element
pub fn rpc(message_id: u64, operation: &str) -> String {
    format!(
        r#"{}<rpc message-id="{}" xmlns="{}">{}</rpc>"#,
        XML_DECLARATION, message_id, NETCONF_BASE_NS, operation
    )
}

/// `<get-config>` of the running datastore
pub fn get_config_running() -> String {
    "<get-config><source><running/></source></get-config>".to_string()
}

/// `<edit-config>` against running, replacing by default
pub fn edit_config_running(config: &str) -> String {
    format!(
        "<edit-config><target><running/></target><default-operation>replace</default-operation>{}</edit-config>",
        config
    )
}

pub fn close_session() -> String {
    "<close-session/>".to_string()
}

/// Parse an `<rpc-reply>`, failing on any `<rpc-error>` of severity error
pub fn parse_reply(xml: &str) -> GatewayResult<XmlNode> {
    let reply = parse_document(xml)
        .map_err(|e| GatewayError::protocol(format!("malformed rpc-reply: {}", e)))?;
    if reply.local_name() != "rpc-reply" {
        return Err(GatewayError::protocol(format!(
            "expected <rpc-reply>, got <{}>",
            reply.tag
        )));
    }

    let (errors, warnings): (Vec<&XmlNode>, Vec<&XmlNode>) = reply
        .children_named("rpc-error")
        .partition(|e| severity(e) != Some("warning"));

    for warning in &warnings {
        warn!(message = %error_message(warning), "Device reported an rpc-error warning");
    }

    if let Some(first) = errors.first() {
        let stripped: Vec<XmlNode> = errors.iter().copied().map(strip_namespaces).collect();
        return Err(GatewayError::Protocol {
            message: format!("device rejected the RPC: {}", error_message(first)),
            detail: nodes_to_canonical(&stripped).ok(),
        });
    }

    Ok(reply)
}

/// `<data>` of a get-config reply
pub fn reply_data(reply: &XmlNode) -> GatewayResult<&XmlNode> {
    reply
        .child("data")
        .ok_or_else(|| GatewayError::protocol("get-config reply has no <data> element"))
}

/// Require `<ok/>` in a reply
pub fn expect_ok(reply: &XmlNode) -> GatewayResult<()> {
    match reply.child("ok") {
        Some(_) => Ok(()),
        None => Err(GatewayError::protocol(
            "reply carried neither <ok/> nor <rpc-error>",
        )),
    }
}

fn severity(error: &XmlNode) -> Option<&str> {
    error
        .child("error-severity")
        .and_then(|s| s.text.as_deref())
        .map(str::trim)
}

fn error_message(error: &XmlNode) -> String {
    for field in ["error-message", "error-tag"] {
        if let Some(text) = error.child(field).and_then(|n| n.text.as_deref()) {
            return text.trim().to_string();
        }
    }
    "unspecified error".to_string()
}

// Error payloads routinely carry prefixes and namespace declarations
fn strip_namespaces(node: &XmlNode) -> XmlNode {
    XmlNode {
        tag: node.local_name().to_string(),
        attributes: Default::default(),
        children: node.children.iter().map(strip_namespaces).collect(),
        text: node.text.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sbgw_core::CanonicalValue;

    fn detail_field<'a>(detail: &'a CanonicalValue, field: &str) -> Option<&'a str> {
        detail.get("rpc-error")?.get(field)?.as_str()
    }

    #[test]
    fn test_rpc_envelope() {
        assert_eq!(
            rpc(7, &get_config_running()),
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8"?>"#,
                r#"<rpc message-id="7" xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">"#,
                "<get-config><source><running/></source></get-config></rpc>"
            )
        );
    }

    #[test]
    fn test_edit_config_declares_replace() {
        let op = edit_config_running("<config><a>1</a></config>");
        let parsed = parse_document(&op).unwrap();
        assert_eq!(
            parsed.child("default-operation").unwrap().text.as_deref(),
            Some("replace")
        );
        assert!(parsed.child("target").unwrap().child("running").is_some());
    }

    #[test]
    fn test_reply_with_data() {
        let reply = parse_reply(
            r#"<rpc-reply message-id="1" xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
                 <data><system><hostname>r1</hostname></system></data>
               </rpc-reply>"#,
        )
        .unwrap();
        assert_eq!(reply_data(&reply).unwrap().children.len(), 1);
        assert!(expect_ok(&reply).is_err());
    }

    #[test]
    fn test_rpc_error_becomes_protocol_error() {
        let err = parse_reply(
            r#"<nc:rpc-reply xmlns:nc="urn:ietf:params:xml:ns:netconf:base:1.0" message-id="2">
                 <nc:rpc-error>
                   <nc:error-type>application</nc:error-type>
                   <nc:error-tag>invalid-value</nc:error-tag>
                   <nc:error-severity>error</nc:error-severity>
                   <nc:error-message xml:lang="en">MTU out of range</nc:error-message>
                 </nc:rpc-error>
               </nc:rpc-reply>"#,
        )
        .unwrap_err();

        match err {
            GatewayError::Protocol { message, detail } => {
                assert!(message.contains("MTU out of range"));
                let detail = detail.unwrap();
                assert_eq!(detail_field(&detail, "error-tag"), Some("invalid-value"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_warnings_do_not_fail() {
        let reply = parse_reply(
            r#"<rpc-reply><rpc-error><error-severity>warning</error-severity>
               <error-message>deprecated leaf</error-message></rpc-error><ok/></rpc-reply>"#,
        )
        .unwrap();
        assert!(expect_ok(&reply).is_ok());
    }

    #[test]
    fn test_unexpected_documents() {
        assert!(matches!(parse_reply("<hello/>"), Err(GatewayError::Protocol { .. })));
        assert!(matches!(parse_reply("<rpc-reply>"), Err(GatewayError::Protocol { .. })));
    }
}
