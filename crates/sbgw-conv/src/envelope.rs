//! NETCONF envelope handling: unwrapping get-config results, wrapping edit-config bodies

use crate::error::{ConvError, ConvResult};
use crate::xml::{self, XmlNode};

/// NETCONF base:1.0 namespace
pub const NETCONF_BASE_NS: &str = "urn:ietf:params:xml:ns:netconf:base:1.0";

/// Envelope elements stripped from a retrieved configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnwrapRules {
    pub envelopes: Vec<String>,
}

impl Default for UnwrapRules {
    fn default() -> Self {
        Self {
            envelopes: vec!["data".to_string(), "config".to_string()],
        }
    }
}

impl UnwrapRules {
    pub fn new<I, S>(envelopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            envelopes: envelopes.into_iter().map(Into::into).collect(),
        }
    }

    /// Descend through each envelope in turn.
    ///
    /// An envelope is only removed when it is the sole element at the current
    /// level; otherwise that rule is skipped and the next one is tried.
    /// Attributes on removed envelopes are dropped with them.
    pub fn apply(&self, mut nodes: Vec<XmlNode>) -> Vec<XmlNode> {
        for envelope in &self.envelopes {
            if nodes.len() == 1 && nodes[0].local_name() == envelope {
                nodes = nodes.remove(0).children;
            }
        }
        nodes
    }
}

/// Wrap an edit-config body in a `<config>` element declaring the base namespace.
///
/// The fragment must be well-formed XML with at least one element. It is
/// re-serialized from the parsed elements, so declarations, comments and
/// processing instructions are dropped and text is escaped again.
pub fn wrap_edit_config(fragment: &str) -> ConvResult<String> {
    let nodes = xml::parse_fragment(fragment)?;
    if nodes.is_empty() {
        return Err(ConvError::InvalidBody(
            "edit-config body contains no elements".to_string(),
        ));
    }
    if let Some(mixed) = nodes.iter().find_map(find_mixed_content) {
        return Err(ConvError::InvalidBody(format!(
            "element <{}> mixes text with child elements",
            mixed
        )));
    }

    Ok(format!(
        r#"<config xmlns="{ns}" xmlns:nc="{ns}">{body}</config>"#,
        ns = NETCONF_BASE_NS,
        body = xml::write_nodes(&nodes)?
    ))
}

fn find_mixed_content(node: &XmlNode) -> Option<&str> {
    if node.has_mixed_content() {
        return Some(&node.tag);
    }
    node.children.iter().find_map(find_mixed_content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::nodes_to_canonical;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn unwrap_to_json(xml: &str) -> serde_json::Value {
        let nodes = UnwrapRules::default().apply(xml::parse_fragment(xml).unwrap());
        nodes_to_canonical(&nodes).unwrap().into()
    }

    #[test]
    fn test_unwrap_data_config() {
        let value = unwrap_to_json(
            r#"<data xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
                 <config xmlns="urn:vendor"><system><hostname>r1</hostname></system></config>
               </data>"#,
        );
        assert_eq!(value, json!({"system": {"hostname": "r1"}}));
    }

    #[test]
    fn test_unwrap_without_envelopes_is_identity() {
        let value = unwrap_to_json("<system><hostname>r1</hostname></system>");
        assert_eq!(value, json!({"system": {"hostname": "r1"}}));
    }

    #[test]
    fn test_unwrap_data_only() {
        let value = unwrap_to_json("<data><a>1</a><b>2</b></data>");
        assert_eq!(value, json!({"a": "1", "b": "2"}));
    }

    #[test]
    fn test_custom_rules() {
        let rules = UnwrapRules::new(["rpc-reply", "data"]);
        let nodes = rules.apply(
            xml::parse_fragment(r#"<nc:rpc-reply xmlns:nc="urn:x"><data><a>1</a></data></nc:rpc-reply>"#)
                .unwrap(),
        );
        assert_eq!(nodes, vec![XmlNode::new("a").with_text("1")]);
    }

    #[test]
    fn test_wrap_edit_config() {
        assert_eq!(
            wrap_edit_config("<a>1</a>").unwrap(),
            concat!(
                r#"<config xmlns="urn:ietf:params:xml:ns:netconf:base:1.0" "#,
                r#"xmlns:nc="urn:ietf:params:xml:ns:netconf:base:1.0"><a>1</a></config>"#
            )
        );
    }

    #[test]
    fn test_wrap_drops_declaration_of_uploaded_file() {
        let wrapped = wrap_edit_config(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<system><hostname>r1</hostname></system>\n",
        )
        .unwrap();
        assert_eq!(
            wrapped,
            concat!(
                r#"<config xmlns="urn:ietf:params:xml:ns:netconf:base:1.0" "#,
                r#"xmlns:nc="urn:ietf:params:xml:ns:netconf:base:1.0">"#,
                r#"<system><hostname>r1</hostname></system></config>"#
            )
        );
        assert_eq!(xml::parse_document(&wrapped).unwrap().children.len(), 1);
    }

    #[test]
    fn test_wrap_never_carries_end_of_message_marker() {
        let cases = [
            "<!--]]>]]>--><system><hostname>x</hostname></system>",
            "<system><![CDATA[a]]]]><![CDATA[>]]]]><![CDATA[>]]></system>",
            "<system><motd>a]]&gt;]]&gt;b</motd></system>",
            "<?pi ]]>]]>?><system/>",
        ];
        for case in cases {
            let wrapped = wrap_edit_config(case).unwrap();
            assert!(!wrapped.contains("]]>]]>"), "{} gave {}", case, wrapped);
            assert!(!wrapped.contains("<!--"), "{}", wrapped);
            assert_eq!(xml::parse_document(&wrapped).unwrap().tag, "config");
        }
    }

    #[test]
    fn test_wrap_keeps_prefixed_namespaces() {
        let wrapped = wrap_edit_config(
            r#"<if:interfaces xmlns:if="urn:ietf:params:xml:ns:yang:ietf-interfaces"><if:interface/></if:interfaces>"#,
        )
        .unwrap();
        assert!(wrapped.contains(
            r#"<if:interfaces xmlns:if="urn:ietf:params:xml:ns:yang:ietf-interfaces"><if:interface/></if:interfaces>"#
        ));
    }

    #[test]
    fn test_wrap_rejects_bad_fragments() {
        assert!(matches!(wrap_edit_config("<a>1</b>"), Err(ConvError::Xml(_)) | Err(ConvError::Malformed(_))));
        assert!(matches!(wrap_edit_config("   "), Err(ConvError::InvalidBody(_))));
        assert!(matches!(
            wrap_edit_config("<motd>hello <b>world</b></motd>"),
            Err(ConvError::InvalidBody(_))
        ));
    }
}
