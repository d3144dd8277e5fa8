//! XML <-> canonical value conversion
//!
//! The mapping follows the usual element-to-key convention:
//!
//! | XML | canonical |
//! |-----|-----------|
//! | `<a>text</a>` | `"a": "text"` |
//! | `<a/>` | `"a": null` |
//! | `<a k="v">text</a>` | `"a": {"@k": "v", "#text": "text"}` |
//! | `<a><b>1</b><c/></a>` | `"a": {"b": "1", "c": null}` |
//! | `<a>1</a><a>2</a>` | `"a": ["1", "2"]` |
//!
//! Repeated siblings are grouped at the position of their first occurrence.
//! Mixed content and prefixed names have no mapping and are rejected.

use sbgw_core::{CanonicalValue, Mapping};

use crate::error::{ConvError, ConvResult};
use crate::xml::{self, XmlNode};

const ATTRIBUTE_PREFIX: char = '@';
const TEXT_KEY: &str = "#text";

/// Convert sibling elements into a mapping keyed by tag
pub fn nodes_to_canonical(nodes: &[XmlNode]) -> ConvResult<CanonicalValue> {
    let mut map = Mapping::new();
    for node in nodes {
        check_name(&node.tag)?;
        insert_grouped(&mut map, node.tag.clone(), element_value(node)?);
    }
    Ok(CanonicalValue::Mapping(map))
}

/// Canonical value of a single element's content
pub fn element_value(node: &XmlNode) -> ConvResult<CanonicalValue> {
    if node.has_mixed_content() {
        return Err(ConvError::unsupported(format!(
            "element <{}> has mixed text and element content",
            node.tag
        )));
    }

    if node.attributes.is_empty() && node.children.is_empty() {
        return Ok(match &node.text {
            Some(text) => CanonicalValue::String(text.clone()),
            None => CanonicalValue::Null,
        });
    }

    let mut map = Mapping::new();
    for (key, value) in &node.attributes {
        check_attribute_name(key)?;
        map.insert(
            format!("{}{}", ATTRIBUTE_PREFIX, key),
            CanonicalValue::String(value.clone()),
        );
    }
    if let Some(text) = &node.text {
        map.insert(TEXT_KEY.to_string(), CanonicalValue::String(text.clone()));
    }
    for child in &node.children {
        check_name(&child.tag)?;
        insert_grouped(&mut map, child.tag.clone(), element_value(child)?);
    }
    Ok(CanonicalValue::Mapping(map))
}

fn insert_grouped(map: &mut Mapping, key: String, value: CanonicalValue) {
    match map.get_mut(&key) {
        // Element values are never sequences, so an existing sequence is a group
        Some(CanonicalValue::Sequence(items)) => items.push(value),
        Some(existing) => {
            let first = std::mem::take(existing);
            *existing = CanonicalValue::Sequence(vec![first, value]);
        }
        None => {
            map.insert(key, value);
        }
    }
}

/// Parse an XML fragment straight to canonical form
pub fn xml_to_canonical(fragment: &str) -> ConvResult<CanonicalValue> {
    nodes_to_canonical(&xml::parse_fragment(fragment)?)
}

/// Convert a canonical mapping into sibling elements
pub fn canonical_to_nodes(value: &CanonicalValue) -> ConvResult<Vec<XmlNode>> {
    let map = value.as_mapping().ok_or_else(|| {
        ConvError::unsupported(format!(
            "top-level value must be a mapping, found {}",
            value.type_name()
        ))
    })?;

    let mut nodes = Vec::new();
    for (key, value) in map {
        if key.starts_with(ATTRIBUTE_PREFIX) || key == TEXT_KEY {
            return Err(ConvError::unsupported(format!(
                "'{}' cannot appear outside an element",
                key
            )));
        }
        push_elements(&mut nodes, key, value)?;
    }
    Ok(nodes)
}

/// Serialize a canonical mapping as a compact XML fragment
pub fn canonical_to_xml(value: &CanonicalValue) -> ConvResult<String> {
    xml::write_nodes(&canonical_to_nodes(value)?)
}

fn push_elements(out: &mut Vec<XmlNode>, tag: &str, value: &CanonicalValue) -> ConvResult<()> {
    check_name(tag)?;
    match value {
        CanonicalValue::Sequence(items) => {
            for item in items {
                if matches!(item, CanonicalValue::Sequence(_)) {
                    return Err(ConvError::unsupported(format!(
                        "nested sequence under '{}' has no XML form",
                        tag
                    )));
                }
                out.push(build_element(tag, item)?);
            }
            Ok(())
        }
        other => {
            out.push(build_element(tag, other)?);
            Ok(())
        }
    }
}

fn build_element(tag: &str, value: &CanonicalValue) -> ConvResult<XmlNode> {
    let mut node = XmlNode::new(tag);

    let map = match value {
        CanonicalValue::Mapping(map) => map,
        CanonicalValue::Null => return Ok(node),
        scalar => {
            node.text = scalar.render_scalar().filter(|t| !t.is_empty());
            return Ok(node);
        }
    };

    let mut has_elements = false;
    for (key, child) in map {
        if let Some(attr) = key.strip_prefix(ATTRIBUTE_PREFIX) {
            check_attribute_name(attr)?;
            let rendered = child.render_scalar().ok_or_else(|| {
                ConvError::unsupported(format!(
                    "attribute '{}' of <{}> must be a scalar, found {}",
                    attr,
                    tag,
                    child.type_name()
                ))
            })?;
            node.attributes.insert(attr.to_string(), rendered);
        } else if key == TEXT_KEY {
            let text = child.render_scalar().ok_or_else(|| {
                ConvError::unsupported(format!("text of <{}> must be a scalar", tag))
            })?;
            node.text = Some(text).filter(|t| !t.is_empty());
        } else {
            has_elements = true;
            push_elements(&mut node.children, key, child)?;
        }
    }

    if has_elements && node.text.is_some() {
        return Err(ConvError::unsupported(format!(
            "<{}> mixes '{}' with child elements",
            tag, TEXT_KEY
        )));
    }
    Ok(node)
}

fn check_name(name: &str) -> ConvResult<()> {
    if name.contains(':') {
        return Err(ConvError::unsupported(format!(
            "namespace-prefixed name '{}' is not supported",
            name
        )));
    }
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_alphabetic() || c == '_')
        .unwrap_or(false);
    if !valid_start || !chars.all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.')) {
        return Err(ConvError::unsupported(format!(
            "'{}' is not a valid XML element name",
            name
        )));
    }
    Ok(())
}

fn check_attribute_name(name: &str) -> ConvResult<()> {
    // The default namespace declaration is the one namespace form carried through
    if name == "xmlns" {
        return Ok(());
    }
    check_name(name)
}
