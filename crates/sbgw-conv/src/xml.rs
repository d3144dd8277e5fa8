//! Minimal XML element tree, parsed and written with quick-xml

use indexmap::IndexMap;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::QName;
use quick_xml::{Reader, Writer};

use crate::error::{ConvError, ConvResult};

/// An XML element.
///
/// Whitespace-only text is dropped while parsing. Text found next to child
/// elements is kept, so callers can detect mixed content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlNode {
    pub tag: String,
    /// Attributes in document order
    pub attributes: IndexMap<String, String>,
    pub children: Vec<XmlNode>,
    pub text: Option<String>,
}

impl XmlNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: IndexMap::new(),
            children: Vec::new(),
            text: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: XmlNode) -> Self {
        self.children.push(child);
        self
    }

    /// Tag without its namespace prefix
    pub fn local_name(&self) -> &str {
        local_name(&self.tag)
    }

    /// First child whose local name matches
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.local_name() == name)
    }

    /// All children whose local name matches
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children.iter().filter(move |c| c.local_name() == name)
    }

    /// True when non-whitespace text sits alongside child elements
    pub fn has_mixed_content(&self) -> bool {
        self.text.is_some() && !self.children.is_empty()
    }

    /// Compact serialization
    pub fn to_xml(&self) -> ConvResult<String> {
        write_nodes(std::slice::from_ref(self))
    }
}

/// Strip a `prefix:` from a qualified name
pub fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map(|(_, local)| local).unwrap_or(name)
}

/// Parse a document with exactly one root element
pub fn parse_document(xml: &str) -> ConvResult<XmlNode> {
    let mut nodes = parse_nodes(xml)?;
    match nodes.len() {
        0 => Err(ConvError::Malformed("no root element found".to_string())),
        1 => Ok(nodes.remove(0)),
        _ => Err(ConvError::Malformed(
            "multiple top-level elements found".to_string(),
        )),
    }
}

/// Parse zero or more top-level elements
pub fn parse_fragment(xml: &str) -> ConvResult<Vec<XmlNode>> {
    parse_nodes(xml)
}

fn parse_nodes(xml: &str) -> ConvResult<Vec<XmlNode>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<XmlNode> = Vec::new();
    let mut top: Vec<XmlNode> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                stack.push(build_node(&e, &reader)?);
            }
            Event::Empty(e) => {
                let node = build_node(&e, &reader)?;
                attach(&mut stack, &mut top, node);
            }
            Event::Text(e) => {
                let text = e.unescape()?;
                push_text(&mut stack, &text)?;
            }
            Event::CData(e) => {
                let text = std::str::from_utf8(e.as_ref())?;
                push_text(&mut stack, text)?;
            }
            Event::End(_) => {
                let node = stack.pop().ok_or_else(|| {
                    ConvError::Malformed("closing tag without open tag".to_string())
                })?;
                attach(&mut stack, &mut top, node);
            }
            Event::Eof => break,
            Event::Decl(_) | Event::PI(_) | Event::DocType(_) | Event::Comment(_) => {}
        }
    }

    if !stack.is_empty() {
        return Err(ConvError::Malformed(
            "unclosed element(s) at end of document".to_string(),
        ));
    }

    Ok(top)
}

fn attach(stack: &mut [XmlNode], top: &mut Vec<XmlNode>, node: XmlNode) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => top.push(node),
    }
}

fn push_text(stack: &mut [XmlNode], text: &str) -> ConvResult<()> {
    if text.trim().is_empty() {
        return Ok(());
    }
    match stack.last_mut() {
        Some(current) => {
            match &mut current.text {
                Some(existing) => existing.push_str(text),
                None => current.text = Some(text.to_string()),
            }
            Ok(())
        }
        None => Err(ConvError::Malformed(
            "text outside of any element".to_string(),
        )),
    }
}

fn build_node(e: &BytesStart<'_>, reader: &Reader<&[u8]>) -> ConvResult<XmlNode> {
    let mut node = XmlNode::new(qname_to_string(e.name())?);

    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = qname_to_string(attr.key)?;
        let value = attr
            .decode_and_unescape_value(reader.decoder())?
            .into_owned();
        node.attributes.insert(key, value);
    }

    Ok(node)
}

fn qname_to_string(name: QName<'_>) -> ConvResult<String> {
    Ok(std::str::from_utf8(name.as_ref())?.to_string())
}

/// Serialize elements back to back, without indentation
pub fn write_nodes(nodes: &[XmlNode]) -> ConvResult<String> {
    let mut writer = Writer::new(Vec::new());
    for node in nodes {
        write_node(&mut writer, node)?;
    }
    into_string(writer)
}

/// Serialize one element with two-space indentation
pub fn write_pretty(node: &XmlNode) -> ConvResult<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    write_node(&mut writer, node)?;
    into_string(writer)
}

fn into_string(writer: Writer<Vec<u8>>) -> ConvResult<String> {
    String::from_utf8(writer.into_inner())
        .map_err(|e| ConvError::Malformed(format!("serialized XML is not UTF-8: {}", e)))
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &XmlNode) -> Result<(), quick_xml::Error> {
    let mut start = BytesStart::new(node.tag.as_str());
    for (key, value) in &node.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if node.children.is_empty() && node.text.is_none() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    if let Some(text) = &node.text {
        writer.write_event(Event::Text(BytesText::new(text)))?;
    }
    for child in &node.children {
        write_node(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(node.tag.as_str())))?;
    Ok(())
}
