//! Null-safe navigation over one parsed curriculum document.
//!
//! The document is read once with quick-xml into a small element tree;
//! [`Node`] then answers attribute and child lookups without ever failing.
//! An absent node behaves like an element with no attributes and no children.
//!
//! Lookup tags are normalised before comparison (uppercase, spaces become
//! hyphens), so `node.attribute("nome completo")` reads `NOME-COMPLETO`.
//! Empty attribute values are treated as absent.

use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct XmlError(String);

fn malformed(reason: impl std::fmt::Display) -> XmlError {
    XmlError(reason.to_string())
}

/// One parsed element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlElement>,
    text: String,
}

impl XmlElement {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node(&self) -> Node<'_> {
        Node::new(self)
    }
}

/// Parse a complete document and return its root element.
///
/// Fails if the input is not well-formed: unbalanced tags, broken
/// attributes, no root element, or undecodable text.
pub fn parse_document<R: BufRead>(input: R) -> Result<XmlElement, XmlError> {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let element = open_element(&reader, e)?;
                stack.push(element);
            }
            Ok(Event::Empty(ref e)) => {
                let element = open_element(&reader, e)?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| malformed("closing tag without matching opening tag"))?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::Text(ref e)) => {
                let text = e.unescape().map_err(malformed)?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text);
                }
            }
            Ok(Event::CData(ref e)) => {
                if let Some(current) = stack.last_mut() {
                    let text = reader.decoder().decode(&**e).map_err(malformed)?;
                    current.text.push_str(&text);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(malformed(format!(
                    "XML error at position {}: {e}",
                    reader.buffer_position()
                )))
            }
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(malformed(format!("unexpected end of document inside <{}>", open.name)));
    }
    root.ok_or_else(|| malformed("document has no root element"))
}

fn open_element<R>(reader: &Reader<R>, start: &BytesStart<'_>) -> Result<XmlElement, XmlError> {
    let decoder = reader.decoder();
    let name = decoder.decode(start.name().as_ref()).map_err(malformed)?.into_owned();

    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(malformed)?;
        let key = decoder.decode(attr.key.as_ref()).map_err(malformed)?.into_owned();
        let value = attr.decode_and_unescape_value(decoder).map_err(malformed)?.into_owned();
        attributes.push((key, value));
    }

    Ok(XmlElement {
        name,
        attributes,
        children: Vec::new(),
        text: String::new(),
    })
}

fn attach(
    stack: &mut Vec<XmlElement>,
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(malformed("more than one root element")),
    }
    Ok(())
}

// ── Accessor ────────────────────────────────────────────────────────────────

/// Uppercase and replace spaces with hyphens: `"nome completo"` → `"NOME-COMPLETO"`.
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().to_uppercase().replace(' ', "-")
}

/// Parse a non-empty, digit-only string. Anything else (including values
/// that do not fit an `i32`) is "no value".
pub fn as_int(text: Option<&str>) -> Option<i32> {
    let text = text?;
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Borrowed, possibly absent element.
#[derive(Debug, Clone, Copy)]
pub struct Node<'a> {
    element: Option<&'a XmlElement>,
}

impl<'a> Node<'a> {
    pub fn new(element: &'a XmlElement) -> Self {
        Self { element: Some(element) }
    }

    pub fn absent() -> Self {
        Self { element: None }
    }

    pub fn is_present(&self) -> bool {
        self.element.is_some()
    }

    /// Tag name, or `None` when absent.
    pub fn name(&self) -> Option<&'a str> {
        self.element.map(|e| e.name.as_str())
    }

    /// Attribute value; empty strings count as absent.
    pub fn attribute(&self, tag: &str) -> Option<&'a str> {
        let element = self.element?;
        let key = normalize_tag(tag);
        element
            .attributes
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }

    /// Owned copy of [`Node::attribute`].
    pub fn text_of(&self, tag: &str) -> Option<String> {
        self.attribute(tag).map(str::to_string)
    }

    /// Attribute parsed with [`as_int`].
    pub fn int(&self, tag: &str) -> Option<i32> {
        as_int(self.attribute(tag))
    }

    /// Element text content; empty counts as absent.
    pub fn text(&self) -> Option<&'a str> {
        self.element.map(|e| e.text.as_str()).filter(|t| !t.is_empty())
    }

    /// First child named `tag`, or an absent node.
    pub fn first(&self, tag: &str) -> Node<'a> {
        let key = normalize_tag(tag);
        self.element
            .and_then(|e| e.children.iter().find(|c| c.name == key))
            .map(Node::new)
            .unwrap_or_else(Node::absent)
    }

    /// All children named `tag`, in document order.
    pub fn all(&self, tag: &str) -> Vec<Node<'a>> {
        let key = normalize_tag(tag);
        self.children().filter(|c| c.name() == Some(key.as_str())).collect()
    }

    /// All children in document order.
    pub fn children(&self) -> impl Iterator<Item = Node<'a>> + 'a {
        self.element
            .map(|e| e.children.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(Node::new)
    }

    /// Follow `first` through each tag in turn.
    pub fn path(&self, tags: &[&str]) -> Node<'a> {
        tags.iter().fold(*self, |node, tag| node.first(tag))
    }
}
