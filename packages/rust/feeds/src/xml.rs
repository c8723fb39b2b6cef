//! A small loosely-typed XML tree.
//!
//! Feeds in the wild disagree on almost everything, so parsing goes through
//! an untyped tree first and field extraction tries several keys in turn.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use briefwire_shared::{BriefwireError, Result};

/// One parsed XML value.
///
/// A leaf element without attributes collapses to `Text`. Repeated child
/// elements under the same name collapse into a `List`.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlValue {
    Text(String),
    Node(XmlNode),
    List(Vec<XmlValue>),
}

/// An element with attributes and/or child elements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlNode {
    pub attrs: Vec<(String, String)>,
    pub children: Vec<(String, XmlValue)>,
    /// Text directly inside this element (children's text excluded).
    pub text: String,
}

impl XmlNode {
    fn insert(&mut self, name: String, value: XmlValue) {
        match self.children.iter_mut().find(|(n, _)| *n == name) {
            Some((_, XmlValue::List(items))) => items.push(value),
            Some((_, existing)) => {
                let first = std::mem::replace(existing, XmlValue::List(Vec::new()));
                *existing = XmlValue::List(vec![first, value]);
            }
            None => self.children.push((name, value)),
        }
    }

    fn into_value(self) -> XmlValue {
        if self.attrs.is_empty() && self.children.is_empty() {
            XmlValue::Text(self.text)
        } else {
            XmlValue::Node(self)
        }
    }
}

impl XmlValue {
    /// Child value by element name. `a/b` walks nested elements.
    /// On a list, looks inside the first element that has the key.
    pub fn get(&self, path: &str) -> Option<&XmlValue> {
        let mut current = self;
        for key in path.split('/') {
            current = current.child(key)?;
        }
        Some(current)
    }

    fn child(&self, key: &str) -> Option<&XmlValue> {
        match self {
            Self::Node(node) => node
                .children
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, v)| v),
            Self::List(items) => items.iter().find_map(|item| item.child(key)),
            Self::Text(_) => None,
        }
    }

    /// Trimmed, non-empty text content of this value.
    pub fn text(&self) -> Option<&str> {
        let raw = match self {
            Self::Text(s) => s.as_str(),
            Self::Node(node) => node.text.as_str(),
            Self::List(items) => return items.iter().find_map(|item| item.text()),
        };
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    /// Text of the first key that yields a non-empty value.
    pub fn first_text(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .find_map(|key| self.get(key).and_then(XmlValue::text))
            .map(str::to_string)
    }

    /// All values under `key`, flattening a list.
    pub fn all(&self, key: &str) -> Vec<&XmlValue> {
        match self.get(key) {
            Some(Self::List(items)) => items.iter().collect(),
            Some(value) => vec![value],
            None => Vec::new(),
        }
    }

    /// Attribute value on a node.
    pub fn attr(&self, name: &str) -> Option<&str> {
        match self {
            Self::Node(node) => node
                .attrs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }
}

/// Parse a document into `(root element name, root value)`.
pub fn parse_document(body: &str) -> Result<(String, XmlValue)> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<(String, XmlNode)> = Vec::new();
    let mut root: Option<(String, XmlValue)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let (name, node) = open_element(&e);
                stack.push((name, node));
            }
            Ok(Event::Empty(e)) => {
                let (name, node) = open_element(&e);
                close_element(&mut stack, &mut root, name, node);
            }
            Ok(Event::End(_)) => {
                if let Some((name, node)) = stack.pop() {
                    close_element(&mut stack, &mut root, name, node);
                }
            }
            Ok(Event::Text(t)) => {
                if let Some((_, node)) = stack.last_mut() {
                    let raw = String::from_utf8_lossy(&t);
                    push_text(&mut node.text, &html_escape::decode_html_entities(&raw));
                }
            }
            Ok(Event::CData(c)) => {
                if let Some((_, node)) = stack.last_mut() {
                    push_text(&mut node.text, &String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(BriefwireError::parse(format!(
                    "malformed XML at byte {}: {e}",
                    reader.buffer_position()
                )));
            }
        }
        if root.is_some() {
            break;
        }
    }

    root.ok_or_else(|| BriefwireError::parse("document has no root element"))
}

fn open_element(e: &BytesStart<'_>) -> (String, XmlNode) {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let attrs = e
        .attributes()
        .flatten()
        .map(|a| {
            let key = String::from_utf8_lossy(a.key.as_ref()).into_owned();
            let value = a
                .unescape_value()
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| String::from_utf8_lossy(&a.value).into_owned());
            (key, value)
        })
        .collect();
    (
        name,
        XmlNode {
            attrs,
            ..Default::default()
        },
    )
}

fn close_element(
    stack: &mut [(String, XmlNode)],
    root: &mut Option<(String, XmlValue)>,
    name: String,
    node: XmlNode,
) {
    let value = node.into_value();
    match stack.last_mut() {
        Some((_, parent)) => parent.insert(name, value),
        None => *root = Some((name, value)),
    }
}

fn push_text(buf: &mut String, text: &str) {
    if !buf.is_empty() {
        buf.push(' ');
    }
    buf.push_str(text);
}
