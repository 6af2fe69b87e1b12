//! Read-only views over parsed feed trees.
//!
//! RSS/Atom XML, HTML index pages and embedded JSON are all inspected
//! through [`NodeView`], so the parser and the image resolver don't carry
//! per-format traversal code.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use scraper::{ElementRef, Selector};
use serde_json::Value;
use tracing::debug;

/// Deepest element nesting kept as a tree. Elements opened below this
/// level are attached flat to the deepest kept node, which bounds the
/// recursion of traversal and drop.
pub const MAX_DEPTH: usize = 256;

/// Minimal accessor over one node of a parsed tree.
pub trait NodeView: Sized {
    /// First descendant named `name`, in document order.
    fn find_child(&self, name: &str) -> Option<Self>;

    /// Every descendant named `name`, in document order.
    fn find_all(&self, name: &str) -> Vec<Self>;

    fn attribute(&self, name: &str) -> Option<String>;

    /// Trimmed text content; `None` when empty.
    fn text(&self) -> Option<String>;
}

/// Owned XML element.
///
/// Names are kept qualified (`media:content`, `image:url`) exactly as they
/// appear in the document, so undeclared namespace prefixes are harmless.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlNode {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    fn from_start(start: &BytesStart<'_>) -> Self {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let attributes = start
            .attributes()
            .with_checks(false)
            .filter_map(Result::ok)
            .map(|attr| {
                let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                let value = attr
                    .unescape_value()
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
                (key, value)
            })
            .collect();

        Self {
            name,
            attributes,
            ..Default::default()
        }
    }

    /// Parse `input` into a synthetic document node whose children are the
    /// top-level elements.
    ///
    /// Parsing is lenient: end tags don't have to match, and a syntax error
    /// stops the parse but keeps everything read so far. Nesting is capped
    /// at [`MAX_DEPTH`].
    pub fn parse_document(input: &str) -> XmlNode {
        let mut reader = Reader::from_str(input);
        reader.config_mut().check_end_names = false;

        let mut stack: Vec<XmlNode> = vec![XmlNode {
            name: "#document".to_string(),
            ..Default::default()
        }];
        // Open elements past MAX_DEPTH that were attached flat
        let mut flattened = 0usize;

        loop {
            match reader.read_event() {
                Ok(Event::Start(start)) => {
                    if stack.len() > MAX_DEPTH {
                        flattened += 1;
                        if let Some(parent) = stack.last_mut() {
                            parent.children.push(XmlNode::from_start(&start));
                        }
                    } else {
                        stack.push(XmlNode::from_start(&start));
                    }
                }
                Ok(Event::Empty(start)) => {
                    let node = XmlNode::from_start(&start);
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(node);
                    }
                }
                Ok(Event::End(_)) => {
                    if flattened > 0 {
                        flattened -= 1;
                    } else if stack.len() > 1
                        && let Some(node) = stack.pop()
                        && let Some(parent) = stack.last_mut()
                    {
                        parent.children.push(node);
                    }
                }
                Ok(Event::Text(text)) => {
                    let decoded = text
                        .unescape()
                        .map(|t| t.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&text).into_owned());
                    if let Some(node) = stack.last_mut() {
                        node.text.push_str(&decoded);
                    }
                }
                Ok(Event::CData(data)) => {
                    if let Some(node) = stack.last_mut() {
                        node.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!(
                        position = reader.buffer_position(),
                        error = %e,
                        "XML syntax error; keeping partial tree"
                    );
                    break;
                }
            }
        }

        // Close anything left open
        while stack.len() > 1 {
            if let Some(node) = stack.pop()
                && let Some(parent) = stack.last_mut()
            {
                parent.children.push(node);
            }
        }
        stack.pop().unwrap_or_default()
    }

    fn collect_named<'a>(&'a self, name: &str, out: &mut Vec<&'a XmlNode>) {
        for child in &self.children {
            if child.name == name {
                out.push(child);
            }
            child.collect_named(name, out);
        }
    }
}

impl<'a> NodeView for &'a XmlNode {
    fn find_child(&self, name: &str) -> Option<Self> {
        let node: &'a XmlNode = *self;
        for child in &node.children {
            if child.name == name {
                return Some(child);
            }
            if let Some(found) = child.find_child(name) {
                return Some(found);
            }
        }
        None
    }

    fn find_all(&self, name: &str) -> Vec<Self> {
        let node: &'a XmlNode = *self;
        let mut out = Vec::new();
        node.collect_named(name, &mut out);
        out
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    }

    fn text(&self) -> Option<String> {
        let trimmed = self.text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

impl<'a> NodeView for ElementRef<'a> {
    fn find_child(&self, name: &str) -> Option<Self> {
        let selector = Selector::parse(name).ok()?;
        self.select(&selector).next()
    }

    fn find_all(&self, name: &str) -> Vec<Self> {
        match Selector::parse(name) {
            Ok(selector) => self.select(&selector).collect(),
            Err(_) => Vec::new(),
        }
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.value().attr(name).map(str::to_string)
    }

    fn text(&self) -> Option<String> {
        let text = ElementRef::text(self).collect::<String>();
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

/// JSON objects expose their keys as children. `find_all` flattens an
/// array-valued key into its elements.
impl<'a> NodeView for &'a Value {
    fn find_child(&self, name: &str) -> Option<Self> {
        let value: &'a Value = *self;
        value.get(name)
    }

    fn find_all(&self, name: &str) -> Vec<Self> {
        let value: &'a Value = *self;
        match value.get(name) {
            Some(Value::Array(items)) => items.iter().collect(),
            Some(other) => vec![other],
            None => Vec::new(),
        }
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.get(name).and_then(|v| v.text())
    }

    fn text(&self) -> Option<String> {
        let raw = match self {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return None,
        };
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

/// Follow `path` through successive `find_child` calls.
pub fn find_path<N: NodeView + Clone>(root: &N, path: &[&str]) -> Option<N> {
    let mut current = root.clone();
    for segment in path {
        current = current.find_child(segment)?;
    }
    Some(current)
}
