//! Owned, mutable XML tree.
//!
//! Responses are parsed into an [`Element`] tree that the pipeline edits in
//! place: encrypted assertions are swapped for their plaintext, and
//! unverified assertions for their validated copies. Names are kept exactly
//! as written (`prefix:local`); namespace resolution lives in
//! [`namespace`].

mod namespace;

pub use namespace::{detach, find_direct_children, ChildMatch, ElementRef, NsContext};

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{SamlError, SamlResult};

/// An attribute as written in the source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Qualified name (`prefix:local` or `local`).
    pub name: String,
    /// Unescaped value.
    pub value: String,
}

impl Attribute {
    /// Creates an attribute.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Returns the prefix declared by this attribute if it is a namespace
    /// declaration. The default namespace is reported as `""`.
    #[must_use]
    pub fn declared_prefix(&self) -> Option<&str> {
        if self.name == "xmlns" {
            Some("")
        } else {
            self.name.strip_prefix("xmlns:")
        }
    }
}

/// A child of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Nested element.
    Element(Element),
    /// Character data (unescaped).
    Text(String),
    /// CDATA section.
    CData(String),
    /// Comment.
    Comment(String),
}

/// An element with its attributes and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Qualified tag name (`prefix:local` or `local`).
    pub name: String,
    /// Attributes in document order, namespace declarations included.
    pub attributes: Vec<Attribute>,
    /// Child nodes in document order.
    pub children: Vec<Node>,
}

impl Element {
    /// Creates an empty element.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Adds an attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Appends a child element.
    #[must_use]
    pub fn with_child(mut self, child: Element) -> Self {
        self.add_child(child);
        self
    }

    /// Appends a text node.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// Returns the tag prefix, if any.
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    /// Returns the local part of the tag name.
    #[must_use]
    pub fn local_name(&self) -> &str {
        self.name
            .split_once(':')
            .map_or(self.name.as_str(), |(_, local)| local)
    }

    /// Looks up an attribute by its qualified name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    /// Sets an attribute, replacing any existing value.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|attr| attr.name == name) {
            Some(existing) => existing.value = value,
            None => self.attributes.push(Attribute { name, value }),
        }
    }

    /// Iterates over child elements, skipping text and comments.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            _ => None,
        })
    }

    /// Returns the concatenated text and CDATA content of direct children.
    #[must_use]
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(text) | Node::CData(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Appends `child` as the last child of this element.
    pub fn add_child(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    /// Removes and returns the child node at `index`.
    ///
    /// Returns `None` if there is no child at that position.
    pub fn remove_child_at(&mut self, index: usize) -> Option<Node> {
        (index < self.children.len()).then(|| self.children.remove(index))
    }

    /// Returns the child element at node position `index`.
    #[must_use]
    pub fn element_at(&self, index: usize) -> Option<&Element> {
        match self.children.get(index) {
            Some(Node::Element(el)) => Some(el),
            _ => None,
        }
    }

    /// Serializes this element and its subtree.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_to(&mut out);
        out
    }

    fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for attr in &self.attributes {
            out.push(' ');
            out.push_str(&attr.name);
            out.push_str("=\"");
            out.push_str(&escape(attr.value.as_str()));
            out.push('"');
        }

        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }

        out.push('>');
        for child in &self.children {
            match child {
                Node::Element(el) => el.write_to(out),
                Node::Text(text) => out.push_str(&escape(text.as_str())),
                Node::CData(data) => {
                    out.push_str("<![CDATA[");
                    out.push_str(data);
                    out.push_str("]]>");
                }
                Node::Comment(comment) => {
                    out.push_str("<!--");
                    out.push_str(comment);
                    out.push_str("-->");
                }
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

/// A parsed XML document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    /// The document element, if the input contained one.
    pub root: Option<Element>,
}

impl Document {
    /// Parses a UTF-8 document.
    ///
    /// Well-formed input without any element yields a document whose `root`
    /// is `None`. DTDs are refused.
    ///
    /// ## Errors
    ///
    /// Returns [`SamlError::XmlParse`] for malformed input: invalid UTF-8,
    /// mismatched or unclosed tags, duplicate attributes, unknown entities,
    /// content outside the document element, or a second document element.
    pub fn parse(bytes: &[u8]) -> SamlResult<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| SamlError::XmlParse(format!("document is not UTF-8: {e}")))?;
        Self::parse_str(text)
    }

    /// Parses a document from a string. See [`Document::parse`].
    ///
    /// ## Errors
    ///
    /// Returns [`SamlError::XmlParse`] for malformed input.
    pub fn parse_str(text: &str) -> SamlResult<Self> {
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(false);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    check_single_root(&root)?;
                    stack.push(element_from_start(&start)?);
                }
                Event::Empty(start) => {
                    check_single_root(&root)?;
                    let el = element_from_start(&start)?;
                    attach(&mut stack, &mut root, el);
                }
                Event::End(_) => {
                    // End names are checked against the open tag by the reader.
                    let el = stack.pop().ok_or_else(|| {
                        SamlError::XmlParse("unexpected closing tag".to_string())
                    })?;
                    attach(&mut stack, &mut root, el);
                }
                Event::Text(text) => {
                    let text = text.unescape()?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::Text(text.into_owned())),
                        None if text.trim().is_empty() => {}
                        None => {
                            return Err(SamlError::XmlParse(
                                "text outside the document element".to_string(),
                            ));
                        }
                    }
                }
                Event::CData(data) => {
                    let data = std::str::from_utf8(&data)
                        .map_err(|e| SamlError::XmlParse(e.to_string()))?
                        .to_string();
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::CData(data)),
                        None => {
                            return Err(SamlError::XmlParse(
                                "CDATA outside the document element".to_string(),
                            ));
                        }
                    }
                }
                Event::Comment(comment) => {
                    if let Some(parent) = stack.last_mut() {
                        let comment = std::str::from_utf8(&comment)
                            .map_err(|e| SamlError::XmlParse(e.to_string()))?;
                        parent.children.push(Node::Comment(comment.to_string()));
                    }
                }
                Event::DocType(_) => {
                    return Err(SamlError::XmlParse(
                        "DTDs are not allowed in SAML messages".to_string(),
                    ));
                }
                Event::Decl(_) | Event::PI(_) => {}
                Event::Eof => break,
            }
        }

        if let Some(open) = stack.last() {
            return Err(SamlError::XmlParse(format!("unclosed element: {}", open.name)));
        }

        Ok(Self { root })
    }
}

fn check_single_root(root: &Option<Element>) -> SamlResult<()> {
    match root {
        Some(existing) => Err(SamlError::XmlParse(format!(
            "content after the document element {}",
            existing.name
        ))),
        None => Ok(()),
    }
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, el: Element) {
    match stack.last_mut() {
        Some(parent) => parent.add_child(el),
        None => *root = Some(el),
    }
}

fn element_from_start(start: &BytesStart<'_>) -> SamlResult<Element> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| SamlError::XmlParse(e.to_string()))?
        .to_string();

    let mut el = Element::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| SamlError::XmlParse(format!("invalid attribute: {e}")))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| SamlError::XmlParse(e.to_string()))?
            .to_string();
        let value = attr.unescape_value()?.into_owned();
        el.attributes.push(Attribute { name: key, value });
    }
    Ok(el)
}
