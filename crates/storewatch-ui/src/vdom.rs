//! Minimal UI tree rendered to HTML on the server.
//!
//! # Design
//! - Views build a [`Node`] tree instead of concatenating strings, so escaping
//!   happens in exactly one place.
//! - Trusted markup is reserved for fixed entity strings such as `&bull;`.
//! - The query helpers exist for tests and for the host; nothing re-parses HTML.

use std::fmt::Write as _;

/// Elements that never carry children or a closing tag.
const VOID_TAGS: &[&str] = &["br", "hr", "img", "input", "link", "meta"];

/// A node in the rendered tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Element with attributes and children.
    Element(Element),
    /// Plain text, escaped on render.
    Text(String),
    /// Markup emitted verbatim.
    Trusted(String),
    /// Sibling nodes without a wrapping element.
    Fragment(Vec<Node>),
}

/// An element node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    tag: String,
    attrs: Vec<(String, String)>,
    key: Option<String>,
    children: Vec<Node>,
}

/// Plain text node.
#[must_use]
pub fn text(value: impl Into<String>) -> Node {
    Node::Text(value.into())
}

/// Trusted markup node; never pass user-controlled data here.
#[must_use]
pub fn trust(markup: impl Into<String>) -> Node {
    Node::Trusted(markup.into())
}

impl Element {
    /// Empty element named `tag`.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            key: None,
            children: Vec::new(),
        }
    }

    /// Set attribute `name`, replacing any earlier value.
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.attrs.iter_mut().find(|(existing, _)| *existing == name) {
            slot.1 = value;
        } else {
            self.attrs.push((name, value));
        }
        self
    }

    /// Shorthand for the `class` attribute.
    #[must_use]
    pub fn class(self, value: impl Into<String>) -> Self {
        self.attr("class", value)
    }

    /// Shorthand for the `style` attribute.
    #[must_use]
    pub fn style(self, value: impl Into<String>) -> Self {
        self.attr("style", value)
    }

    /// Identity of this element among its siblings; rendered as `data-key`.
    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Append one child.
    #[must_use]
    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node.into());
        self
    }

    /// Append every child in order.
    #[must_use]
    pub fn children<I, N>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        self.children.extend(nodes.into_iter().map(Into::into));
        self
    }

    /// Tag name.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Value of attribute `name`.
    #[must_use]
    pub fn attr_value(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_str())
    }

    /// True when the whitespace-separated `class` attribute contains `name`.
    #[must_use]
    pub fn has_class(&self, name: &str) -> bool {
        self.attr_value("class")
            .is_some_and(|classes| classes.split_whitespace().any(|class| class == name))
    }

    /// Sibling identity, when set.
    #[must_use]
    pub fn key_value(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Direct children.
    #[must_use]
    pub fn child_nodes(&self) -> &[Node] {
        &self.children
    }

    /// Concatenated text of every descendant.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.collect_text(&mut out);
        }
        out
    }

    fn write_html(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        if let Some(key) = &self.key {
            let _ = write!(out, " data-key=\"{}\"", escape_attr(key));
        }
        for (name, value) in &self.attrs {
            let _ = write!(out, " {name}=\"{}\"", escape_attr(value));
        }
        out.push('>');
        if VOID_TAGS.contains(&self.tag.as_str()) {
            return;
        }
        for child in &self.children {
            child.write_html(out);
        }
        let _ = write!(out, "</{}>", self.tag);
    }
}

impl Node {
    /// Serialise the tree to HTML.
    #[must_use]
    pub fn render_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    /// Element payload, if this node is one.
    #[must_use]
    pub const fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Every element named `tag` in document order, including this node.
    #[must_use]
    pub fn find_all(&self, tag: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        self.visit(&mut |element| {
            if element.tag == tag {
                found.push(element);
            }
        });
        found
    }

    /// Every element carrying class `name` in document order.
    #[must_use]
    pub fn find_by_class(&self, name: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        self.visit(&mut |element| {
            if element.has_class(name) {
                found.push(element);
            }
        });
        found
    }

    /// Concatenated text of this node and its descendants. Trusted markup
    /// contributes its raw source.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn visit<'a>(&'a self, f: &mut impl FnMut(&'a Element)) {
        match self {
            Self::Element(element) => {
                f(element);
                for child in &element.children {
                    child.visit(f);
                }
            }
            Self::Fragment(nodes) => {
                for node in nodes {
                    node.visit(f);
                }
            }
            Self::Text(_) | Self::Trusted(_) => {}
        }
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Self::Element(element) => {
                for child in &element.children {
                    child.collect_text(out);
                }
            }
            Self::Text(value) | Self::Trusted(value) => out.push_str(value),
            Self::Fragment(nodes) => {
                for node in nodes {
                    node.collect_text(out);
                }
            }
        }
    }

    fn write_html(&self, out: &mut String) {
        match self {
            Self::Element(element) => element.write_html(out),
            Self::Text(value) => out.push_str(&escape_text(value)),
            Self::Trusted(markup) => out.push_str(markup),
            Self::Fragment(nodes) => {
                for node in nodes {
                    node.write_html(out);
                }
            }
        }
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<Self>> for Node {
    fn from(nodes: Vec<Self>) -> Self {
        Self::Fragment(nodes)
    }
}

fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
    out
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
