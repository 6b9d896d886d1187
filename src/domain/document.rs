//! In-memory target document built during a publish cycle.
//!
//! The document is assembled off-surface and serialised once; the surface only
//! ever sees the finished HTML.

use std::fmt::Write as _;

use scraper::Html;
use serde::Serialize;

use super::value::{ContainerAttributes, ContentValue, Region};

/// Generated element, used for wrapped kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Element {
    pub tag: String,
    pub attributes: ContainerAttributes,
    pub text: String,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: ContainerAttributes::default(),
            text: String::new(),
        }
    }

    pub fn with_attributes(mut self, attributes: ContainerAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "node", rename_all = "snake_case")]
pub enum Node {
    Element(Element),
    /// Balanced markup, re-serialised from a fragment parse.
    Fragment(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreviewDocument {
    head: Vec<Node>,
    body: Vec<Node>,
}

impl PreviewDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, region: Region, node: Node) {
        self.nodes_mut(region).push(node);
    }

    /// Place a content value: wrapped kinds become a generated container
    /// element, raw kinds are parsed as a markup fragment and its nodes are
    /// appended.
    pub fn append_value(&mut self, value: &ContentValue) {
        let node = match value.tag() {
            Some(tag) => Node::Element(
                Element::new(tag.as_str())
                    .with_attributes(value.attributes().clone())
                    .with_text(value.content()),
            ),
            None => Node::Fragment(parse_fragment(value.content())),
        };
        self.append(value.region(), node);
    }

    pub fn nodes(&self, region: Region) -> &[Node] {
        match region {
            Region::Head => &self.head,
            Region::Body => &self.body,
        }
    }

    pub fn nodes_mut(&mut self, region: Region) -> &mut Vec<Node> {
        match region {
            Region::Head => &mut self.head,
            Region::Body => &mut self.body,
        }
    }

    pub fn head(&self) -> &[Node] {
        &self.head
    }

    pub fn body(&self) -> &[Node] {
        &self.body
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_empty() && self.body.is_empty()
    }

    pub fn to_html(&self) -> String {
        let mut out = String::from("<!DOCTYPE html>\n<html><head>");
        write_nodes(&mut out, &self.head);
        out.push_str("</head><body>");
        write_nodes(&mut out, &self.body);
        out.push_str("</body></html>");
        out
    }
}

/// Parse `markup` in body context and serialise the resulting nodes.
///
/// Unclosed elements are closed at the end of the fragment and stray end tags
/// are dropped, so a fragment never absorbs the nodes placed after it.
fn parse_fragment(markup: &str) -> String {
    Html::parse_fragment(markup).root_element().inner_html()
}

fn write_nodes(out: &mut String, nodes: &[Node]) {
    for node in nodes {
        match node {
            Node::Element(element) => write_element(out, element),
            Node::Fragment(markup) => out.push_str(markup),
        }
    }
}

fn write_element(out: &mut String, element: &Element) {
    let _ = write!(out, "<{}", element.tag);
    for (name, value) in element.attributes.iter() {
        if value.is_empty() {
            let _ = write!(out, " {name}");
        } else {
            let _ = write!(out, " {name}=\"{}\"", escape_attribute(value));
        }
    }
    out.push('>');
    // style and script are raw text elements; their content is not escaped
    out.push_str(&element.text);
    let _ = write!(out, "</{}>", element.tag);
}

fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            other => escaped.push(other),
        }
    }
    escaped
}
