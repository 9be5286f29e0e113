//! A small owned XML tree for in-place edits of decoded Android resources.
//!
//! `roxmltree` parses, the tree is rebuilt as owned [`Element`]s so it can be
//! mutated, and `quick_xml` writes it back. Namespace prefixes are kept as
//! written so `android:` attributes round-trip unchanged.

use crate::core::error::RepackError;
use anyhow::{Context, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use roxmltree::{Document, Node};
use std::fs;
use std::io::Write;
use std::path::Path;

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Namespace {
    pub prefix: Option<String>,
    pub uri: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Attribute {
    pub namespace: Option<String>,
    pub prefix: Option<String>,
    pub name: String,
    pub value: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum XmlNode {
    Element(Element),
    Text(String),
    Comment(String),
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Element {
    pub prefix: Option<String>,
    pub name: String,
    /// Namespace declarations made on this element, not inherited ones.
    pub namespaces: Vec<Namespace>,
    pub attributes: Vec<Attribute>,
    pub children: Vec<XmlNode>,
}

/// What [`Element::edit_children`] does with a visited child.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChildEdit {
    Keep,
    Remove,
}

fn qualified(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}:{}", prefix, name),
        None => name.to_string(),
    }
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn qualified_name(&self) -> String {
        qualified(self.prefix.as_deref(), &self.name)
    }

    /// Unprefixed attribute.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.namespace.is_none() && attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    pub fn attr_ns(&self, namespace: &str, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.namespace.as_deref() == Some(namespace) && attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .attributes
            .iter_mut()
            .find(|attr| attr.namespace.is_none() && attr.name == name)
        {
            Some(attr) => attr.value = value,
            None => self.attributes.push(Attribute {
                namespace: None,
                prefix: None,
                name: name.to_string(),
                value,
            }),
        }
    }

    /// Set a namespaced attribute. `prefix` is only used when the attribute is new.
    pub fn set_attr_ns(
        &mut self,
        namespace: &str,
        prefix: &str,
        name: &str,
        value: impl Into<String>,
    ) {
        let value = value.into();
        match self
            .attributes
            .iter_mut()
            .find(|attr| attr.namespace.as_deref() == Some(namespace) && attr.name == name)
        {
            Some(attr) => attr.value = value,
            None => self.attributes.push(Attribute {
                namespace: Some(namespace.to_string()),
                prefix: Some(prefix.to_string()),
                name: name.to_string(),
                value,
            }),
        }
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            XmlNode::Element(element) => Some(element),
            _ => None,
        })
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.elements().filter(move |element| element.name == name)
    }

    pub fn find_child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|element| element.name == name)
    }

    pub fn find_child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.find_child_where_mut(name, |_| true)
    }

    pub fn find_child_where_mut<P>(&mut self, name: &str, predicate: P) -> Option<&mut Element>
    where
        P: Fn(&Element) -> bool,
    {
        self.children.iter_mut().find_map(|child| match child {
            XmlNode::Element(element) if element.name == name && predicate(&*element) => {
                Some(element)
            }
            _ => None,
        })
    }

    /// Visit every child element named `name`; `edit` may rewrite it in place and
    /// decides whether it stays. Other children are left alone.
    pub fn edit_children<F>(&mut self, name: &str, mut edit: F) -> usize
    where
        F: FnMut(&mut Element) -> ChildEdit,
    {
        let before = self.children.len();
        self.children.retain_mut(|child| match child {
            XmlNode::Element(element) if element.name == name => edit(element) == ChildEdit::Keep,
            _ => true,
        });
        before - self.children.len()
    }

    pub fn append_child(&mut self, element: Element) {
        self.children.push(XmlNode::Element(element));
    }

    /// Concatenated direct text content.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|child| match child {
                XmlNode::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Replace all children with a single text node.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children = vec![XmlNode::Text(text.into())];
    }

    fn from_node(node: Node, inherited: &[Namespace]) -> Self {
        let prefix_of = |uri: &str| -> Option<String> {
            if uri == XML_NS {
                Some("xml".to_string())
            } else {
                node.lookup_prefix(uri).map(str::to_string)
            }
        };

        let in_scope: Vec<Namespace> = node
            .namespaces()
            .iter()
            .filter(|ns| ns.uri() != XML_NS)
            .map(|ns| Namespace {
                prefix: ns.name().map(str::to_string),
                uri: ns.uri().to_string(),
            })
            .collect();
        let namespaces = in_scope
            .iter()
            .filter(|ns| !inherited.contains(ns))
            .cloned()
            .collect();

        let attributes = node
            .attributes()
            .map(|attr| Attribute {
                namespace: attr.namespace().map(str::to_string),
                prefix: attr.namespace().and_then(prefix_of),
                name: attr.name().to_string(),
                value: attr.value().to_string(),
            })
            .collect();

        let mut children = vec![];
        for child in node.children() {
            if child.is_element() {
                children.push(XmlNode::Element(Self::from_node(child, &in_scope)));
            } else if child.is_text() {
                children.push(XmlNode::Text(child.text().unwrap_or_default().to_string()));
            } else if child.is_comment() {
                children.push(XmlNode::Comment(child.text().unwrap_or_default().to_string()));
            }
        }

        Self {
            prefix: node.tag_name().namespace().and_then(prefix_of),
            name: node.tag_name().name().to_string(),
            namespaces,
            attributes,
            children,
        }
    }

    fn write_to<W: Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let name = self.qualified_name();
        let mut start = BytesStart::new(name.as_str());
        for ns in &self.namespaces {
            let key = match &ns.prefix {
                Some(prefix) => format!("xmlns:{}", prefix),
                None => "xmlns".to_string(),
            };
            start.push_attribute((key.as_str(), ns.uri.as_str()));
        }
        for attr in &self.attributes {
            let key = qualified(attr.prefix.as_deref(), &attr.name);
            start.push_attribute((key.as_str(), attr.value.as_str()));
        }

        if self.children.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        for child in &self.children {
            match child {
                XmlNode::Element(element) => element.write_to(writer)?,
                XmlNode::Text(text) => writer.write_event(Event::Text(BytesText::from_escaped(
                    quick_xml::escape::partial_escape(text),
                )))?,
                XmlNode::Comment(text) => writer
                    .write_event(Event::Comment(BytesText::from_escaped(text.as_str())))?,
            }
        }
        writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
        Ok(())
    }
}

/// A parsed XML file with an owned, editable root.
#[derive(Clone, Debug)]
pub struct XmlDocument {
    pub root: Element,
}

impl XmlDocument {
    pub fn parse(text: &str) -> Result<Self> {
        let doc = Document::parse(text)?;
        Ok(Self {
            root: Element::from_node(doc.root_element(), &[]),
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| RepackError::io(path, e))?;
        Self::parse(&text).with_context(|| format!("Parsing `{}`", path.display()))
    }

    /// Prefix bound to `uri` on the root, declaring it as `preferred` if absent.
    pub fn prefix_for(&mut self, uri: &str, preferred: &str) -> String {
        if let Some(prefix) = self
            .root
            .namespaces
            .iter()
            .find(|ns| ns.uri == uri)
            .and_then(|ns| ns.prefix.clone())
        {
            return prefix;
        }
        self.root.namespaces.push(Namespace {
            prefix: Some(preferred.to_string()),
            uri: uri.to_string(),
        });
        preferred.to_string()
    }

    /// Serialize as UTF-8 with an XML declaration.
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        writer.inner().write_all(b"\n")?;
        self.root.write_to(&mut writer)?;
        writer.inner().write_all(b"\n")?;
        Ok(String::from_utf8(writer.into_inner())?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let xml = self.to_xml()?;
        fs::write(path, xml).map_err(|e| RepackError::io(path, e))?;
        Ok(())
    }
}
