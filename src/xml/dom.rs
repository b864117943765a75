//! Owned XML element tree for Visio part payloads.
//!
//! Page, master, and document parts are parsed into this tree, transformed as
//! values, and serialized back; the container layer decides whether the ZIP
//! entry is rewritten. Unlike the streaming loops used for `.rels` and
//! content-type parts, this parser keeps *all* text nodes (shape text is
//! whitespace-sensitive) and preserves attribute order and qualified names, so
//! a parse/serialize round trip is structurally faithful.
use crate::error::{Error, Result};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::QName;
use std::io::Cursor;

/// The XML declaration of a part, kept for re-emission.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDecl {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<String>,
}

/// One node in the tree: a child element, a text run, or a comment.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    /// Raw comment content, passed through unmodified.
    Comment(String),
}

/// An element with ordered attributes and ordered children.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    /// Qualified name as written in the source (e.g. "Page", "Rel")
    name: String,

    /// Attributes in source order: qualified name, unescaped value
    attrs: Vec<(String, String)>,

    children: Vec<XmlNode>,
}

/// A parsed part: optional XML declaration plus the root element.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    decl: Option<XmlDecl>,
    root: XmlElement,
}

/// The local part of a qualified name ("r:id" -> "id").
fn local(name: &str) -> &str {
    match name.rfind(':') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

impl XmlElement {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn local_name(&self) -> &str {
        local(&self.name)
    }

    /// Look up an attribute value by local name.
    ///
    /// The Visio schema never carries two attributes whose names differ only
    /// by prefix, so local-name matching is unambiguous and lets callers
    /// write `attr("id")` for the `r:id` relationship reference.
    pub fn attr(&self, local_name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(name, _)| local(name) == local_name)
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute by local name, keeping the original qualified name
    /// and position if the attribute already exists.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(n, _)| local(n) == local(name)) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    /// Iterate child elements in order.
    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            _ => None,
        })
    }

    pub fn child_elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            _ => None,
        })
    }

    /// First child element with the given local name.
    pub fn first_child(&self, local_name: &str) -> Option<&XmlElement> {
        self.child_elements().find(|el| el.local_name() == local_name)
    }

    pub fn first_child_mut(&mut self, local_name: &str) -> Option<&mut XmlElement> {
        self.child_elements_mut()
            .find(|el| el.local_name() == local_name)
    }

    /// Visit every descendant element with the given local name, in document
    /// order, including matches nested inside other matches.
    pub fn try_for_each_descendant_mut<F>(&mut self, local_name: &str, f: &mut F) -> Result<()>
    where
        F: FnMut(&mut XmlElement) -> Result<()>,
    {
        for child in self.child_elements_mut() {
            if child.local_name() == local_name {
                f(child)?;
            }
            child.try_for_each_descendant_mut(local_name, f)?;
        }
        Ok(())
    }

    /// Collect descendant elements with the given local name, in document
    /// order.
    pub fn descendants<'a>(&'a self, local_name: &str) -> Vec<&'a XmlElement> {
        let mut out = Vec::new();
        self.collect_descendants(local_name, &mut out);
        out
    }

    fn collect_descendants<'a>(&'a self, local_name: &str, out: &mut Vec<&'a XmlElement>) {
        for child in self.child_elements() {
            if child.local_name() == local_name {
                out.push(child);
            }
            child.collect_descendants(local_name, out);
        }
    }

    /// Drop element children for which `keep` returns false; text and comment
    /// nodes are untouched.
    pub fn retain_child_elements(&mut self, mut keep: impl FnMut(&XmlElement) -> bool) {
        self.children.retain(|node| match node {
            XmlNode::Element(el) => keep(el),
            _ => true,
        });
    }

    /// Concatenated direct text children.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            if let XmlNode::Text(text) = node {
                out.push_str(text);
            }
        }
        out
    }

    /// Replace all children with a single text node (or nothing, for "").
    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.children.clear();
        if !text.is_empty() {
            self.children.push(XmlNode::Text(text));
        }
    }

    #[inline]
    pub fn nodes(&self) -> &[XmlNode] {
        &self.children
    }

    #[inline]
    pub fn nodes_mut(&mut self) -> &mut [XmlNode] {
        &mut self.children
    }

    pub fn clear_children(&mut self) {
        self.children.clear();
    }

    pub fn push_text(&mut self, text: impl Into<String>) {
        self.children.push(XmlNode::Text(text.into()));
    }

    pub fn push_element(&mut self, element: XmlElement) {
        self.children.push(XmlNode::Element(element));
    }

    fn write_to(&self, writer: &mut Writer<Cursor<Vec<u8>>>) -> Result<()> {
        let mut start = BytesStart::new(self.name.as_str());
        for (name, value) in &self.attrs {
            start.push_attribute(Attribute {
                key: QName(name.as_bytes()),
                value: escape_attr(value).into_bytes().into(),
            });
        }

        if self.children.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        for child in &self.children {
            match child {
                XmlNode::Element(el) => el.write_to(writer)?,
                XmlNode::Text(text) => {
                    writer.write_event(Event::Text(BytesText::new(text)))?;
                }
                XmlNode::Comment(text) => {
                    writer.write_event(Event::Comment(BytesText::from_escaped(text.as_str())))?;
                }
            }
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
        Ok(())
    }
}

impl XmlDocument {
    /// Parse a part's bytes into a tree.
    ///
    /// Text is *not* trimmed: indentation around elements and significant
    /// whitespace inside shape text both survive the round trip.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(bytes);
        let mut buf = Vec::new();

        let mut decl = None;
        let mut root: Option<XmlElement> = None;
        let mut stack: Vec<XmlElement> = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Decl(d)) => {
                    let version = String::from_utf8_lossy(d.version()?.as_ref()).into_owned();
                    let encoding = match d.encoding() {
                        Some(enc) => Some(String::from_utf8_lossy(enc?.as_ref()).into_owned()),
                        None => None,
                    };
                    let standalone = match d.standalone() {
                        Some(sa) => Some(String::from_utf8_lossy(sa?.as_ref()).into_owned()),
                        None => None,
                    };
                    decl = Some(XmlDecl {
                        version,
                        encoding,
                        standalone,
                    });
                }
                Ok(Event::Start(e)) => {
                    stack.push(Self::element_from(&e)?);
                }
                Ok(Event::Empty(e)) => {
                    let element = Self::element_from(&e)?;
                    Self::attach(XmlNode::Element(element), &mut stack, &mut root);
                }
                Ok(Event::End(_)) => {
                    let element = stack.pop().ok_or_else(|| {
                        Error::Xml("unbalanced closing tag".to_string())
                    })?;
                    Self::attach(XmlNode::Element(element), &mut stack, &mut root);
                }
                Ok(Event::Text(e)) => {
                    if let Some(parent) = stack.last_mut() {
                        parent.append_text(&e.decode().map_err(|err| Error::Xml(err.to_string()))?);
                    }
                }
                Ok(Event::GeneralRef(e)) => {
                    // Undeclared entity references reaching here are resolved
                    // like the predefined set; Visio emits nothing else.
                    if let Some(parent) = stack.last_mut() {
                        let name = std::str::from_utf8(e.as_ref())?;
                        parent.append_text(&resolve_entity(name)?);
                    }
                }
                Ok(Event::CData(e)) => {
                    if let Some(parent) = stack.last_mut() {
                        parent.append_text(std::str::from_utf8(e.as_ref())?);
                    }
                }
                Ok(Event::Comment(e)) => {
                    let text = std::str::from_utf8(e.as_ref())?.to_string();
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(XmlNode::Comment(text));
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(Error::Xml(e.to_string())),
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(Error::Xml("unclosed element at end of input".to_string()));
        }

        let root = root.ok_or_else(|| Error::Xml("document has no root element".to_string()))?;
        Ok(Self { decl, root })
    }

    fn element_from(e: &BytesStart<'_>) -> Result<XmlElement> {
        let mut element = XmlElement::new(std::str::from_utf8(e.name().as_ref())?.to_string());
        for attr in e.attributes() {
            let attr = attr.map_err(|err| Error::Xml(err.to_string()))?;
            element.attrs.push((
                std::str::from_utf8(attr.key.as_ref())?.to_string(),
                attr.unescape_value()?.into_owned(),
            ));
        }
        Ok(element)
    }

    fn attach(node: XmlNode, stack: &mut Vec<XmlElement>, root: &mut Option<XmlElement>) {
        if let Some(parent) = stack.last_mut() {
            parent.children.push(node);
        } else if let XmlNode::Element(element) = node {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }

    #[inline]
    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    #[inline]
    pub fn root_mut(&mut self) -> &mut XmlElement {
        &mut self.root
    }

    /// Serialize the tree back to part bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        if let Some(decl) = &self.decl {
            writer.write_event(Event::Decl(BytesDecl::new(
                &decl.version,
                decl.encoding.as_deref(),
                decl.standalone.as_deref(),
            )))?;
        }
        self.root.write_to(&mut writer)?;
        Ok(writer.into_inner().into_inner())
    }
}

impl XmlElement {
    /// Append text, merging with a trailing text node so runs split by the
    /// reader (e.g. around entity references) come back as one node.
    fn append_text(&mut self, text: &str) {
        if let Some(XmlNode::Text(last)) = self.children.last_mut() {
            last.push_str(text);
        } else {
            self.children.push(XmlNode::Text(text.to_string()));
        }
    }
}

/// Escape an attribute value for writing. Beyond the five XML specials,
/// whitespace control characters become numeric references; a literal newline
/// inside an attribute is normalized to a space by any conforming reader, and
/// multi-line cell values must survive the round trip.
fn escape_attr(value: &str) -> String {
    let escaped = quick_xml::escape::escape(value);
    if !escaped.contains(['\n', '\r', '\t']) {
        return escaped.into_owned();
    }
    escaped
        .replace('\r', "&#13;")
        .replace('\n', "&#10;")
        .replace('\t', "&#9;")
}

fn resolve_entity(name: &str) -> Result<String> {
    let resolved = match name {
        "amp" => "&".to_string(),
        "lt" => "<".to_string(),
        "gt" => ">".to_string(),
        "quot" => "\"".to_string(),
        "apos" => "'".to_string(),
        _ => {
            if let Some(code) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                let value = u32::from_str_radix(code, 16)
                    .map_err(|_| Error::Xml(format!("bad character reference '&{};'", name)))?;
                char::from_u32(value)
                    .map(|c| c.to_string())
                    .ok_or_else(|| Error::Xml(format!("bad character reference '&{};'", name)))?
            } else if let Some(code) = name.strip_prefix('#') {
                let value: u32 = code
                    .parse()
                    .map_err(|_| Error::Xml(format!("bad character reference '&{};'", name)))?;
                char::from_u32(value)
                    .map(|c| c.to_string())
                    .ok_or_else(|| Error::Xml(format!("bad character reference '&{};'", name)))?
            } else {
                return Err(Error::Xml(format!("unknown entity reference '&{};'", name)));
            }
        }
    };
    Ok(resolved)
}
