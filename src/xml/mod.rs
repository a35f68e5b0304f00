//! Owned XML tree used for template surgery.
//!
//! The reference package's parts are parsed into [`XmlElement`] trees, mutated
//! in place (derived character properties, numbering definitions, generated
//! body paragraphs), and serialized back out. Element names keep their
//! namespace prefix verbatim (`hh:charPr`, `hp:run`); HWPX parts declare all
//! prefixes on the root and never rebind them, so prefix-qualified name
//! comparison is sufficient.

use std::io::Cursor;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{Error, Result};

/// A child of an [`XmlElement`].
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// An XML element with ordered attributes and children.
///
/// Attribute and child order is preserved through parse/serialize round
/// trips, which keeps output byte-stable across conversions.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    /// Qualified tag name, prefix included.
    pub name: String,
    /// Attributes in document order.
    pub attributes: Vec<(String, String)>,
    /// Child nodes in document order.
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    /// Create an empty element.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Builder-style child appender.
    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    /// Builder-style text appender.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(XmlNode::Text(text.into()));
        self
    }

    /// Look up an attribute value.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, replacing an existing one in place so that
    /// attribute order stays stable.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Append a child element.
    pub fn add_child(&mut self, child: XmlElement) {
        self.children.push(XmlNode::Element(child));
    }

    /// Append a text node.
    pub fn add_text(&mut self, text: impl Into<String>) {
        self.children.push(XmlNode::Text(text.into()));
    }

    /// Insert a child element at `index` among all child nodes.
    pub fn insert_child(&mut self, index: usize, child: XmlElement) {
        self.children.insert(index, XmlNode::Element(child));
    }

    /// Iterate over child elements, skipping text nodes.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            XmlNode::Text(_) => None,
        })
    }

    /// Mutable variant of [`elements`](Self::elements).
    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            XmlNode::Text(_) => None,
        })
    }

    /// First child element with the given qualified name.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|el| el.name == name)
    }

    /// Mutable variant of [`child`](Self::child).
    pub fn child_mut(&mut self, name: &str) -> Option<&mut XmlElement> {
        self.elements_mut().find(|el| el.name == name)
    }

    /// All child elements with the given qualified name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.elements().filter(move |el| el.name == name)
    }

    /// Remove every child element with the given qualified name.
    pub fn remove_children(&mut self, name: &str) {
        self.children.retain(|node| match node {
            XmlNode::Element(el) => el.name != name,
            XmlNode::Text(_) => true,
        });
    }

    /// Depth-first search for the first descendant with the given qualified
    /// name. The element itself is not a candidate.
    pub fn descendant(&self, name: &str) -> Option<&XmlElement> {
        for el in self.elements() {
            if el.name == name {
                return Some(el);
            }
            if let Some(found) = el.descendant(name) {
                return Some(found);
            }
        }
        None
    }

    /// Mutable variant of [`descendant`](Self::descendant).
    pub fn descendant_mut(&mut self, name: &str) -> Option<&mut XmlElement> {
        for node in self.children.iter_mut() {
            if let XmlNode::Element(el) = node {
                if el.name == name {
                    return Some(el);
                }
                if let Some(found) = el.descendant_mut(name) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Concatenated text content of this element and its descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                XmlNode::Text(text) => out.push_str(text),
                XmlNode::Element(el) => el.collect_text(out),
            }
        }
    }

    /// Parse a document or fragment into its root element.
    ///
    /// The XML declaration, comments, and processing instructions are
    /// dropped; whitespace-only text nodes are kept so re-serialized parts
    /// stay close to the template's original formatting.
    pub fn parse(source: &str) -> Result<XmlElement> {
        let mut reader = Reader::from_str(source);
        reader.config_mut().trim_text_start = false;
        reader.config_mut().trim_text_end = false;

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    stack.push(element_from_start(&e)?);
                }
                Ok(Event::End(e)) => {
                    let element = match stack.pop() {
                        Some(el) => el,
                        None => {
                            return Err(Error::Template(format!(
                                "unexpected closing tag </{}>",
                                String::from_utf8_lossy(e.name().as_ref())
                            )));
                        }
                    };
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(XmlNode::Element(element)),
                        None => {
                            if root.is_some() {
                                return Err(Error::Template(
                                    "multiple root elements".to_string(),
                                ));
                            }
                            root = Some(element);
                        }
                    }
                }
                Ok(Event::Empty(e)) => {
                    let element = element_from_start(&e)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(XmlNode::Element(element)),
                        None => {
                            if root.is_some() {
                                return Err(Error::Template(
                                    "multiple root elements".to_string(),
                                ));
                            }
                            root = Some(element);
                        }
                    }
                }
                Ok(Event::Text(e)) => {
                    let text = e.unescape().map_err(|err| {
                        Error::Template(format!("invalid text content: {err}"))
                    })?;
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(XmlNode::Text(text.into_owned()));
                    }
                }
                Ok(Event::CData(e)) => {
                    let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(XmlNode::Text(text));
                    }
                }
                Ok(Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_)) => {}
                Ok(Event::Eof) => break,
                Err(e) => return Err(Error::Xml(e)),
            }
        }

        if let Some(open) = stack.last() {
            return Err(Error::Template(format!(
                "unclosed element <{}>",
                open.name
            )));
        }
        root.ok_or_else(|| Error::Template("XML document has no root element".to_string()))
    }

    /// Serialize as a fragment without an XML declaration.
    pub fn serialize(&self) -> Result<String> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        write_element(&mut writer, self)?;
        let bytes = writer.into_inner().into_inner();
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Serialize as a standalone document with an XML declaration.
    pub fn serialize_document(&self) -> Result<String> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        write_element(&mut writer, self)?;
        let bytes = writer.into_inner().into_inner();
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

fn element_from_start(e: &BytesStart<'_>) -> Result<XmlElement> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut element = XmlElement::new(name);
    for attr in e.attributes() {
        let attr =
            attr.map_err(|err| Error::Template(format!("invalid attribute: {err}")))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| Error::Template(format!("invalid attribute value: {err}")))?
            .into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn write_element<W: std::io::Write>(writer: &mut Writer<W>, element: &XmlElement) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }
    writer.write_event(Event::Start(start))?;
    for node in &element.children {
        match node {
            XmlNode::Element(el) => write_element(writer, el)?,
            XmlNode::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
        }
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested() {
        let root = XmlElement::parse(
            r#"<hp:p paraPrIDRef="3"><hp:run charPrIDRef="0"><hp:t>Hello</hp:t></hp:run></hp:p>"#,
        )
        .unwrap();
        assert_eq!(root.name, "hp:p");
        assert_eq!(root.attr("paraPrIDRef"), Some("3"));
        let run = root.child("hp:run").unwrap();
        assert_eq!(run.attr("charPrIDRef"), Some("0"));
        assert_eq!(run.child("hp:t").unwrap().text(), "Hello");
    }

    #[test]
    fn test_parse_self_closing() {
        let root = XmlElement::parse(r#"<hh:charPr id="1"><hh:bold/></hh:charPr>"#).unwrap();
        let bold = root.child("hh:bold").unwrap();
        assert!(bold.children.is_empty());
    }

    #[test]
    fn test_parse_skips_declaration() {
        let root = XmlElement::parse("<?xml version=\"1.0\"?><a><b/></a>").unwrap();
        assert_eq!(root.name, "a");
        assert!(root.child("b").is_some());
    }

    #[test]
    fn test_parse_keeps_whitespace_text() {
        let root = XmlElement::parse("<hp:t>  padded  </hp:t>").unwrap();
        assert_eq!(root.text(), "  padded  ");
    }

    #[test]
    fn test_parse_unescapes_entities() {
        let root = XmlElement::parse(r#"<hp:t attr="a&amp;b">1 &lt; 2</hp:t>"#).unwrap();
        assert_eq!(root.attr("attr"), Some("a&b"));
        assert_eq!(root.text(), "1 < 2");
    }

    #[test]
    fn test_parse_rejects_empty_and_unclosed() {
        assert!(XmlElement::parse("").is_err());
        assert!(XmlElement::parse("<a><b></a>").is_err());
    }

    #[test]
    fn test_serialize_round_trip() {
        let source = r#"<hp:run charPrIDRef="2"><hp:t>text</hp:t><hp:lineBreak/></hp:run>"#;
        let root = XmlElement::parse(source).unwrap();
        assert_eq!(root.serialize().unwrap(), source);
    }

    #[test]
    fn test_serialize_escapes_content() {
        let el = XmlElement::new("hp:t")
            .with_attr("title", "a<b")
            .with_text("x & y");
        let out = el.serialize().unwrap();
        assert!(out.contains("a&lt;b"));
        assert!(out.contains("x &amp; y"));
    }

    #[test]
    fn test_serialize_document_has_declaration() {
        let el = XmlElement::new("hh:head");
        let out = el.serialize_document().unwrap();
        assert!(out.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>"));
        assert!(out.ends_with("<hh:head/>"));
    }

    #[test]
    fn test_set_attr_replaces_in_place() {
        let mut el = XmlElement::new("hp:p")
            .with_attr("a", "1")
            .with_attr("b", "2");
        el.set_attr("a", "9");
        assert_eq!(el.attributes, vec![
            ("a".to_string(), "9".to_string()),
            ("b".to_string(), "2".to_string()),
        ]);
    }

    #[test]
    fn test_descendant_depth_first() {
        let root = XmlElement::parse(
            "<a><b><target id=\"1\"/></b><target id=\"2\"/></a>",
        )
        .unwrap();
        assert_eq!(root.descendant("target").unwrap().attr("id"), Some("1"));
    }

    #[test]
    fn test_descendant_mut_updates_tree() {
        let mut root = XmlElement::parse("<a><b><c/></b></a>").unwrap();
        root.descendant_mut("c").unwrap().set_attr("touched", "1");
        assert_eq!(root.descendant("c").unwrap().attr("touched"), Some("1"));
    }

    #[test]
    fn test_remove_children() {
        let mut root = XmlElement::parse("<a><b/><c/><b/></a>").unwrap();
        root.remove_children("b");
        assert_eq!(root.elements().count(), 1);
        assert!(root.child("c").is_some());
    }
}
