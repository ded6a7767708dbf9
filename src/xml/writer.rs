use std::io::Cursor;

use quick_xml::Writer;
use quick_xml::events::attributes::Attribute as XmlAttribute;
use quick_xml::events::{BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};

use crate::c14n::escape::{escape_attr, escape_text};

use super::node::{Document, Element, Node};
use super::Result;

impl Document {
    /// Serialize the document, declaration included.
    pub fn to_xml_string(&self) -> Result<String> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        if let Some(decl) = &self.declaration {
            writer.write_event(Event::Decl(BytesDecl::new(
                &decl.version,
                decl.encoding.as_deref(),
                decl.standalone.as_deref(),
            )))?;
            writer.write_event(Event::Text(BytesText::from_escaped("\n")))?;
        }
        write_element(&mut writer, &self.root)?;
        Ok(String::from_utf8(writer.into_inner().into_inner())?)
    }
}

impl Element {
    /// Serialize this subtree as written, without any canonicalization.
    pub fn to_xml_string(&self) -> Result<String> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        write_element(&mut writer, self)?;
        Ok(String::from_utf8(writer.into_inner().into_inner())?)
    }
}

fn write_element<W: std::io::Write>(writer: &mut Writer<W>, element: &Element) -> Result<()> {
    let name = element.qualified_name();
    let mut start = BytesStart::new(name.as_str());

    for (prefix, uri) in &element.namespaces {
        let key = if prefix.is_empty() {
            "xmlns".to_string()
        } else {
            format!("xmlns:{prefix}")
        };
        let value = escape_attr(uri);
        start.push_attribute(XmlAttribute::from((key.as_bytes(), value.as_bytes())));
    }
    for attr in &element.attributes {
        let key = attr.qualified_name();
        let value = escape_attr(&attr.value);
        start.push_attribute(XmlAttribute::from((key.as_bytes(), value.as_bytes())));
    }

    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for child in &element.children {
        match child {
            Node::Element(child) => write_element(writer, child)?,
            Node::Text(text) => {
                let escaped = escape_text(text);
                writer.write_event(Event::Text(BytesText::from_escaped(escaped.as_str())))?;
            }
            Node::Comment(text) => {
                writer.write_event(Event::Comment(BytesText::from_escaped(text.as_str())))?;
            }
            Node::ProcessingInstruction { target, data } => {
                let content = if data.is_empty() {
                    target.clone()
                } else {
                    format!("{target} {data}")
                };
                writer.write_event(Event::PI(BytesPI::new(content)))?;
            }
        }
    }
    writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
    Ok(())
}
