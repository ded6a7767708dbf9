use std::borrow::Cow;
use std::collections::BTreeMap;
use std::str;

use quick_xml::Reader;
use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesDecl, BytesStart, Event};

use super::node::{Attribute, Document, Element, Node, XmlDeclaration, split_qualified_name};
use super::{Error, Result};

/// Deepest element nesting accepted from input.
///
/// Canonicalization and signature lookup walk the tree recursively, so the
/// limit also bounds their stack use.
pub const MAX_DEPTH: usize = 256;

impl Document {
    /// Parse a complete document with exactly one root element.
    ///
    /// Entity and character references are resolved, line endings are
    /// normalized to LF and attribute values are whitespace-normalized, so
    /// the resulting tree holds the values an XML processor would report.
    pub fn parse(xml: &str) -> Result<Document> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);
        reader.config_mut().expand_empty_elements = true;

        let mut buf = Vec::new();
        let mut declaration = None;
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;
        let mut pending_text = String::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    flush_text(&mut stack, &mut pending_text)?;
                    if stack.is_empty() && root.is_some() {
                        return Err(Error::Structure(
                            "document has more than one root element".to_string(),
                        ));
                    }
                    if stack.len() >= MAX_DEPTH {
                        return Err(Error::Structure(format!(
                            "element nesting deeper than {MAX_DEPTH} levels"
                        )));
                    }
                    stack.push(parse_start(&e)?);
                }
                Event::End(_) => {
                    flush_text(&mut stack, &mut pending_text)?;
                    let element = stack
                        .pop()
                        .ok_or_else(|| Error::Structure("unexpected end tag".to_string()))?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::Element(element)),
                        None => root = Some(element),
                    }
                }
                Event::Text(e) => {
                    let raw = str::from_utf8(&e)?;
                    pending_text.push_str(&normalize_line_endings(raw));
                }
                Event::CData(e) => {
                    let raw = e.into_inner();
                    pending_text.push_str(&normalize_line_endings(str::from_utf8(&raw)?));
                }
                Event::GeneralRef(e) => {
                    let name = str::from_utf8(&e)?;
                    pending_text.push_str(&resolve_reference(name)?);
                }
                Event::Comment(e) => {
                    flush_text(&mut stack, &mut pending_text)?;
                    if let Some(parent) = stack.last_mut() {
                        let text = normalize_line_endings(str::from_utf8(&e)?).into_owned();
                        parent.children.push(Node::Comment(text));
                    }
                }
                Event::PI(e) => {
                    flush_text(&mut stack, &mut pending_text)?;
                    let target = str::from_utf8(e.target())?.to_string();
                    let parent = stack.last_mut().ok_or_else(|| {
                        Error::Structure(format!(
                            "processing instruction '{target}' outside the root element"
                        ))
                    })?;
                    let data = str::from_utf8(e.content())?.trim_start().to_string();
                    parent
                        .children
                        .push(Node::ProcessingInstruction { target, data });
                }
                Event::Decl(e) => {
                    declaration = Some(parse_declaration(&e)?);
                }
                Event::DocType(_) => {
                    return Err(Error::Structure(
                        "document type declarations are not accepted".to_string(),
                    ));
                }
                Event::Eof => {
                    flush_text(&mut stack, &mut pending_text)?;
                    break;
                }
                // Empty is never produced while empty elements are expanded
                _ => {}
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(Error::Structure("unclosed element at end of input".to_string()));
        }
        let root = root.ok_or_else(|| Error::Structure("document has no root element".to_string()))?;

        Ok(Document { declaration, root })
    }
}

/// Attach accumulated character data to the open element.
///
/// Outside the root only whitespace is permitted, and it is dropped.
fn flush_text(stack: &mut [Element], pending: &mut String) -> Result<()> {
    if pending.is_empty() {
        return Ok(());
    }
    let text = std::mem::take(pending);
    match stack.last_mut() {
        Some(parent) => {
            if let Some(Node::Text(previous)) = parent.children.last_mut() {
                previous.push_str(&text);
            } else {
                parent.children.push(Node::Text(text));
            }
            Ok(())
        }
        None if text.chars().all(char::is_whitespace) => Ok(()),
        None => Err(Error::Structure(
            "character data outside the root element".to_string(),
        )),
    }
}

fn parse_start(e: &BytesStart<'_>) -> Result<Element> {
    let name = str::from_utf8(e.name().as_ref())?.to_string();
    let (prefix, local_name) = split_qualified_name(&name);

    let mut namespaces = BTreeMap::new();
    let mut attributes = Vec::new();

    for attr in e.attributes() {
        let attr = attr?;
        let key = str::from_utf8(attr.key.as_ref())?;
        let value = normalize_attribute_value(str::from_utf8(&attr.value)?)?;

        if key == "xmlns" {
            namespaces.insert(String::new(), value);
        } else if let Some(ns_prefix) = key.strip_prefix("xmlns:") {
            namespaces.insert(ns_prefix.to_string(), value);
        } else {
            attributes.push(Attribute::new(key, value));
        }
    }

    Ok(Element {
        prefix,
        local_name,
        namespaces,
        attributes,
        children: Vec::new(),
    })
}

fn parse_declaration(e: &BytesDecl<'_>) -> Result<XmlDeclaration> {
    let version = str::from_utf8(&e.version()?)?.to_string();
    let encoding = match e.encoding() {
        Some(encoding) => Some(str::from_utf8(&encoding?)?.to_string()),
        None => None,
    };
    let standalone = match e.standalone() {
        Some(standalone) => Some(str::from_utf8(&standalone?)?.to_string()),
        None => None,
    };
    Ok(XmlDeclaration {
        version,
        encoding,
        standalone,
    })
}

/// Attribute-value normalization: literal whitespace characters become
/// spaces before references are expanded, so `&#xA;` survives as a newline.
fn normalize_attribute_value(raw: &str) -> Result<String> {
    let normalized: String = normalize_line_endings(raw)
        .chars()
        .map(|c| match c {
            '\t' | '\n' | '\r' => ' ',
            other => other,
        })
        .collect();
    Ok(unescape(&normalized)?.into_owned())
}

fn resolve_reference(name: &str) -> Result<String> {
    if let Some(number) = name.strip_prefix('#') {
        let code = match number.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => number.parse::<u32>(),
        }
        .map_err(|_| Error::Xml(format!("invalid character reference &{name};")))?;
        let ch = char::from_u32(code)
            .ok_or_else(|| Error::Xml(format!("invalid character reference &{name};")))?;
        return Ok(ch.to_string());
    }

    resolve_predefined_entity(name)
        .map(str::to_string)
        .ok_or_else(|| Error::Xml(format!("undefined entity &{name};")))
}

/// CRLF and lone CR become LF.
fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    if !text.contains('\r') {
        return Cow::Borrowed(text);
    }
    Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
}
