//! Exclusive XML Canonicalization 1.0, without comments and with an empty
//! InclusiveNamespaces prefix list.
//!
//! A namespace declaration is output on an element only when the element
//! name or one of its attributes visibly uses the prefix, and the nearest
//! output ancestor has not already rendered the same binding.

use std::collections::{BTreeMap, BTreeSet};

use crate::constants::XML_NAMESPACE;
use crate::error::{Error, Result};
use crate::xml::{Element, NamespaceScope, Node};

use super::escape::{escape_attr, escape_text};

/// Prefix to URI bindings already written by output ancestors.
type Rendered = BTreeMap<String, String>;

pub(super) fn canonicalize(element: &Element, parent_scope: &NamespaceScope) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    write_element(element, parent_scope, &Rendered::new(), &mut output)?;
    Ok(output)
}

fn write_element(
    element: &Element,
    parent_scope: &NamespaceScope,
    rendered: &Rendered,
    output: &mut Vec<u8>,
) -> Result<()> {
    let scope = parent_scope.enter(element);
    let mut rendered_here = rendered.clone();

    let mut utilized = BTreeSet::new();
    utilized.insert(element.prefix.clone().unwrap_or_default());
    for attr in &element.attributes {
        if let Some(prefix) = &attr.prefix {
            utilized.insert(prefix.clone());
        }
    }

    let mut namespace_decls: Vec<(String, String)> = Vec::new();
    for prefix in utilized {
        if prefix == "xml" {
            continue;
        }
        match scope.resolve(&prefix) {
            Some(uri) => {
                if rendered.get(&prefix).map(String::as_str) != Some(uri) {
                    namespace_decls.push((prefix.clone(), uri.to_string()));
                    rendered_here.insert(prefix, uri.to_string());
                }
            }
            None if prefix.is_empty() => {
                if rendered.get("").is_some_and(|uri| !uri.is_empty()) {
                    namespace_decls.push((String::new(), String::new()));
                    rendered_here.insert(String::new(), String::new());
                }
            }
            None => {
                return Err(Error::Canonicalization(format!(
                    "inconsistent namespace context: prefix '{}' of <{}> is not bound",
                    prefix,
                    element.qualified_name()
                )));
            }
        }
    }

    let mut attributes = Vec::with_capacity(element.attributes.len());
    for attr in &element.attributes {
        let namespace = match attr.prefix.as_deref() {
            None => "",
            Some("xml") => XML_NAMESPACE,
            Some(prefix) => scope.resolve(prefix).ok_or_else(|| {
                Error::Canonicalization(format!(
                    "inconsistent namespace context: attribute prefix '{prefix}' is not bound"
                ))
            })?,
        };
        attributes.push((namespace, attr));
    }
    attributes.sort_by(|(ns_a, a), (ns_b, b)| (ns_a, &a.local_name).cmp(&(ns_b, &b.local_name)));

    let name = element.qualified_name();
    output.push(b'<');
    output.extend_from_slice(name.as_bytes());
    for (prefix, uri) in &namespace_decls {
        if prefix.is_empty() {
            output.extend_from_slice(b" xmlns=\"");
        } else {
            output.extend_from_slice(b" xmlns:");
            output.extend_from_slice(prefix.as_bytes());
            output.extend_from_slice(b"=\"");
        }
        output.extend_from_slice(escape_attr(uri).as_bytes());
        output.push(b'"');
    }
    for (_, attr) in &attributes {
        output.push(b' ');
        output.extend_from_slice(attr.qualified_name().as_bytes());
        output.extend_from_slice(b"=\"");
        output.extend_from_slice(escape_attr(&attr.value).as_bytes());
        output.push(b'"');
    }
    output.push(b'>');

    for child in &element.children {
        match child {
            Node::Element(child) => write_element(child, &scope, &rendered_here, output)?,
            Node::Text(text) => output.extend_from_slice(escape_text(text).as_bytes()),
            Node::Comment(_) => {}
            Node::ProcessingInstruction { target, .. } => {
                return Err(Error::Canonicalization(format!(
                    "unsupported node kind: processing instruction '{target}'"
                )));
            }
        }
    }

    output.extend_from_slice(b"</");
    output.extend_from_slice(name.as_bytes());
    output.push(b'>');
    Ok(())
}
