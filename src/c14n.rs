//! XML canonicalization.
//!
//! Canonical output is a pure function of the subtree, the namespace scope
//! it sits in and the algorithm, so the same input yields the same bytes on
//! every call and every thread.

pub mod escape;
mod exclusive;

use tracing::debug;

use crate::constants::EXCLUSIVE_C14N_ALGORITHM;
use crate::error::Result;
use crate::xml::{Document, Element, ElementRef, NamespaceScope};

/// Supported canonicalization algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum C14nAlgorithm {
    /// Exclusive XML Canonicalization 1.0 (omits comments).
    Exclusive,
}

impl C14nAlgorithm {
    pub fn uri(&self) -> &'static str {
        match self {
            Self::Exclusive => EXCLUSIVE_C14N_ALGORITHM,
        }
    }

    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            EXCLUSIVE_C14N_ALGORITHM => Some(Self::Exclusive),
            _ => None,
        }
    }
}

/// Canonicalize `element`, which appears inside `parent_scope`.
pub fn canonicalize(
    element: &Element,
    parent_scope: &NamespaceScope,
    algorithm: C14nAlgorithm,
) -> Result<Vec<u8>> {
    let output = match algorithm {
        C14nAlgorithm::Exclusive => exclusive::canonicalize(element, parent_scope)?,
    };
    debug!(
        element = %element.qualified_name(),
        algorithm = algorithm.uri(),
        len = output.len(),
        "Canonicalized subtree"
    );
    Ok(output)
}

/// Canonicalize an element reference in its own namespace context.
pub fn canonicalize_ref(node: &ElementRef<'_>, algorithm: C14nAlgorithm) -> Result<Vec<u8>> {
    canonicalize(node.element(), node.parent_scope(), algorithm)
}

/// Parse `xml` and canonicalize its root element.
pub fn canonicalize_str(xml: &str, algorithm: C14nAlgorithm) -> Result<Vec<u8>> {
    let document = Document::parse(xml)?;
    canonicalize(&document.root, &NamespaceScope::default(), algorithm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn exc(xml: &str) -> String {
        String::from_utf8(canonicalize_str(xml, C14nAlgorithm::Exclusive).unwrap()).unwrap()
    }

    #[test]
    fn test_algorithm_uri() {
        assert_eq!(
            C14nAlgorithm::from_uri("http://www.w3.org/2001/10/xml-exc-c14n#"),
            Some(C14nAlgorithm::Exclusive)
        );
        assert_eq!(
            C14nAlgorithm::from_uri("http://www.w3.org/TR/2001/REC-xml-c14n-20010315"),
            None
        );
        assert_eq!(C14nAlgorithm::Exclusive.uri(), EXCLUSIVE_C14N_ALGORITHM);
    }

    #[test]
    fn test_empty_elements_and_declaration() {
        assert_eq!(
            exc("<?xml version=\"1.0\"?>\n<request><content>x</content><empty/></request>"),
            "<request><content>x</content><empty></empty></request>"
        );
    }

    #[test]
    fn test_subtree_keeps_only_visibly_used_namespaces() {
        let doc = Document::parse(
            r#"<n0:local xmlns:n0="foo:bar" xmlns:n3="ftp://example.org">
  <n1:elem2 xmlns:n1="http://example.net" xml:lang="en">
    <n3:stuff xmlns:n3="ftp://example.org"/>
  </n1:elem2>
</n0:local>"#,
        )
        .unwrap();
        let root = doc.root_ref();
        let (_, elem2) = root
            .find_descendants(|node| node.is("http://example.net", "elem2"))
            .into_iter()
            .next()
            .unwrap();

        let output = canonicalize_ref(&elem2, C14nAlgorithm::Exclusive).unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "<n1:elem2 xmlns:n1=\"http://example.net\" xml:lang=\"en\">\n    \
             <n3:stuff xmlns:n3=\"ftp://example.org\"></n3:stuff>\n  </n1:elem2>"
        );
    }

    #[test]
    fn test_redundant_declarations_omitted() {
        assert_eq!(
            exc(r#"<root xmlns:u="urn:u"><child xmlns:u="urn:u">text</child></root>"#),
            "<root><child>text</child></root>"
        );
        assert_eq!(
            exc(r#"<x:a xmlns:x="urn:x"><x:b xmlns:x="urn:x"/></x:a>"#),
            r#"<x:a xmlns:x="urn:x"><x:b></x:b></x:a>"#
        );
    }

    #[test]
    fn test_default_namespace_undeclared_once() {
        assert_eq!(
            exc(r#"<a xmlns="urn:a"><b xmlns=""><c/></b></a>"#),
            r#"<a xmlns="urn:a"><b xmlns=""><c></c></b></a>"#
        );
        assert_eq!(exc(r#"<b xmlns=""><c/></b>"#), "<b><c></c></b>");
    }

    #[test]
    fn test_attribute_ordering() {
        assert_eq!(
            exc(r#"<e z="3" xmlns:b="urn:b" b:attr="1" xmlns="urn:d" a:attr="2" xmlns:a="urn:z" b="4"/>"#),
            r#"<e xmlns="urn:d" xmlns:a="urn:z" xmlns:b="urn:b" b="4" z="3" b:attr="1" a:attr="2"></e>"#
        );
    }

    #[test]
    fn test_escaping_and_comments() {
        assert_eq!(
            exc("<r a=\"&lt;&quot;&#x9;&#xA;\">&amp;&gt;&#xD;<!-- dropped --></r>"),
            "<r a=\"&lt;&quot;&#x9;&#xA;\">&amp;&gt;&#xD;</r>"
        );
    }

    #[test]
    fn test_canonical_output_is_idempotent() {
        let first = exc(
            "<p:doc xmlns:p=\"urn:p\" xmlns:q=\"urn:q\" q:k=\"v\">\r\n <p:x y=\"1\"/>&#x20;</p:doc>",
        );
        assert_eq!(exc(&first), first);
        assert_eq!(exc(&first), exc(&first));
    }

    #[test]
    fn test_processing_instruction_rejected() {
        let result = canonicalize_str("<r><?pi data?></r>", C14nAlgorithm::Exclusive);
        assert!(matches!(result, Err(Error::Canonicalization(_))));
    }

    #[test]
    fn test_unbound_prefix_rejected() {
        let result = canonicalize_str("<p:r/>", C14nAlgorithm::Exclusive);
        assert!(matches!(result, Err(Error::Canonicalization(msg)) if msg.contains("inconsistent")));

        let result = canonicalize_str("<r q:a=\"1\"/>", C14nAlgorithm::Exclusive);
        assert!(matches!(result, Err(Error::Canonicalization(_))));
    }
}
