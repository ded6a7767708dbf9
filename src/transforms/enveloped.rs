use std::borrow::Cow;

use crate::constants::{SIGNATURE_ELEMENT, XMLDSIG_NAMESPACE};
use crate::xml::{Element, ElementRef, NamespaceScope};

fn is_signature(node: &ElementRef<'_>) -> bool {
    node.is(XMLDSIG_NAMESPACE, SIGNATURE_ELEMENT)
}

/// Remove every descendant signature element.
///
/// A subtree without signatures is passed through unchanged; otherwise a
/// stripped copy is returned and the input is left as it was.
pub(super) fn strip_signatures<'a>(
    element: Cow<'a, Element>,
    scope: &NamespaceScope,
) -> Cow<'a, Element> {
    let has_signature = !ElementRef::new(&element, scope.clone())
        .find_descendants(is_signature)
        .is_empty();
    if !has_signature {
        return element;
    }
    Cow::Owned(element.without_descendants(scope, &is_signature))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::Document;

    #[test]
    fn test_removes_nested_signatures_only() {
        let doc = Document::parse(
            r#"<r xmlns:ds="http://www.w3.org/2000/09/xmldsig#">
<a><ds:Signature><ds:SignedInfo/></ds:Signature></a>
<Signature>not dsig</Signature>
<Signature xmlns="http://www.w3.org/2000/09/xmldsig#"/>
</r>"#,
        )
        .unwrap();

        let stripped = strip_signatures(Cow::Borrowed(&doc.root), &NamespaceScope::default());
        assert!(matches!(stripped, Cow::Owned(_)));

        let remaining: Vec<_> = stripped.child_elements().map(|e| e.qualified_name()).collect();
        assert_eq!(remaining, vec!["a", "Signature"]);
        assert_eq!(stripped.child_elements().next().unwrap().children.len(), 0);
        assert_eq!(stripped.child_elements().nth(1).unwrap().text(), "not dsig");

        // the source tree is untouched
        assert_eq!(doc.root.child_elements().count(), 3);
    }

    #[test]
    fn test_passes_through_without_signature() {
        let doc = Document::parse("<r><a/></r>").unwrap();
        let stripped = strip_signatures(Cow::Borrowed(&doc.root), &NamespaceScope::default());
        assert!(matches!(stripped, Cow::Borrowed(_)));
    }
}
