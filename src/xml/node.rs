//! Owned XML tree used by the canonicalizer and the signature layer.
//!
//! Trees are plain values: cloning duplicates a subtree and every removal
//! produces a new tree, so a document shared between threads is never
//! observed half-modified.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::constants::XML_NAMESPACE;

use super::Error;

/// A node in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
    ProcessingInstruction { target: String, data: String },
}

/// An attribute with its value already unescaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub prefix: Option<String>,
    pub local_name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(qualified_name: &str, value: impl Into<String>) -> Self {
        let (prefix, local_name) = split_qualified_name(qualified_name);
        Self {
            prefix,
            local_name,
            value: value.into(),
        }
    }

    pub fn qualified_name(&self) -> String {
        join_qualified_name(self.prefix.as_deref(), &self.local_name)
    }
}

/// An element together with the namespace declarations made on it.
///
/// `namespaces` maps a prefix (`""` for the default namespace) to its URI.
/// An empty URI on the default prefix is an undeclaration (`xmlns=""`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub prefix: Option<String>,
    pub local_name: String,
    pub namespaces: BTreeMap<String, String>,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(qualified_name: &str) -> Self {
        let (prefix, local_name) = split_qualified_name(qualified_name);
        Self {
            prefix,
            local_name,
            namespaces: BTreeMap::new(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Create an element sharing the given prefix.
    pub fn with_prefix(prefix: Option<&str>, local_name: &str) -> Self {
        Self::new(&join_qualified_name(prefix, local_name))
    }

    pub fn with_namespace(mut self, prefix: &str, uri: impl Into<String>) -> Self {
        self.namespaces.insert(prefix.to_string(), uri.into());
        self
    }

    pub fn with_attribute(mut self, qualified_name: &str, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute::new(qualified_name, value));
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn qualified_name(&self) -> String {
        join_qualified_name(self.prefix.as_deref(), &self.local_name)
    }

    /// Value of an attribute looked up by its qualified name.
    pub fn attribute(&self, qualified_name: &str) -> Option<&str> {
        let (prefix, local_name) = split_qualified_name(qualified_name);
        self.attributes
            .iter()
            .find(|a| a.prefix == prefix && a.local_name == local_name)
            .map(|a| a.value.as_str())
    }

    /// Concatenated text of the direct text children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|child| match child {
                Node::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Replace every child by a single text node.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children = vec![Node::Text(text.into())];
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    /// True when the element has no element children and only whitespace text.
    pub fn is_empty_placeholder(&self) -> bool {
        self.children.iter().all(|child| match child {
            Node::Text(text) => text.chars().all(char::is_whitespace),
            Node::Comment(_) => true,
            _ => false,
        })
    }

    pub fn at_path(&self, path: &ElementPath) -> Option<&Element> {
        let mut current = self;
        for &index in path.indices() {
            current = match current.children.get(index)? {
                Node::Element(element) => element,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn at_path_mut(&mut self, path: &ElementPath) -> Option<&mut Element> {
        let mut current = self;
        for &index in path.indices() {
            current = match current.children.get_mut(index)? {
                Node::Element(element) => element,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Copy of this subtree without the descendant elements matching `predicate`.
    ///
    /// The element itself is never removed. `parent_scope` is the scope in
    /// which this element appears.
    pub fn without_descendants<F>(&self, parent_scope: &NamespaceScope, predicate: &F) -> Element
    where
        F: Fn(&ElementRef<'_>) -> bool,
    {
        let scope = parent_scope.enter(self);
        let children = self
            .children
            .iter()
            .filter_map(|child| match child {
                Node::Element(element) => {
                    let node = ElementRef::new(element, scope.clone());
                    if predicate(&node) {
                        None
                    } else {
                        Some(Node::Element(element.without_descendants(&scope, predicate)))
                    }
                }
                other => Some(other.clone()),
            })
            .collect();

        Element {
            prefix: self.prefix.clone(),
            local_name: self.local_name.clone(),
            namespaces: self.namespaces.clone(),
            attributes: self.attributes.clone(),
            children,
        }
    }
}

/// Child indices leading from an element to one of its descendants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ElementPath(Vec<usize>);

impl ElementPath {
    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }
}

/// In-scope namespace bindings at a point of the tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceScope {
    bindings: BTreeMap<String, String>,
}

impl NamespaceScope {
    /// Scope seen by the children of `element`.
    pub fn enter(&self, element: &Element) -> NamespaceScope {
        if element.namespaces.is_empty() {
            return self.clone();
        }
        let mut bindings = self.bindings.clone();
        for (prefix, uri) in &element.namespaces {
            if uri.is_empty() {
                bindings.remove(prefix);
            } else {
                bindings.insert(prefix.clone(), uri.clone());
            }
        }
        NamespaceScope { bindings }
    }

    /// Resolve a prefix (`""` for the default namespace).
    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NAMESPACE);
        }
        self.bindings.get(prefix).map(String::as_str)
    }

    pub fn bindings(&self) -> &BTreeMap<String, String> {
        &self.bindings
    }
}

/// A borrowed element paired with the namespace scope it appears in.
#[derive(Debug, Clone)]
pub struct ElementRef<'a> {
    element: &'a Element,
    scope: NamespaceScope,
}

impl<'a> ElementRef<'a> {
    pub fn new(element: &'a Element, parent_scope: NamespaceScope) -> Self {
        Self {
            element,
            scope: parent_scope,
        }
    }

    pub fn root(element: &'a Element) -> Self {
        Self::new(element, NamespaceScope::default())
    }

    pub fn element(&self) -> &'a Element {
        self.element
    }

    /// Scope in which this element appears (excluding its own declarations).
    pub fn parent_scope(&self) -> &NamespaceScope {
        &self.scope
    }

    /// Scope including this element's own declarations.
    pub fn scope(&self) -> NamespaceScope {
        self.scope.enter(self.element)
    }

    pub fn namespace_uri(&self) -> Option<Cow<'a, str>> {
        let prefix = self.element.prefix.as_deref().unwrap_or("");
        if let Some(uri) = self.element.namespaces.get(prefix) {
            return (!uri.is_empty()).then(|| Cow::Borrowed(uri.as_str()));
        }
        self.scope
            .resolve(prefix)
            .map(|uri| Cow::Owned(uri.to_string()))
    }

    pub fn is(&self, namespace: &str, local_name: &str) -> bool {
        self.element.local_name == local_name
            && self.namespace_uri().as_deref() == Some(namespace)
    }

    pub fn children(&self) -> impl Iterator<Item = ElementRef<'a>> + use<'a> {
        let scope = self.scope();
        self.element
            .child_elements()
            .map(move |child| ElementRef::new(child, scope.clone()))
    }

    pub fn child(&self, namespace: &str, local_name: &str) -> Option<ElementRef<'a>> {
        self.children().find(|c| c.is(namespace, local_name))
    }

    pub fn children_named(&self, namespace: &str, local_name: &str) -> Vec<ElementRef<'a>> {
        self.children()
            .filter(|c| c.is(namespace, local_name))
            .collect()
    }

    /// Descendant reached by following `path` from this element.
    pub fn at_path(&self, path: &ElementPath) -> Option<ElementRef<'a>> {
        let mut current = self.clone();
        for &index in path.indices() {
            let scope = current.scope();
            current = match current.element.children.get(index)? {
                Node::Element(element) => ElementRef::new(element, scope),
                _ => return None,
            };
        }
        Some(current)
    }

    /// Descendant elements (document order, excluding self) matching `predicate`.
    pub fn find_descendants<F>(&self, predicate: F) -> Vec<(ElementPath, ElementRef<'a>)>
    where
        F: Fn(&ElementRef<'a>) -> bool,
    {
        let mut found = Vec::new();
        collect_descendants(self, &ElementPath::default(), &predicate, &mut found);
        found
    }
}

fn collect_descendants<'a, F>(
    node: &ElementRef<'a>,
    path: &ElementPath,
    predicate: &F,
    found: &mut Vec<(ElementPath, ElementRef<'a>)>,
) where
    F: Fn(&ElementRef<'a>) -> bool,
{
    let scope = node.scope();
    for (index, child) in node.element.children.iter().enumerate() {
        if let Node::Element(element) = child {
            let child_ref = ElementRef::new(element, scope.clone());
            let child_path = path.child(index);
            if predicate(&child_ref) {
                found.push((child_path.clone(), child_ref.clone()));
            }
            collect_descendants(&child_ref, &child_path, predicate, found);
        }
    }
}

/// The `<?xml ...?>` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDeclaration {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<String>,
}

impl Default for XmlDeclaration {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            encoding: Some("UTF-8".to_string()),
            standalone: None,
        }
    }
}

/// A parsed document: optional declaration plus exactly one root element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub declaration: Option<XmlDeclaration>,
    pub root: Element,
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self {
            declaration: None,
            root,
        }
    }

    pub fn root_ref(&self) -> ElementRef<'_> {
        ElementRef::root(&self.root)
    }
}

impl FromStr for Document {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Document::parse(s)
    }
}

pub(crate) fn split_qualified_name(name: &str) -> (Option<String>, String) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix.to_string()), local.to_string()),
        None => (None, name.to_string()),
    }
}

fn join_qualified_name(prefix: Option<&str>, local_name: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}:{local_name}"),
        None => local_name.to_string(),
    }
}
