use std::borrow::Cow;

use crate::c14n::{self, C14nAlgorithm};
use crate::error::Result;
use crate::xml::{Element, ElementRef, NamespaceScope};

use super::Transform;

/// Data flowing between transform steps.
#[derive(Debug, Clone)]
pub enum TransformData<'a> {
    /// A subtree and the namespace scope it appears in.
    Node {
        element: Cow<'a, Element>,
        scope: NamespaceScope,
    },
    /// Octets produced by a terminal step.
    Bytes(Vec<u8>),
}

impl<'a> TransformData<'a> {
    pub fn from_ref(node: &ElementRef<'a>) -> Self {
        TransformData::Node {
            element: Cow::Borrowed(node.element()),
            scope: node.parent_scope().clone(),
        }
    }

    /// Finish the chain, converting a remaining node with exclusive c14n.
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            TransformData::Bytes(bytes) => Ok(bytes),
            TransformData::Node { element, scope } => {
                c14n::canonicalize(&element, &scope, C14nAlgorithm::Exclusive)
            }
        }
    }
}

/// An ordered chain of transforms applied left to right.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformPipeline {
    transforms: Vec<Transform>,
}

impl TransformPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// The chain used for enveloped signatures: strip signatures, then exc-c14n.
    pub fn enveloped() -> Self {
        [
            Transform::EnvelopedSignature,
            Transform::Canonicalize(C14nAlgorithm::Exclusive),
        ]
        .into_iter()
        .collect()
    }

    pub fn push(&mut self, transform: Transform) {
        self.transforms.push(transform);
    }

    pub fn transforms(&self) -> &[Transform] {
        &self.transforms
    }

    pub fn execute<'a>(&self, input: TransformData<'a>) -> Result<TransformData<'a>> {
        let mut data = input;
        for transform in &self.transforms {
            data = transform.apply(data)?;
        }
        Ok(data)
    }

    /// Run the chain over `node` and return the octets to digest.
    pub fn digest_input(&self, node: &ElementRef<'_>) -> Result<Vec<u8>> {
        self.execute(TransformData::from_ref(node))?.into_bytes()
    }
}

impl FromIterator<Transform> for TransformPipeline {
    fn from_iter<I: IntoIterator<Item = Transform>>(iter: I) -> Self {
        Self {
            transforms: iter.into_iter().collect(),
        }
    }
}
