use std::collections::HashMap;

use crate::c14n::C14nAlgorithm;
use crate::error::{Error, Result};

use super::{Transform, TransformPipeline};

/// Maps transform algorithm URIs to transform kinds.
#[derive(Debug, Clone)]
pub struct TransformRegistry {
    transforms: HashMap<String, Transform>,
}

impl Default for TransformRegistry {
    /// Registry holding the enveloped-signature and exclusive c14n transforms.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register_builtin(Transform::EnvelopedSignature);
        registry.register_builtin(Transform::Canonicalize(C14nAlgorithm::Exclusive));
        registry
    }
}

impl TransformRegistry {
    pub fn empty() -> Self {
        Self {
            transforms: HashMap::new(),
        }
    }

    fn register_builtin(&mut self, transform: Transform) {
        self.register(transform.uri(), transform);
    }

    /// Register `transform` under `uri`, replacing any previous entry.
    pub fn register(&mut self, uri: impl Into<String>, transform: Transform) {
        self.transforms.insert(uri.into(), transform);
    }

    pub fn resolve(&self, uri: &str) -> Option<Transform> {
        self.transforms.get(uri).copied()
    }

    /// Build a pipeline from algorithm URIs in document order.
    pub fn pipeline<'u, I>(&self, uris: I) -> Result<TransformPipeline>
    where
        I: IntoIterator<Item = &'u str>,
    {
        uris.into_iter()
            .map(|uri| {
                self.resolve(uri)
                    .ok_or_else(|| Error::UnsupportedAlgorithm(format!("transform {uri}")))
            })
            .collect()
    }
}
