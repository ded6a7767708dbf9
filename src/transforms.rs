//! Reference transforms.
//!
//! A transform either maps a subtree to a new subtree or, as the final step,
//! maps it to canonical bytes. Steps are composed by [`TransformPipeline`]
//! and looked up by algorithm URI through [`TransformRegistry`].

mod enveloped;
mod pipeline;
mod registry;

pub use pipeline::{TransformData, TransformPipeline};
pub use registry::TransformRegistry;

use tracing::debug;

use crate::c14n::{self, C14nAlgorithm};
use crate::constants::XMLDSIG_ENVELOPED_SIGNATURE;
use crate::error::{Error, Result};

/// One step of a reference's transform chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transform {
    /// Drop every descendant `dsig:Signature` element.
    EnvelopedSignature,
    /// Canonicalize the subtree into bytes.
    Canonicalize(C14nAlgorithm),
}

impl Transform {
    pub fn uri(&self) -> &'static str {
        match self {
            Self::EnvelopedSignature => XMLDSIG_ENVELOPED_SIGNATURE,
            Self::Canonicalize(algorithm) => algorithm.uri(),
        }
    }

    pub fn apply<'a>(&self, input: TransformData<'a>) -> Result<TransformData<'a>> {
        debug!(transform = self.uri(), "Applying transform");
        match (self, input) {
            (Self::EnvelopedSignature, TransformData::Node { element, scope }) => {
                let stripped = enveloped::strip_signatures(element, &scope);
                Ok(TransformData::Node {
                    element: stripped,
                    scope,
                })
            }
            (Self::Canonicalize(algorithm), TransformData::Node { element, scope }) => {
                let bytes = c14n::canonicalize(&element, &scope, *algorithm)?;
                Ok(TransformData::Bytes(bytes))
            }
            (transform, TransformData::Bytes(_)) => Err(Error::Transform(format!(
                "{} requires an XML node as input, got bytes",
                transform.uri()
            ))),
        }
    }
}
