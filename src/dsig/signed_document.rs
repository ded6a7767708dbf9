use super::signer::sign_document;
use super::types::ValidationResult;
use super::validator::verify_document;
use crate::crypto::Certificate;
use crate::error::Result;
use crate::keys::SigningKey;
use crate::transforms::TransformRegistry;
use crate::xml::Document;

/// A document carrying (or about to carry) one enveloped signature.
///
/// Both `sign` and `verify` consume the value: a document is signed or
/// checked exactly once.
#[derive(Debug, Clone)]
pub struct SignedDocument {
    document: Document,
    registry: TransformRegistry,
}

impl SignedDocument {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            registry: TransformRegistry::default(),
        }
    }

    pub fn parse(xml: &str) -> Result<Self> {
        Ok(Self::new(Document::parse(xml)?))
    }

    /// Resolve `Transform` algorithms through a custom registry.
    pub fn with_registry(mut self, registry: TransformRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    /// Sign the document, which must contain one empty `Signature` placeholder.
    pub fn sign(self, key: &SigningKey) -> Result<Document> {
        sign_document(self.document, key)
    }

    pub fn verify(self, certificate: &Certificate) -> ValidationResult {
        verify_document(&self.document, &self.registry, certificate)
    }

    pub fn validate(self, certificate: &Certificate) -> bool {
        self.verify(certificate).is_valid()
    }

    /// Verify the signature and extract a business value from the same document.
    ///
    /// The value is produced whatever the signature status, so callers see
    /// both independently.
    pub fn verify_with<T, F>(self, certificate: &Certificate, extract: F) -> Verified<T>
    where
        F: FnOnce(&Document) -> T,
    {
        let signature = verify_document(&self.document, &self.registry, certificate);
        let value = extract(&self.document);
        Verified { value, signature }
    }
}

/// A value read from a received document together with that document's
/// signature status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified<T> {
    pub value: T,
    pub signature: ValidationResult,
}

impl<T> Verified<T> {
    pub fn is_valid(&self) -> bool {
        self.signature.is_valid()
    }

    /// The value, only when the signature verified.
    pub fn into_verified(self) -> Option<T> {
        self.signature.is_valid().then_some(self.value)
    }
}
