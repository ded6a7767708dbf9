//! Enveloped XML signatures: one `Signature` element per document, one
//! whole-document `Reference`, exclusive c14n and RSA-SHA256.

mod signed_document;
mod signer;
mod types;
mod validator;

#[cfg(test)]
mod tests;

pub use signed_document::{SignedDocument, Verified};
pub use types::{
    DigestAlgorithm, KeyInfo, Reference, SignatureAlgorithm, SignatureElement, SignedInfo,
    ValidationResult,
};
