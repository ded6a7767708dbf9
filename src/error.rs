use thiserror::Error;

/// Errors raised while canonicalizing, transforming or signing a document.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Canonicalization error: {0}")]
    Canonicalization(String),

    #[error("Transform error: {0}")]
    Transform(String),

    #[error("Malformed signature structure: {0}")]
    MalformedSignatureStructure(String),

    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Key error: {0}")]
    Key(String),

    #[error(transparent)]
    Xml(#[from] crate::xml::Error),

    #[error("Crypto error: {0}")]
    Crypto(#[from] crate::crypto::Error),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
}

pub type Result<T> = std::result::Result<T, Error>;
