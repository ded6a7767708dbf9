//! Signature structures and their mapping to and from XML elements.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt;

use crate::c14n::C14nAlgorithm;
use crate::config::KeyInfoStyle;
use crate::constants::*;
use crate::crypto::HashAlg;
use crate::error::{Error, Result};
use crate::keys::SigningKey;
use crate::transforms::{Transform, TransformPipeline, TransformRegistry};
use crate::xml::{Element, ElementPath, ElementRef};

/// Signature algorithms accepted in `SignatureMethod`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    RsaSha256,
}

impl SignatureAlgorithm {
    pub fn uri(&self) -> &'static str {
        match self {
            Self::RsaSha256 => RSA_SHA256_ALGORITHM,
        }
    }

    pub fn from_uri(uri: &str) -> Result<Self> {
        match uri {
            RSA_SHA256_ALGORITHM => Ok(Self::RsaSha256),
            other => Err(Error::UnsupportedAlgorithm(format!("signature method {other}"))),
        }
    }

    pub fn hash_alg(&self) -> HashAlg {
        match self {
            Self::RsaSha256 => HashAlg::Sha256,
        }
    }
}

/// Digest algorithms accepted in `DigestMethod`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Sha256,
}

impl DigestAlgorithm {
    pub fn uri(&self) -> &'static str {
        match self {
            Self::Sha256 => SHA256_DIGEST_ALGORITHM,
        }
    }

    pub fn from_uri(uri: &str) -> Result<Self> {
        match uri {
            SHA256_DIGEST_ALGORITHM => Ok(Self::Sha256),
            other => Err(Error::UnsupportedAlgorithm(format!("digest method {other}"))),
        }
    }

    pub fn digest(&self, data: &[u8]) -> Result<Vec<u8>> {
        let hash_alg = match self {
            Self::Sha256 => HashAlg::Sha256,
        };
        Ok(hash_alg.hash(data)?)
    }
}

/// A `Reference`: what is signed, how it is transformed, and its digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Empty for the whole enclosing document.
    pub uri: String,
    pub transforms: Vec<Transform>,
    pub digest_method: DigestAlgorithm,
    pub digest_value: Vec<u8>,
}

impl Reference {
    /// Whole-document reference with the enveloped-signature transform chain.
    pub fn enveloped(digest_value: Vec<u8>) -> Self {
        Self {
            uri: String::new(),
            transforms: TransformPipeline::enveloped().transforms().to_vec(),
            digest_method: DigestAlgorithm::Sha256,
            digest_value,
        }
    }

    pub fn pipeline(&self) -> TransformPipeline {
        self.transforms.iter().copied().collect()
    }

    pub fn to_element(&self, prefix: Option<&str>) -> Element {
        let transforms = self.transforms.iter().fold(
            Element::with_prefix(prefix, TRANSFORMS_ELEMENT),
            |parent, transform| {
                parent.with_child(
                    Element::with_prefix(prefix, TRANSFORM_ELEMENT)
                        .with_attribute(ALGORITHM_ATTRIBUTE, transform.uri()),
                )
            },
        );

        Element::with_prefix(prefix, REFERENCE_ELEMENT)
            .with_attribute(URI_ATTRIBUTE, self.uri.clone())
            .with_child(transforms)
            .with_child(
                Element::with_prefix(prefix, DIGEST_METHOD_ELEMENT)
                    .with_attribute(ALGORITHM_ATTRIBUTE, self.digest_method.uri()),
            )
            .with_child(
                Element::with_prefix(prefix, DIGEST_VALUE_ELEMENT)
                    .with_text(STANDARD.encode(&self.digest_value)),
            )
    }

    pub fn from_element(node: &ElementRef<'_>, registry: &TransformRegistry) -> Result<Self> {
        let uri = node
            .element()
            .attribute(URI_ATTRIBUTE)
            .ok_or_else(|| malformed("Reference without URI attribute"))?
            .to_string();

        let transforms = match node.child(XMLDSIG_NAMESPACE, TRANSFORMS_ELEMENT) {
            Some(transforms) => {
                let uris = transforms
                    .children_named(XMLDSIG_NAMESPACE, TRANSFORM_ELEMENT)
                    .into_iter()
                    .map(|t| algorithm_of(&t))
                    .collect::<Result<Vec<_>>>()?;
                registry
                    .pipeline(uris.iter().map(String::as_str))?
                    .transforms()
                    .to_vec()
            }
            None => Vec::new(),
        };

        let digest_method = required_child(node, DIGEST_METHOD_ELEMENT)?;
        let digest_method = DigestAlgorithm::from_uri(&algorithm_of(&digest_method)?)?;
        let digest_value = decode_base64(&required_child(node, DIGEST_VALUE_ELEMENT)?.element().text())?;

        Ok(Self {
            uri,
            transforms,
            digest_method,
            digest_value,
        })
    }
}

/// The signed part of a signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedInfo {
    pub canonicalization: C14nAlgorithm,
    pub signature_method: SignatureAlgorithm,
    pub references: Vec<Reference>,
}

impl SignedInfo {
    pub fn enveloped(reference: Reference) -> Self {
        Self {
            canonicalization: C14nAlgorithm::Exclusive,
            signature_method: SignatureAlgorithm::RsaSha256,
            references: vec![reference],
        }
    }

    pub fn to_element(&self, prefix: Option<&str>) -> Element {
        let signed_info = Element::with_prefix(prefix, SIGNED_INFO_ELEMENT)
            .with_child(
                Element::with_prefix(prefix, CANONICALIZATION_METHOD_ELEMENT)
                    .with_attribute(ALGORITHM_ATTRIBUTE, self.canonicalization.uri()),
            )
            .with_child(
                Element::with_prefix(prefix, SIGNATURE_METHOD_ELEMENT)
                    .with_attribute(ALGORITHM_ATTRIBUTE, self.signature_method.uri()),
            );
        self.references
            .iter()
            .fold(signed_info, |parent, reference| {
                parent.with_child(reference.to_element(prefix))
            })
    }

    pub fn from_element(node: &ElementRef<'_>, registry: &TransformRegistry) -> Result<Self> {
        let c14n_uri = algorithm_of(&required_child(node, CANONICALIZATION_METHOD_ELEMENT)?)?;
        let canonicalization = C14nAlgorithm::from_uri(&c14n_uri).ok_or_else(|| {
            Error::UnsupportedAlgorithm(format!("canonicalization method {c14n_uri}"))
        })?;
        let signature_method =
            SignatureAlgorithm::from_uri(&algorithm_of(&required_child(node, SIGNATURE_METHOD_ELEMENT)?)?)?;

        let references = node
            .children_named(XMLDSIG_NAMESPACE, REFERENCE_ELEMENT)
            .iter()
            .map(|reference| Reference::from_element(reference, registry))
            .collect::<Result<Vec<_>>>()?;
        if references.is_empty() {
            return Err(malformed("SignedInfo without Reference"));
        }

        Ok(Self {
            canonicalization,
            signature_method,
            references,
        })
    }
}

/// Identifies the signer's certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyInfo {
    /// Certificate fingerprint, as the bank protocol sends it.
    KeyName(String),
    /// DER certificate.
    X509Certificate(Vec<u8>),
}

impl KeyInfo {
    pub fn for_key(key: &SigningKey) -> Self {
        match key.key_info() {
            KeyInfoStyle::KeyName => Self::KeyName(key.certificate().fingerprint().to_string()),
            KeyInfoStyle::X509Data => Self::X509Certificate(key.certificate().der().to_vec()),
        }
    }

    pub fn to_element(&self, prefix: Option<&str>) -> Element {
        let content = match self {
            Self::KeyName(name) => {
                Element::with_prefix(prefix, KEY_NAME_ELEMENT).with_text(name.clone())
            }
            Self::X509Certificate(der) => Element::with_prefix(prefix, X509_DATA_ELEMENT)
                .with_child(
                    Element::with_prefix(prefix, X509_CERTIFICATE_ELEMENT)
                        .with_text(STANDARD.encode(der)),
                ),
        };
        Element::with_prefix(prefix, KEY_INFO_ELEMENT).with_child(content)
    }

    /// Read the first recognised entry of a `KeyInfo` element.
    pub fn from_element(node: &ElementRef<'_>) -> Result<Option<Self>> {
        if let Some(name) = node.child(XMLDSIG_NAMESPACE, KEY_NAME_ELEMENT) {
            return Ok(Some(Self::KeyName(name.element().text().trim().to_string())));
        }
        let certificate = node
            .child(XMLDSIG_NAMESPACE, X509_DATA_ELEMENT)
            .and_then(|data| data.child(XMLDSIG_NAMESPACE, X509_CERTIFICATE_ELEMENT));
        match certificate {
            Some(cert) => Ok(Some(Self::X509Certificate(decode_base64(&cert.element().text())?))),
            None => Ok(None),
        }
    }
}

/// A parsed `Signature` element and where it sits in its document.
#[derive(Debug, Clone)]
pub struct SignatureElement {
    pub signed_info: SignedInfo,
    pub signature_value: Vec<u8>,
    pub key_info: Option<KeyInfo>,
    pub path: ElementPath,
}

impl SignatureElement {
    pub fn from_element(
        node: &ElementRef<'_>,
        path: ElementPath,
        registry: &TransformRegistry,
    ) -> Result<Self> {
        let signed_info = SignedInfo::from_element(&required_child(node, SIGNED_INFO_ELEMENT)?, registry)?;
        let signature_value =
            decode_base64(&required_child(node, SIGNATURE_VALUE_ELEMENT)?.element().text())?;
        let key_info = match node.child(XMLDSIG_NAMESPACE, KEY_INFO_ELEMENT) {
            Some(key_info) => KeyInfo::from_element(&key_info)?,
            None => None,
        };

        Ok(Self {
            signed_info,
            signature_value,
            key_info,
            path,
        })
    }
}

/// Outcome of checking one received document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    DigestMismatch,
    SignatureMismatch,
    MalformedSignature(String),
    UnsupportedAlgorithm(String),
    CanonicalizationError(String),
    KeyError(String),
    CryptoError(String),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn reason(&self) -> String {
        match self {
            Self::Valid => "signature is valid".to_string(),
            Self::DigestMismatch => "digest of referenced content does not match".to_string(),
            Self::SignatureMismatch => "signature value does not verify".to_string(),
            Self::MalformedSignature(msg) => format!("malformed signature: {msg}"),
            Self::UnsupportedAlgorithm(msg) => format!("unsupported algorithm: {msg}"),
            Self::CanonicalizationError(msg) => format!("canonicalization failed: {msg}"),
            Self::KeyError(msg) => format!("key error: {msg}"),
            Self::CryptoError(msg) => format!("crypto error: {msg}"),
        }
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason())
    }
}

impl From<Error> for ValidationResult {
    fn from(err: Error) -> Self {
        match err {
            Error::Canonicalization(msg) => Self::CanonicalizationError(msg),
            Error::UnsupportedAlgorithm(msg) => Self::UnsupportedAlgorithm(msg),
            Error::Key(msg) => Self::KeyError(msg),
            Error::Crypto(e) => Self::CryptoError(e.to_string()),
            Error::MalformedSignatureStructure(msg) | Error::Transform(msg) => {
                Self::MalformedSignature(msg)
            }
            Error::Xml(e) => Self::MalformedSignature(e.to_string()),
            Error::Base64(e) => Self::MalformedSignature(format!("invalid base64: {e}")),
        }
    }
}

/// Decode `xsd:base64Binary` content.
///
/// Only the whitespace the lexical space allows is removed before
/// standard decoding.
pub(crate) fn decode_base64(text: &str) -> Result<Vec<u8>> {
    let compact: String = text
        .chars()
        .filter(|c| !matches!(c, ' ' | '\t' | '\n' | '\r'))
        .collect();
    Ok(STANDARD.decode(compact)?)
}

fn malformed(message: &str) -> Error {
    Error::MalformedSignatureStructure(message.to_string())
}

fn required_child<'a>(node: &ElementRef<'a>, local_name: &str) -> Result<ElementRef<'a>> {
    node.child(XMLDSIG_NAMESPACE, local_name).ok_or_else(|| {
        Error::MalformedSignatureStructure(format!(
            "{} without {local_name}",
            node.element().local_name
        ))
    })
}

fn algorithm_of(node: &ElementRef<'_>) -> Result<String> {
    node.element()
        .attribute(ALGORITHM_ATTRIBUTE)
        .map(str::to_string)
        .ok_or_else(|| {
            Error::MalformedSignatureStructure(format!(
                "{} without Algorithm attribute",
                node.element().local_name
            ))
        })
}
