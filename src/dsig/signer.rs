//! Producing an enveloped signature inside an owned document.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, info};

use super::types::{DigestAlgorithm, KeyInfo, Reference, SignedInfo};
use crate::c14n;
use crate::constants::{
    SIGNATURE_ELEMENT, SIGNATURE_VALUE_ELEMENT, SIGNED_INFO_ELEMENT, XMLDSIG_NAMESPACE,
};
use crate::crypto::rsa;
use crate::error::{Error, Result};
use crate::keys::SigningKey;
use crate::transforms::TransformPipeline;
use crate::xml::{Document, Element, ElementPath, Node};

/// Fill the document's empty `Signature` placeholder and return the result.
pub(crate) fn sign_document(mut document: Document, key: &SigningKey) -> Result<Document> {
    info!(
        fingerprint = key.certificate().fingerprint(),
        "Signing document"
    );

    let (path, prefix, digest) = {
        let root = document.root_ref();
        let placeholders = root.find_descendants(|node| node.is(XMLDSIG_NAMESPACE, SIGNATURE_ELEMENT));
        let (path, placeholder) = match placeholders.as_slice() {
            [] => {
                return Err(Error::MalformedSignatureStructure(
                    "document has no Signature placeholder".to_string(),
                ));
            }
            [single] => single.clone(),
            _ => {
                return Err(Error::MalformedSignatureStructure(format!(
                    "document has {} Signature elements, expected one",
                    placeholders.len()
                )));
            }
        };
        if !placeholder.element().is_empty_placeholder() {
            return Err(Error::MalformedSignatureStructure(
                "Signature placeholder is not empty".to_string(),
            ));
        }

        let digest_input = TransformPipeline::enveloped().digest_input(&root)?;
        let digest = DigestAlgorithm::Sha256.digest(&digest_input)?;
        debug!(len = digest_input.len(), "Computed reference digest");
        (path, placeholder.element().prefix.clone(), digest)
    };

    let signed_info = SignedInfo::enveloped(Reference::enveloped(digest));
    placeholder_mut(&mut document, &path)?.children =
        vec![Node::Element(signed_info.to_element(prefix.as_deref()))];

    let canonical_signed_info = {
        let root = document.root_ref();
        let signed_info_node = root
            .at_path(&path)
            .and_then(|signature| signature.child(XMLDSIG_NAMESPACE, SIGNED_INFO_ELEMENT))
            .ok_or_else(|| {
                Error::MalformedSignatureStructure("SignedInfo was not inserted".to_string())
            })?;
        c14n::canonicalize_ref(&signed_info_node, signed_info.canonicalization)?
    };

    let signature = rsa::sign(
        key.private_key(),
        &canonical_signed_info,
        signed_info.signature_method.hash_alg(),
    )?;

    let signature_element = placeholder_mut(&mut document, &path)?;
    signature_element.children.push(Node::Element(
        Element::with_prefix(prefix.as_deref(), SIGNATURE_VALUE_ELEMENT)
            .with_text(STANDARD.encode(signature.as_bytes())),
    ));
    signature_element
        .children
        .push(Node::Element(KeyInfo::for_key(key).to_element(prefix.as_deref())));

    info!("Document signed successfully");
    Ok(document)
}

fn placeholder_mut<'a>(document: &'a mut Document, path: &ElementPath) -> Result<&'a mut Element> {
    document.root.at_path_mut(path).ok_or_else(|| {
        Error::MalformedSignatureStructure("no element at the Signature placeholder path".to_string())
    })
}
