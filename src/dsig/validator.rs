//! Checking an enveloped signature against a pinned certificate.

use tracing::{debug, info, warn};

use super::types::{KeyInfo, SignatureElement, ValidationResult};
use crate::c14n;
use crate::constants::{SIGNATURE_ELEMENT, SIGNED_INFO_ELEMENT, XMLDSIG_NAMESPACE};
use crate::crypto::Certificate;
use crate::crypto::rsa::{self, RsaSignature};
use crate::error::{Error, Result};
use crate::transforms::TransformRegistry;
use crate::xml::Document;

/// Verify the single enveloped signature of `document`.
///
/// Every data-driven failure is reported through the result, never raised.
pub(crate) fn verify_document(
    document: &Document,
    registry: &TransformRegistry,
    certificate: &Certificate,
) -> ValidationResult {
    debug!("Validating enveloped XML signature");
    let result = try_verify(document, registry, certificate).unwrap_or_else(ValidationResult::from);
    if result.is_valid() {
        info!(
            fingerprint = certificate.fingerprint(),
            "XML signature verified successfully"
        );
    } else {
        warn!(reason = %result, "XML signature rejected");
    }
    result
}

fn try_verify(
    document: &Document,
    registry: &TransformRegistry,
    certificate: &Certificate,
) -> Result<ValidationResult> {
    let root = document.root_ref();
    let signatures = root.find_descendants(|node| node.is(XMLDSIG_NAMESPACE, SIGNATURE_ELEMENT));
    let (path, signature_node) = match signatures.as_slice() {
        [single] => single.clone(),
        [] => {
            return Err(Error::MalformedSignatureStructure(
                "no Signature element found".to_string(),
            ));
        }
        _ => {
            return Err(Error::MalformedSignatureStructure(format!(
                "expected one Signature element, found {}",
                signatures.len()
            )));
        }
    };

    let signature = SignatureElement::from_element(&signature_node, path, registry)?;
    let reference = match signature.signed_info.references.as_slice() {
        [reference] => reference,
        references => {
            return Err(Error::MalformedSignatureStructure(format!(
                "expected one Reference, found {}",
                references.len()
            )));
        }
    };
    if !reference.uri.is_empty() {
        return Err(Error::MalformedSignatureStructure(format!(
            "only whole-document references are supported, got URI \"{}\"",
            reference.uri
        )));
    }

    match &signature.key_info {
        Some(KeyInfo::KeyName(name)) if name != certificate.fingerprint() => {
            warn!(
                key_name = %name,
                expected = certificate.fingerprint(),
                "KeyName does not match the pinned certificate"
            );
        }
        Some(KeyInfo::X509Certificate(der)) if der.as_slice() != certificate.der() => {
            warn!("Embedded certificate differs from the pinned certificate");
        }
        _ => {}
    }

    let digest_input = reference.pipeline().digest_input(&root)?;
    let digest = reference.digest_method.digest(&digest_input)?;
    if digest != reference.digest_value {
        debug!("Digest value verification failed");
        return Ok(ValidationResult::DigestMismatch);
    }

    let signed_info_node = signature_node
        .child(XMLDSIG_NAMESPACE, SIGNED_INFO_ELEMENT)
        .ok_or_else(|| Error::MalformedSignatureStructure("Signature without SignedInfo".to_string()))?;
    let canonical_signed_info =
        c14n::canonicalize_ref(&signed_info_node, signature.signed_info.canonicalization)?;

    let signature_value = RsaSignature::new(signature.signature_value);
    let verified = rsa::verify(
        certificate.public_key(),
        &canonical_signed_info,
        &signature_value,
        signature.signed_info.signature_method.hash_alg(),
    )?;

    Ok(if verified {
        ValidationResult::Valid
    } else {
        ValidationResult::SignatureMismatch
    })
}
