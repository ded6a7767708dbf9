use std::sync::OnceLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::*;
use crate::c14n::{C14nAlgorithm, canonicalize_str};
use crate::config::KeyInfoStyle;
use crate::constants::XMLDSIG_NAMESPACE;
use crate::crypto::HashAlg;
use crate::crypto::cert_utils::{TestIdentity, generate_test_certificate};
use crate::error::Error;
use crate::keys::SigningKey;
use crate::xml::Document;

const TEMPLATE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<DirectoryReq xmlns="http://www.idealdesk.com/ideal/messages/mer-acq/3.3.1" version="3.3.1">
  <createDateTimestamp>2011-11-28T16:30:00.000Z</createDateTimestamp>
  <Merchant>
    <merchantID>123456789</merchantID>
    <subID>0</subID>
  </Merchant>
  <Signature xmlns="http://www.w3.org/2000/09/xmldsig#"/>
</DirectoryReq>"#;

fn identity() -> &'static TestIdentity {
    static IDENTITY: OnceLock<TestIdentity> = OnceLock::new();
    IDENTITY.get_or_init(|| generate_test_certificate("merchant").unwrap())
}

fn signing_key() -> SigningKey {
    let identity = identity();
    SigningKey::new(identity.private_key.clone(), identity.certificate.clone()).unwrap()
}

fn sign(xml: &str) -> Document {
    SignedDocument::parse(xml).unwrap().sign(&signing_key()).unwrap()
}

fn verify(document: Document) -> ValidationResult {
    SignedDocument::new(document).verify(&identity().certificate)
}

fn verify_xml(xml: &str) -> ValidationResult {
    SignedDocument::parse(xml).unwrap().verify(&identity().certificate)
}

fn element_text(document: &Document, local_name: &str) -> String {
    let root = document.root_ref();
    let (_, node) = root
        .find_descendants(|node| node.is(XMLDSIG_NAMESPACE, local_name))
        .into_iter()
        .next()
        .unwrap();
    node.element().text()
}

#[test]
fn test_sign_fills_placeholder() {
    let signed = sign(TEMPLATE);
    let xml = signed.to_xml_string().unwrap();

    assert!(xml.contains(r#"<CanonicalizationMethod Algorithm="http://www.w3.org/2001/10/xml-exc-c14n#"/>"#));
    assert!(xml.contains(r#"<SignatureMethod Algorithm="http://www.w3.org/2001/04/xmldsig-more#rsa-sha256"/>"#));
    assert!(xml.contains(r#"<Reference URI="">"#));
    assert!(xml.contains(r#"<Transform Algorithm="http://www.w3.org/2000/09/xmldsig#enveloped-signature"/>"#));
    assert!(xml.contains(r#"<DigestMethod Algorithm="http://www.w3.org/2001/04/xmlenc#sha256"/>"#));
    assert_eq!(
        element_text(&signed, "KeyName"),
        identity().certificate.fingerprint()
    );
    assert_eq!(
        STANDARD.decode(element_text(&signed, "SignatureValue")).unwrap().len(),
        256
    );
    assert!(verify(signed).is_valid());
}

#[test]
fn test_prefixed_placeholder_keeps_prefix() {
    let template = TEMPLATE.replace(
        r#"<Signature xmlns="http://www.w3.org/2000/09/xmldsig#"/>"#,
        r#"<ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#"></ds:Signature>"#,
    );
    let signed = sign(&template);
    let xml = signed.to_xml_string().unwrap();

    assert!(xml.contains("<ds:SignedInfo>"));
    assert!(xml.contains("<ds:SignatureValue>"));
    assert!(xml.contains("<ds:KeyInfo><ds:KeyName>"));
    assert!(verify(signed).is_valid());
}

#[test]
fn test_digest_matches_canonical_document_without_signature() {
    let signed = sign("<request><content>digest test</content><Signature xmlns=\"http://www.w3.org/2000/09/xmldsig#\"/></request>");

    let canonical = canonicalize_str(
        "<request><content>digest test</content></request>",
        C14nAlgorithm::Exclusive,
    )
    .unwrap();
    let expected = STANDARD.encode(HashAlg::Sha256.hash(&canonical).unwrap());
    assert_eq!(element_text(&signed, "DigestValue"), expected);
}

#[test]
fn test_x509_key_info() {
    let key = signing_key().with_key_info(KeyInfoStyle::X509Data);
    let signed = SignedDocument::parse(TEMPLATE).unwrap().sign(&key).unwrap();

    assert_eq!(
        element_text(&signed, "X509Certificate"),
        identity().certificate.to_base64()
    );
    assert!(verify(signed).is_valid());
}

#[test]
fn test_placeholder_errors() {
    let key = signing_key();

    let missing = SignedDocument::parse("<request><content/></request>").unwrap().sign(&key);
    assert!(matches!(missing, Err(Error::MalformedSignatureStructure(_))));

    let duplicate = SignedDocument::parse(
        "<r xmlns:ds=\"http://www.w3.org/2000/09/xmldsig#\"><ds:Signature/><ds:Signature/></r>",
    )
    .unwrap()
    .sign(&key);
    assert!(matches!(duplicate, Err(Error::MalformedSignatureStructure(_))));

    let filled = SignedDocument::new(sign(TEMPLATE)).sign(&key);
    assert!(matches!(filled, Err(Error::MalformedSignatureStructure(_))));
}

#[test]
fn test_signing_consumes_only_its_own_copy() {
    let template = Document::parse(TEMPLATE).unwrap();
    let signed = SignedDocument::new(template.clone()).sign(&signing_key()).unwrap();
    assert_ne!(signed, template);
    assert_eq!(template, Document::parse(TEMPLATE).unwrap());
}

#[test]
fn test_serialized_signature_survives_reformatting_of_base64() {
    let signed = sign(TEMPLATE);
    let signature_value = element_text(&signed, "SignatureValue");
    let folded: String = signature_value
        .as_bytes()
        .chunks(64)
        .map(|chunk| String::from_utf8_lossy(chunk).to_string())
        .collect::<Vec<_>>()
        .join("\n");

    let xml = signed.to_xml_string().unwrap().replace(&signature_value, &folded);
    assert!(verify_xml(&xml).is_valid());
}

#[test]
fn test_tampered_content_is_a_digest_mismatch() {
    let xml = sign(TEMPLATE).to_xml_string().unwrap();
    let tampered = xml.replace("123456789", "987654321");
    assert_eq!(verify_xml(&tampered), ValidationResult::DigestMismatch);
}

#[test]
fn test_tampered_signed_info_is_a_signature_mismatch() {
    let signed = sign(TEMPLATE);
    let xml = signed.to_xml_string().unwrap();

    // Keep the digest consistent with the content, but change what was signed.
    let tampered = xml.replace(
        "<DigestMethod ",
        "<DigestMethod xmlns:extra=\"urn:unused\" extra:note=\"x\" ",
    );
    assert_eq!(verify_xml(&tampered), ValidationResult::SignatureMismatch);
}

#[test]
fn test_unsupported_method_is_reported() {
    let xml = sign(TEMPLATE).to_xml_string().unwrap();
    let downgraded = xml.replace(
        "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256",
        "http://www.w3.org/2000/09/xmldsig#rsa-sha1",
    );
    assert!(matches!(
        verify_xml(&downgraded),
        ValidationResult::UnsupportedAlgorithm(_)
    ));
}

#[test]
fn test_malformed_signatures_are_reported() {
    let missing = verify_xml("<request><content/></request>");
    assert!(matches!(missing, ValidationResult::MalformedSignature(_)));

    let empty = verify_xml(TEMPLATE);
    assert!(matches!(empty, ValidationResult::MalformedSignature(_)));

    let xml = sign(TEMPLATE).to_xml_string().unwrap();
    let external = xml.replace("<Reference URI=\"\">", "<Reference URI=\"#body\">");
    assert!(matches!(
        verify_xml(&external),
        ValidationResult::MalformedSignature(_)
    ));

    let bad_base64 = xml.replace("<DigestValue>", "<DigestValue>*");
    assert!(matches!(
        verify_xml(&bad_base64),
        ValidationResult::MalformedSignature(_)
    ));
}

#[test]
fn test_verify_with_reports_value_and_status() {
    let signed = sign(TEMPLATE);
    let merchant_id = |document: &Document| {
        document
            .root
            .child_elements()
            .find(|e| e.local_name == "Merchant")
            .and_then(|m| m.child_elements().find(|e| e.local_name == "merchantID"))
            .map(|e| e.text())
    };

    let verified = SignedDocument::new(signed.clone()).verify_with(&identity().certificate, merchant_id);
    assert!(verified.is_valid());
    assert_eq!(verified.into_verified(), Some(Some("123456789".to_string())));

    let xml = signed.to_xml_string().unwrap().replace("123456789", "000000001");
    let rejected = SignedDocument::parse(&xml)
        .unwrap()
        .verify_with(&identity().certificate, merchant_id);
    assert_eq!(rejected.signature, ValidationResult::DigestMismatch);
    assert_eq!(rejected.value, Some("000000001".to_string()));
    assert_eq!(rejected.into_verified(), None);
}
