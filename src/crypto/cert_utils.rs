use openssl::asn1::{Asn1Integer, Asn1Time};
use openssl::bn::{BigNum, MsbOption};
use openssl::hash::MessageDigest;
use openssl::x509::extension::{BasicConstraints, KeyUsage};
use openssl::x509::{X509Builder, X509Name, X509NameBuilder};

use crate::crypto::Certificate;
use crate::crypto::errors::CryptoResult;
use crate::crypto::rsa::{RsaKeySize, RsaPrivateKey};

/// A self-signed signing identity, used by tests and local tooling.
#[derive(Debug, Clone)]
pub struct TestIdentity {
    pub private_key: RsaPrivateKey,
    pub certificate: Certificate,
    pub private_key_pem: String,
    pub certificate_pem: String,
}

/// Generate an RSA-2048 key and a self-signed certificate for `common_name`.
pub fn generate_test_certificate(common_name: &str) -> CryptoResult<TestIdentity> {
    let private_key = RsaPrivateKey::generate(RsaKeySize::Rsa2048)?;
    let pkey = private_key.pkey();

    let mut cert_builder = X509Builder::new()?;
    cert_builder.set_version(2)?;
    let serial = generate_serial_number()?;
    cert_builder.set_serial_number(&serial)?;

    let subject_name = create_x509_name(&[
        ("C", "NL"),
        ("O", "Test Merchant"),
        ("CN", common_name),
    ])?;
    cert_builder.set_subject_name(&subject_name)?;
    cert_builder.set_issuer_name(&subject_name)?;
    cert_builder.set_pubkey(pkey)?;

    let not_before = Asn1Time::days_from_now(0)?;
    let not_after = Asn1Time::days_from_now(365)?;
    cert_builder.set_not_before(&not_before)?;
    cert_builder.set_not_after(&not_after)?;

    cert_builder.append_extension(BasicConstraints::new().build()?)?;
    cert_builder.append_extension(
        KeyUsage::new()
            .critical()
            .digital_signature()
            .non_repudiation()
            .build()?,
    )?;
    cert_builder.sign(pkey, MessageDigest::sha256())?;

    let x509 = cert_builder.build();
    let certificate_pem = String::from_utf8_lossy(&x509.to_pem()?).to_string();
    let certificate = Certificate::from_x509(x509)?;
    let private_key_pem = private_key.to_pem()?;

    Ok(TestIdentity {
        private_key,
        certificate,
        private_key_pem,
        certificate_pem,
    })
}

fn generate_serial_number() -> CryptoResult<Asn1Integer> {
    let mut serial = BigNum::new()?;
    serial.rand(128, MsbOption::MAYBE_ZERO, false)?;
    Ok(serial.to_asn1_integer()?)
}

fn create_x509_name(entries: &[(&str, &str)]) -> CryptoResult<X509Name> {
    let mut builder = X509NameBuilder::new()?;
    for (field, value) in entries {
        builder.append_entry_by_text(field, value)?;
    }
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_identity_is_consistent() {
        let identity = generate_test_certificate("merchant").unwrap();
        assert!(identity.private_key.matches(identity.certificate.public_key()));
        assert!(identity.certificate_pem.starts_with("-----BEGIN CERTIFICATE-----"));
        assert!(identity.private_key_pem.contains("PRIVATE KEY"));
        assert_eq!(
            Certificate::from_pem(&identity.certificate_pem).unwrap(),
            identity.certificate
        );
    }

    #[test]
    fn test_identities_are_distinct() {
        let a = generate_test_certificate("a").unwrap();
        let b = generate_test_certificate("b").unwrap();
        assert_ne!(a.certificate.fingerprint(), b.certificate.fingerprint());
    }
}
