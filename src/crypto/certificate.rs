use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use openssl::x509::X509;
use std::fmt;

use crate::crypto::errors::CryptoResult;
use crate::crypto::rsa::RsaPublicKey;

/// A pinned X.509 certificate.
///
/// Trust is established out of band, so no chain, revocation or validity
/// period checks are made here. The key must be RSA with a modulus of at
/// least [`MIN_RSA_BITS`](crate::crypto::rsa::MIN_RSA_BITS) bits.
#[derive(Clone)]
pub struct Certificate {
    der: Vec<u8>,
    fingerprint: String,
    public_key: RsaPublicKey,
}

impl Certificate {
    pub fn from_pem(pem: impl AsRef<[u8]>) -> CryptoResult<Self> {
        Self::from_x509(X509::from_pem(pem.as_ref())?)
    }

    pub fn from_der(der: impl AsRef<[u8]>) -> CryptoResult<Self> {
        Self::from_x509(X509::from_der(der.as_ref())?)
    }

    pub(crate) fn from_x509(x509: X509) -> CryptoResult<Self> {
        let der = x509.to_der()?;
        let fingerprint = crate::crypto::fingerprint(&der)?;
        let public_key = RsaPublicKey::from_pkey(x509.public_key()?)?;
        Ok(Self {
            der,
            fingerprint,
            public_key,
        })
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.der)
    }

    pub fn to_pem(&self) -> CryptoResult<String> {
        let pem = X509::from_der(&self.der)?.to_pem()?;
        Ok(String::from_utf8_lossy(&pem).to_string())
    }

    /// Lowercase hex SHA-1 of the DER encoding.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("fingerprint", &self.fingerprint)
            .field("key_size", &self.public_key.key_size())
            .finish()
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for Certificate {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::HashAlg;
    use crate::crypto::cert_utils::generate_test_certificate;

    #[test]
    fn test_fingerprint_is_sha1_of_der() {
        let identity = generate_test_certificate("fingerprint").unwrap();
        let cert = Certificate::from_pem(&identity.certificate_pem).unwrap();

        let expected = hex::encode(HashAlg::Sha1.hash(cert.der()).unwrap());
        assert_eq!(cert.fingerprint(), expected);
        assert_eq!(cert.fingerprint().len(), 40);
        assert!(cert.fingerprint().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_pem_der_and_base64_agree() {
        let identity = generate_test_certificate("encodings").unwrap();
        let from_pem = Certificate::from_pem(&identity.certificate_pem).unwrap();
        let from_der = Certificate::from_der(from_pem.der()).unwrap();
        assert_eq!(from_pem, from_der);

        let decoded = STANDARD.decode(from_pem.to_base64()).unwrap();
        assert_eq!(decoded, from_pem.der());
        assert_eq!(Certificate::from_pem(from_pem.to_pem().unwrap()).unwrap(), from_pem);
    }

    #[test]
    fn test_public_key_matches_private_key() {
        let identity = generate_test_certificate("keys").unwrap();
        let cert = Certificate::from_pem(&identity.certificate_pem).unwrap();
        assert!(identity.private_key.matches(cert.public_key()));
    }

    #[test]
    fn test_invalid_certificate_rejected() {
        assert!(Certificate::from_pem("not a certificate").is_err());
        assert!(Certificate::from_der([0x30u8, 0x03, 0x02, 0x01, 0x01]).is_err());
    }
}
