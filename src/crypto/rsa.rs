//! RSA keys and RSASSA-PKCS1-v1_5 signatures.

use crate::crypto::HashAlg;
use crate::crypto::errors::{CryptoResult, Error};
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private, Public};
use openssl::rsa::{Padding, Rsa};
use openssl::sign::{Signer, Verifier};
use std::fmt;

/// Smallest modulus accepted when loading a key or certificate.
pub const MIN_RSA_BITS: u32 = 1024;

/// RSA modulus sizes. Loaded keys may carry any size from [`MIN_RSA_BITS`] up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsaKeySize {
    Rsa2048,
    Rsa3072,
    Rsa4096,
    Other(u32),
}

impl RsaKeySize {
    /// Get the key size in bits
    pub fn bits(&self) -> u32 {
        match self {
            RsaKeySize::Rsa2048 => 2048,
            RsaKeySize::Rsa3072 => 3072,
            RsaKeySize::Rsa4096 => 4096,
            RsaKeySize::Other(bits) => *bits,
        }
    }

    /// Modulus length in bytes, which is also the signature length
    pub fn bytes(&self) -> usize {
        (self.bits() / 8) as usize
    }
}

impl TryFrom<u32> for RsaKeySize {
    type Error = Error;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        match bits {
            2048 => Ok(Self::Rsa2048),
            3072 => Ok(Self::Rsa3072),
            4096 => Ok(Self::Rsa4096),
            bits if bits >= MIN_RSA_BITS => Ok(Self::Other(bits)),
            _ => Err(Error::UnsupportedKey(format!(
                "RSA modulus of {bits} bits, at least {MIN_RSA_BITS} required"
            ))),
        }
    }
}

fn key_size_of<T>(key: &PKey<T>) -> CryptoResult<RsaKeySize>
where
    T: openssl::pkey::HasPublic,
{
    let rsa = key
        .rsa()
        .map_err(|_| Error::UnsupportedKey(format!("{:?} key, expected RSA", key.id())))?;
    RsaKeySize::try_from(rsa.size() * 8)
}

/// Raw RSA signature bytes
#[derive(Clone, PartialEq, Eq)]
pub struct RsaSignature(Vec<u8>);

impl RsaSignature {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self(data.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for RsaSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaSignature")
            .field("size", &self.len())
            .field("hex", &hex::encode(&self.0))
            .finish()
    }
}

/// RSA private key wrapper
#[derive(Clone)]
pub struct RsaPrivateKey {
    key: PKey<Private>,
    key_size: RsaKeySize,
}

impl fmt::Debug for RsaPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaPrivateKey")
            .field("key_size", &self.key_size)
            .finish_non_exhaustive()
    }
}

impl RsaPrivateKey {
    /// Generate a new RSA private key
    pub fn generate(key_size: RsaKeySize) -> CryptoResult<Self> {
        let rsa = Rsa::generate(key_size.bits())?;
        let key = PKey::from_rsa(rsa)?;
        Ok(Self { key, key_size })
    }

    /// Load from PEM-encoded PKCS#1/PKCS#8.
    pub fn from_pem(pem_bytes: impl AsRef<[u8]>) -> CryptoResult<Self> {
        let key = PKey::private_key_from_pem(pem_bytes.as_ref())?;
        Self::from_pkey(key)
    }

    /// Load from an encrypted PEM key protected by `passphrase`.
    pub fn from_pem_with_passphrase(
        pem_bytes: impl AsRef<[u8]>,
        passphrase: impl AsRef<[u8]>,
    ) -> CryptoResult<Self> {
        let key = PKey::private_key_from_pem_passphrase(pem_bytes.as_ref(), passphrase.as_ref())?;
        Self::from_pkey(key)
    }

    /// Load from DER-encoded PKCS#1/PKCS#8.
    pub fn from_der(der_bytes: impl AsRef<[u8]>) -> CryptoResult<Self> {
        let key = PKey::private_key_from_der(der_bytes.as_ref())?;
        Self::from_pkey(key)
    }

    pub(crate) fn from_pkey(key: PKey<Private>) -> CryptoResult<Self> {
        let key_size = key_size_of(&key)?;
        Ok(Self { key, key_size })
    }

    /// Serialize as PEM-encoded PKCS#8.
    pub fn to_pem(&self) -> CryptoResult<String> {
        let pem_bytes = self.key.private_key_to_pem_pkcs8()?;
        Ok(String::from_utf8_lossy(&pem_bytes).to_string())
    }

    /// Serialize as PEM-encoded PKCS#8 encrypted with AES-256-CBC.
    pub fn to_encrypted_pem(&self, passphrase: impl AsRef<[u8]>) -> CryptoResult<String> {
        let pem_bytes = self.key.private_key_to_pem_pkcs8_passphrase(
            openssl::symm::Cipher::aes_256_cbc(),
            passphrase.as_ref(),
        )?;
        Ok(String::from_utf8_lossy(&pem_bytes).to_string())
    }

    /// Get the corresponding public key
    pub fn public_key(&self) -> CryptoResult<RsaPublicKey> {
        let key = PKey::public_key_from_der(&self.key.public_key_to_der()?)?;
        Ok(RsaPublicKey {
            key,
            key_size: self.key_size,
        })
    }

    /// True when `public_key` is the public half of this key.
    pub fn matches(&self, public_key: &RsaPublicKey) -> bool {
        self.key.public_eq(&public_key.key)
    }

    pub fn key_size(&self) -> RsaKeySize {
        self.key_size
    }

    pub(crate) fn pkey(&self) -> &PKey<Private> {
        &self.key
    }
}

/// RSA public key wrapper
#[derive(Debug, Clone)]
pub struct RsaPublicKey {
    key: PKey<Public>,
    key_size: RsaKeySize,
}

impl RsaPublicKey {
    pub(crate) fn from_pkey(key: PKey<Public>) -> CryptoResult<Self> {
        let key_size = key_size_of(&key)?;
        Ok(Self { key, key_size })
    }

    /// Export key in SubjectPublicKeyInfo DER format
    pub fn to_der(&self) -> CryptoResult<Vec<u8>> {
        Ok(self.key.public_key_to_der()?)
    }

    pub fn key_size(&self) -> RsaKeySize {
        self.key_size
    }

    pub(crate) fn pkey(&self) -> &PKey<Public> {
        &self.key
    }
}

/// Sign `data` with RSASSA-PKCS1-v1_5 over the given hash.
///
/// The digest is wrapped in its DigestInfo before padding, which is what
/// XML-DSig `rsa-sha256` verifiers expect.
pub fn sign(
    private_key: &RsaPrivateKey,
    data: impl AsRef<[u8]>,
    hash_alg: HashAlg,
) -> CryptoResult<RsaSignature> {
    let mut signer = Signer::new(MessageDigest::from(&hash_alg), private_key.pkey())?;
    signer.set_rsa_padding(Padding::PKCS1)?;
    let signature_data = signer.sign_oneshot_to_vec(data.as_ref())?;
    Ok(RsaSignature::new(signature_data))
}

/// Verify an RSASSA-PKCS1-v1_5 signature.
///
/// A signature whose length differs from the modulus length never verifies.
pub fn verify(
    public_key: &RsaPublicKey,
    data: impl AsRef<[u8]>,
    signature: &RsaSignature,
    hash_alg: HashAlg,
) -> CryptoResult<bool> {
    if signature.len() != public_key.key_size().bytes() {
        return Ok(false);
    }

    let mut verifier = Verifier::new(MessageDigest::from(&hash_alg), public_key.pkey())?;
    verifier.set_rsa_padding(Padding::PKCS1)?;
    Ok(verifier.verify_oneshot(signature.as_bytes(), data.as_ref())?)
}
