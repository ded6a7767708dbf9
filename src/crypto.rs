//! OpenSSL-backed primitives: digests, RSA signatures and pinned certificates.

pub mod cert_utils;
mod certificate;
mod errors;
pub mod rsa;

pub use certificate::Certificate;
pub use errors::Error;

use errors::CryptoResult;
use openssl::hash::{Hasher, MessageDigest};

/// Digests used for references, signatures and certificate fingerprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlg {
    /// Only for fingerprints; never accepted as a signature or digest method.
    Sha1,
    Sha256,
}

impl HashAlg {
    pub fn hash(&self, data: impl AsRef<[u8]>) -> CryptoResult<Vec<u8>> {
        let mut hasher = Hasher::new(self.message_digest())?;
        hasher.update(data.as_ref())?;
        Ok(hasher.finish()?.to_vec())
    }

    pub fn output_size(self) -> usize {
        self.message_digest().size()
    }

    fn message_digest(&self) -> MessageDigest {
        match self {
            HashAlg::Sha1 => MessageDigest::sha1(),
            HashAlg::Sha256 => MessageDigest::sha256(),
        }
    }
}

impl From<&HashAlg> for MessageDigest {
    fn from(hash_alg: &HashAlg) -> Self {
        hash_alg.message_digest()
    }
}

/// Lowercase hex SHA-1 of a DER certificate, the form iDEAL puts in `KeyName`.
pub fn fingerprint(der: &[u8]) -> CryptoResult<String> {
    Ok(hex::encode(HashAlg::Sha1.hash(der)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digests() {
        assert_eq!(
            hex::encode(HashAlg::Sha256.hash(b"abc").unwrap()),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(fingerprint(b"abc").unwrap(), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn test_output_size() {
        assert_eq!(HashAlg::Sha1.output_size(), 20);
        assert_eq!(HashAlg::Sha256.output_size(), 32);
        assert_eq!(HashAlg::Sha256.hash(b"").unwrap().len(), 32);
    }
}
