//! Key material loaded once from configuration and then shared read-only.

use std::fs;
use std::path::Path;

use secrecy::ExposeSecret;
use tracing::info;

use crate::config::{Config, KeyInfoStyle, SigningConfig, VerificationConfig};
use crate::crypto::Certificate;
use crate::crypto::rsa::RsaPrivateKey;
use crate::error::{Error, Result};

/// The merchant's private key together with its own certificate.
#[derive(Debug, Clone)]
pub struct SigningKey {
    private_key: RsaPrivateKey,
    certificate: Certificate,
    key_info: KeyInfoStyle,
}

impl SigningKey {
    /// Pair a private key with its certificate.
    ///
    /// Fails when the certificate does not carry the key's public half.
    pub fn new(private_key: RsaPrivateKey, certificate: Certificate) -> Result<Self> {
        if !private_key.matches(certificate.public_key()) {
            return Err(Error::Key(format!(
                "private key does not match certificate {}",
                certificate.fingerprint()
            )));
        }
        Ok(Self {
            private_key,
            certificate,
            key_info: KeyInfoStyle::default(),
        })
    }

    pub fn with_key_info(mut self, key_info: KeyInfoStyle) -> Self {
        self.key_info = key_info;
        self
    }

    pub fn from_config(config: &SigningConfig) -> Result<Self> {
        let pem = read_file(&config.private_key_path)?;
        let private_key = match &config.private_key_passphrase {
            Some(passphrase) => {
                RsaPrivateKey::from_pem_with_passphrase(&pem, passphrase.expose_secret())
            }
            None => RsaPrivateKey::from_pem(&pem),
        }
        .map_err(|e| {
            Error::Key(format!(
                "cannot load private key {}: {e}",
                config.private_key_path.display()
            ))
        })?;
        let certificate = load_certificate(&config.certificate_path)?;

        Ok(Self::new(private_key, certificate)?.with_key_info(config.key_info))
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    pub fn key_info(&self) -> KeyInfoStyle {
        self.key_info
    }
}

/// All keys one configured instance works with.
#[derive(Debug, Clone)]
pub struct KeyMaterial {
    pub signing: Option<SigningKey>,
    pub verification: Option<Certificate>,
}

impl KeyMaterial {
    /// Load and parse every configured key up front.
    pub fn from_config(config: &Config) -> Result<Self> {
        let signing = config
            .signing
            .as_ref()
            .map(SigningKey::from_config)
            .transpose()?;
        let verification = config
            .verification
            .as_ref()
            .map(|VerificationConfig { certificate_path }| load_certificate(certificate_path))
            .transpose()?;

        if let Some(key) = &signing {
            info!(fingerprint = key.certificate().fingerprint(), "Loaded signing key");
        }
        if let Some(cert) = &verification {
            info!(fingerprint = cert.fingerprint(), "Loaded verification certificate");
        }

        Ok(Self {
            signing,
            verification,
        })
    }

    pub fn signing_key(&self) -> Result<&SigningKey> {
        self.signing
            .as_ref()
            .ok_or_else(|| Error::Key("no signing key configured".to_string()))
    }

    pub fn verification_certificate(&self) -> Result<&Certificate> {
        self.verification
            .as_ref()
            .ok_or_else(|| Error::Key("no verification certificate configured".to_string()))
    }
}

/// Load a PEM certificate, falling back to DER.
pub fn load_certificate(path: &Path) -> Result<Certificate> {
    let bytes = read_file(path)?;
    Certificate::from_pem(&bytes)
        .or_else(|_| Certificate::from_der(&bytes))
        .map_err(|e| Error::Key(format!("cannot load certificate {}: {e}", path.display())))
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path)
        .map_err(|e| Error::Key(format!("cannot read {}: {e}", path.display())))
}
