use std::collections::HashMap;
use std::path::PathBuf;

use config::{Config as ConfigLib, ConfigError, Environment, File};
use secrecy::SecretString;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub signing: Option<SigningConfig>,
    #[serde(default)]
    pub verification: Option<VerificationConfig>,
}

/// Where to find the merchant's own key and certificate.
#[derive(Debug, Clone, Deserialize)]
pub struct SigningConfig {
    pub private_key_path: PathBuf,
    #[serde(default)]
    pub private_key_passphrase: Option<SecretString>,
    pub certificate_path: PathBuf,
    #[serde(default)]
    pub key_info: KeyInfoStyle,
}

/// The pinned certificate used to check the acquirer's signatures.
#[derive(Debug, Clone, Deserialize)]
pub struct VerificationConfig {
    pub certificate_path: PathBuf,
}

/// How the signer identifies its certificate inside `KeyInfo`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyInfoStyle {
    /// `KeyName` holding the certificate fingerprint.
    #[default]
    KeyName,
    /// `X509Data/X509Certificate` holding the base64 DER certificate.
    X509Data,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_sources(None)
    }

    pub fn load_with_sources(
        env_vars: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder =
            ConfigLib::builder().add_source(File::with_name("config/settings").required(false));

        // Explicit overrides replace the process environment so tests stay isolated
        if let Some(vars) = env_vars {
            for (key, value) in vars {
                builder = builder.set_override(&key, value)?;
            }
        } else {
            // e.g. APP_SIGNING__PRIVATE_KEY_PATH or APP_VERIFICATION__CERTIFICATE_PATH
            builder = builder.add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );
        }

        builder.build()?.try_deserialize()
    }
}
