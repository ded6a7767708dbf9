use crate::config::Config;
use crate::keys::KeyMaterial;
use color_eyre::eyre::{Context, eyre};

/// Load the configured keys, failing before any document is processed.
pub fn load_key_material(config: &Config) -> color_eyre::Result<KeyMaterial> {
    if config.signing.is_none() && config.verification.is_none() {
        return Err(eyre!(
            "Neither a signing key nor a verification certificate is configured"
        ));
    }

    let material = KeyMaterial::from_config(config).wrap_err("Failed to load key material")?;

    if material.signing.is_none() {
        tracing::info!("No signing key configured, documents can only be verified.");
    }
    if material.verification.is_none() {
        tracing::info!("No verification certificate configured, documents can only be signed.");
    }
    Ok(material)
}
