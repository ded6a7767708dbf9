#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;

use ideal_xmldsig::config::Config;
use ideal_xmldsig::crypto::cert_utils::{TestIdentity, generate_test_certificate};
use ideal_xmldsig::keys::KeyMaterial;
use ideal_xmldsig::telemetry::init_tracing;
use regex::Regex;
use tempfile::TempDir;

pub const TRANSACTION_REQUEST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<AcquirerTrxReq xmlns="http://www.idealdesk.com/ideal/messages/mer-acq/3.3.1" version="3.3.1">
  <createDateTimestamp>2011-11-28T16:30:00.000Z</createDateTimestamp>
  <Issuer>
    <issuerID>INGBNL2A</issuerID>
  </Issuer>
  <Merchant>
    <merchantID>002054205</merchantID>
    <subID>0</subID>
    <merchantReturnURL>https://example.com/return?a=1&amp;b=2</merchantReturnURL>
  </Merchant>
  <Transaction>
    <purchaseID>purchase-42</purchaseID>
    <amount>10.00</amount>
    <currency>EUR</currency>
    <expirationPeriod>PT1H</expirationPeriod>
    <language>nl</language>
    <description>Order 42</description>
    <entranceCode>ec42</entranceCode>
  </Transaction>
  <Signature xmlns="http://www.w3.org/2000/09/xmldsig#"/>
</AcquirerTrxReq>"#;

/// Key files for a merchant and an acquirer written to a temporary directory.
pub struct KeyFixture {
    pub dir: TempDir,
    pub merchant: TestIdentity,
    pub acquirer: TestIdentity,
}

impl KeyFixture {
    pub fn new() -> Self {
        init_tracing();
        let dir = TempDir::new().unwrap();
        let merchant = generate_test_certificate("merchant").unwrap();
        let acquirer = generate_test_certificate("acquirer").unwrap();

        fs::write(dir.path().join("merchant.key"), &merchant.private_key_pem).unwrap();
        fs::write(dir.path().join("merchant.pem"), &merchant.certificate_pem).unwrap();
        fs::write(dir.path().join("acquirer.key"), &acquirer.private_key_pem).unwrap();
        fs::write(dir.path().join("acquirer.pem"), &acquirer.certificate_pem).unwrap();

        Self {
            dir,
            merchant,
            acquirer,
        }
    }

    fn path(&self, name: &str) -> String {
        self.dir.path().join(name).to_string_lossy().to_string()
    }

    /// Configuration signing as `signer` and verifying against `verifier`.
    pub fn config(&self, signer: &str, verifier: &str) -> Config {
        let mut vars = HashMap::new();
        vars.insert(
            "signing.private_key_path".to_string(),
            self.path(&format!("{signer}.key")),
        );
        vars.insert(
            "signing.certificate_path".to_string(),
            self.path(&format!("{signer}.pem")),
        );
        vars.insert(
            "verification.certificate_path".to_string(),
            self.path(&format!("{verifier}.pem")),
        );
        Config::load_with_sources(Some(vars)).unwrap()
    }

    pub fn key_material(&self, signer: &str, verifier: &str) -> KeyMaterial {
        KeyMaterial::from_config(&self.config(signer, verifier)).unwrap()
    }
}

/// Text content of the first `<name>` element in serialized XML.
pub fn extract(xml: &str, name: &str) -> String {
    let pattern = Regex::new(&format!(r"<(?:\w+:)?{name}>([^<]*)</(?:\w+:)?{name}>")).unwrap();
    pattern
        .captures(xml)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| panic!("no <{name}> element in {xml}"))
}
