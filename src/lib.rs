pub mod c14n;
pub mod config;
pub mod constants;
pub mod crypto;
pub mod dsig;
pub mod error;
pub mod keys;
pub mod setup;
pub mod telemetry;
pub mod transforms;
pub mod xml;

pub use dsig::{SignedDocument, ValidationResult, Verified};
pub use error::{Error, Result};
