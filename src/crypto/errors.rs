use openssl::error::ErrorStack;
use thiserror::Error;

pub(crate) type CryptoResult<T> = Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Key that is not RSA, or whose modulus size is not accepted
    #[error("Unsupported key: {0}")]
    UnsupportedKey(String),

    #[error("OpenSSL error: {0}")]
    OpenSsl(#[from] ErrorStack),
}
