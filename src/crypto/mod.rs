pub mod password;
pub mod token;

pub use password::*;
pub use token::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Token signing secret must be at least {0} bytes")]
    WeakSecret(usize),

    #[error("Malformed token")]
    MalformedToken,

    #[error("Token signature invalid")]
    BadSignature,

    #[error("Token expired")]
    TokenExpired,

    #[error("Encoding failed: {0}")]
    Encoding(String),
}
