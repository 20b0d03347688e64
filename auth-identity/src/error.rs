use thiserror::Error;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Password hashing failed")]
    Hashing,

    #[error("Stored password digest is malformed")]
    MalformedDigest,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token signing failed: {0}")]
    TokenSigning(String),
}

pub type Result<T> = std::result::Result<T, IdentityError>;
