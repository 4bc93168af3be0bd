//! Error types for OmniLedger Core.

use thiserror::Error;

/// Core errors raised by identities, signatures and encoding.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("identity {0} cannot verify signatures directly")]
    UnsupportedIdentity(String),

    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("invalid length: expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
