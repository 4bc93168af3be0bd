//! Transaction error types.

use omniledger_core::CoreError;
use omniledger_darc::DarcError;
use thiserror::Error;

/// Errors from building, hashing, sorting or verifying transactions.
#[derive(Debug, Error)]
pub enum TxError {
    /// The transaction cannot be hashed or admitted as given.
    #[error("malformed transaction: {0}")]
    MalformedTransaction(String),

    /// One instruction of a transaction failed verification.
    #[error("instruction {index} rejected: {source}")]
    InstructionRejected {
        index: usize,
        #[source]
        source: DarcError,
    },

    #[error("darc error: {0}")]
    Darc(#[from] DarcError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

/// Result type for transaction operations.
pub type Result<T> = std::result::Result<T, TxError>;
