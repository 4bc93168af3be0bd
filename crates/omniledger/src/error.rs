//! Error types for the ledger.

use omniledger_core::{CoreError, DarcId, InstanceId};
use omniledger_darc::DarcError;
use omniledger_skipchain::ChainError;
use omniledger_store::StoreError;
use omniledger_tx::TxError;
use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Authorization error.
    #[error("darc error: {0}")]
    Darc(#[from] DarcError),

    /// Transaction verification error.
    #[error("transaction error: {0}")]
    Tx(#[from] TxError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Chain-creation error.
    #[error("chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// No document exists for this lineage.
    #[error("darc not found: {0}")]
    DarcNotFound(DarcId),

    /// No contract is registered for this kind.
    #[error("unknown contract kind: {0}")]
    UnknownContract(String),

    /// The contract does not implement this action.
    #[error("contract {contract} does not support {action}")]
    UnsupportedAction { contract: String, action: String },

    /// Instance not found.
    #[error("instance not found: {0}")]
    InstanceNotFound(InstanceId),

    /// Instance already exists.
    #[error("instance already exists: {0}")]
    InstanceExists(InstanceId),

    /// A required argument is missing or malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Transaction exceeds the configured instruction limit.
    #[error("too many instructions: {count} > {max}")]
    TooManyInstructions { count: usize, max: usize },

    /// An instruction exceeds the configured signature limit.
    #[error("instruction {index} carries too many signatures: {count} > {max}")]
    TooManySignatures {
        index: usize,
        count: usize,
        max: usize,
    },

    /// An instruction passed verification but its contract rejected it.
    #[error("instruction {index} failed: {source}")]
    InstructionFailed {
        index: usize,
        #[source]
        source: Box<LedgerError>,
    },
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
