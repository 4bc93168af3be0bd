//! Error types for the chain-creation collaborator.

use thiserror::Error;

/// Errors that can occur while assembling or submitting a genesis request.
#[derive(Debug, Error)]
pub enum ChainError {
    /// The roster lists no servers.
    #[error("empty roster")]
    EmptyRoster,

    /// Group description could not be parsed.
    #[error("invalid group description: {0}")]
    InvalidGroup(String),

    /// Requested protocol version is not supported.
    #[error("unsupported protocol version: got={got}, supported={supported}")]
    UnsupportedVersion { got: u32, supported: u32 },

    /// The request is structurally wrong.
    #[error("invalid genesis request: {0}")]
    InvalidRequest(String),

    /// The genesis transaction failed verification.
    #[error("genesis transaction rejected: {0}")]
    Transaction(#[from] omniledger_tx::TxError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for chain operations.
pub type Result<T> = std::result::Result<T, ChainError>;
