//! Error types for Darc evaluation and evolution.

use omniledger_core::{DarcId, Identity};
use thiserror::Error;

/// Errors that can occur while evaluating or evolving a Darc.
#[derive(Debug, Error)]
pub enum DarcError {
    /// The action has no rule; access is denied.
    #[error("rule not found: {action}")]
    RuleNotFound { action: String },

    /// A rule with this action already exists.
    #[error("rule already exists: {action}")]
    RuleExists { action: String },

    /// The rule exists but the presented identities do not satisfy it.
    #[error("unauthorized: identities do not satisfy {action} of darc {base_id}")]
    Unauthorized { action: String, base_id: DarcId },

    /// A signature failed verification.
    #[error("bad signature at index {index} from {signer}")]
    BadSignature { index: usize, signer: Identity },

    /// A version bump was not authorized by the current version.
    #[error("evolution of darc {base_id} to version {version} denied: {reason}")]
    EvolutionDenied {
        base_id: DarcId,
        version: u64,
        reason: String,
    },

    /// A request was checked against a document of a different lineage.
    #[error("request for darc {expected} checked against darc {got}")]
    WrongDarc { expected: DarcId, got: DarcId },

    /// Expression is structurally invalid.
    #[error("invalid expression: {0}")]
    InvalidExpression(String),

    /// Document shape is invalid (version, base or back-reference).
    #[error("invalid darc: {0}")]
    InvalidDarc(String),

    /// Core error.
    #[error("core error: {0}")]
    Core(#[from] omniledger_core::CoreError),
}

/// Result type for Darc operations.
pub type Result<T> = std::result::Result<T, DarcError>;
