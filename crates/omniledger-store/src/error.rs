//! Error types for the store module.

use omniledger_core::{DarcId, InstanceId};
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    LockPoisoned,

    /// A darc version does not extend the stored lineage.
    #[error("darc {base_id} version {version} does not extend lineage: {reason}")]
    BrokenLineage {
        base_id: DarcId,
        version: u64,
        reason: String,
    },

    /// A different darc is already stored at this lineage position.
    #[error("conflict at darc {base_id} version {version}: existing {existing}")]
    Conflict {
        base_id: DarcId,
        version: u64,
        existing: DarcId,
    },

    /// Create targeted an instance that already exists.
    #[error("instance already exists: {0}")]
    InstanceExists(InstanceId),

    /// Update or remove targeted a missing instance.
    #[error("instance not found: {0}")]
    InstanceNotFound(InstanceId),

    /// Stored data failed to decode.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
