//! DarcStore trait: the abstract interface for ledger state.
//!
//! Ledger state is two things: the version history of every document
//! lineage, and the contract instances living under those documents.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use omniledger_core::{DarcId, InstanceId};
use omniledger_darc::Darc;

use crate::error::Result;

/// Result of inserting a darc version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertResult {
    /// Version was inserted.
    Inserted,
    /// The exact same version already exists (idempotent, not an error).
    AlreadyExists,
    /// A different darc exists at the same lineage position.
    Conflict {
        /// Id of the version already stored.
        existing: DarcId,
    },
}

/// A contract instance stored under a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub instance_id: InstanceId,
    pub contract_kind: String,
    pub value: Bytes,
}

impl InstanceRecord {
    /// The document governing this instance.
    pub fn darc_id(&self) -> &DarcId {
        &self.instance_id.darc_id
    }
}

/// One state mutation produced by executing an instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateChange {
    /// Append a darc version to its lineage.
    PutDarc(Darc),
    /// Create a new instance.
    Create {
        instance_id: InstanceId,
        contract_kind: String,
        value: Bytes,
    },
    /// Replace the value of an existing instance.
    Update { instance_id: InstanceId, value: Bytes },
    /// Remove an existing instance.
    Remove { instance_id: InstanceId },
}

/// Synchronous interface to ledger state.
///
/// # Design Notes
///
/// - **Idempotent inserts**: inserting the same darc version twice returns `AlreadyExists`.
/// - **Linear lineages**: version N is accepted only on top of version N-1,
///   and only if its `prev_id` names that version.
/// - **Atomic changes**: [`apply_changes`](Self::apply_changes) applies every change or none.
pub trait DarcStore: Send + Sync {
    /// Insert a darc version.
    fn insert_darc(&self, darc: &Darc) -> Result<InsertResult>;

    /// A specific version of a lineage.
    fn get_darc(&self, base_id: &DarcId, version: u64) -> Result<Option<Darc>>;

    /// The newest version of a lineage.
    fn get_latest_darc(&self, base_id: &DarcId) -> Result<Option<Darc>>;

    /// Every version of a lineage, oldest first.
    fn darc_history(&self, base_id: &DarcId) -> Result<Vec<Darc>>;

    /// A stored instance.
    fn get_instance(&self, id: &InstanceId) -> Result<Option<InstanceRecord>>;

    /// Apply a list of changes atomically.
    fn apply_changes(&self, changes: &[StateChange]) -> Result<()>;
}
