//! In-memory implementation of the DarcStore trait.
//!
//! Everything is lost when the store is dropped. Thread-safe via RwLock.

use std::collections::HashMap;
use std::sync::RwLock;

use omniledger_core::{DarcId, InstanceId};
use omniledger_darc::{Darc, DarcResolver};

use crate::error::{Result, StoreError};
use crate::traits::{DarcStore, InsertResult, InstanceRecord, StateChange};

/// Decide whether `darc` may be appended to a lineage whose stored versions
/// are `history` (oldest first).
pub fn check_lineage(history: &[Darc], darc: &Darc) -> Result<InsertResult> {
    let base_id = darc.base_id();
    let version = darc.version;
    let broken = |reason: &str| StoreError::BrokenLineage {
        base_id,
        version,
        reason: reason.to_string(),
    };

    if let Some(existing) = usize::try_from(version).ok().and_then(|v| history.get(v)) {
        let existing_id = existing.id();
        return Ok(if existing_id == darc.id() {
            InsertResult::AlreadyExists
        } else {
            InsertResult::Conflict {
                existing: existing_id,
            }
        });
    }

    match history.last() {
        None if version == 0 => Ok(InsertResult::Inserted),
        None => Err(broken("lineage has no genesis version")),
        Some(latest) if latest.version + 1 != version => Err(broken("version gap")),
        Some(latest) if darc.prev_id != Some(latest.id()) => {
            Err(broken("previous id does not match latest version"))
        }
        Some(_) => Ok(InsertResult::Inserted),
    }
}

/// In-memory ledger state.
pub struct MemoryDarcStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Clone, Default)]
struct MemoryStoreInner {
    /// Lineages indexed by base id; position equals version.
    darcs: HashMap<DarcId, Vec<Darc>>,

    /// Contract instances.
    instances: HashMap<InstanceId, InstanceRecord>,
}

impl MemoryStoreInner {
    fn insert_darc(&mut self, darc: &Darc) -> Result<InsertResult> {
        let base_id = darc.base_id();
        let history = self.darcs.get(&base_id).map(Vec::as_slice).unwrap_or(&[]);
        let result = check_lineage(history, darc)?;
        if result == InsertResult::Inserted {
            self.darcs.entry(base_id).or_default().push(darc.clone());
        }
        Ok(result)
    }

    fn apply(&mut self, change: &StateChange) -> Result<()> {
        match change {
            StateChange::PutDarc(darc) => match self.insert_darc(darc)? {
                InsertResult::Inserted | InsertResult::AlreadyExists => Ok(()),
                InsertResult::Conflict { existing } => Err(StoreError::Conflict {
                    base_id: darc.base_id(),
                    version: darc.version,
                    existing,
                }),
            },
            StateChange::Create {
                instance_id,
                contract_kind,
                value,
            } => {
                if self.instances.contains_key(instance_id) {
                    return Err(StoreError::InstanceExists(*instance_id));
                }
                self.instances.insert(
                    *instance_id,
                    InstanceRecord {
                        instance_id: *instance_id,
                        contract_kind: contract_kind.clone(),
                        value: value.clone(),
                    },
                );
                Ok(())
            }
            StateChange::Update { instance_id, value } => {
                let record = self
                    .instances
                    .get_mut(instance_id)
                    .ok_or(StoreError::InstanceNotFound(*instance_id))?;
                record.value = value.clone();
                Ok(())
            }
            StateChange::Remove { instance_id } => self
                .instances
                .remove(instance_id)
                .map(|_| ())
                .ok_or(StoreError::InstanceNotFound(*instance_id)),
        }
    }
}

impl MemoryDarcStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    /// Number of stored lineages.
    pub fn lineage_count(&self) -> Result<usize> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(inner.darcs.len())
    }

    /// Number of stored instances.
    pub fn instance_count(&self) -> Result<usize> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(inner.instances.len())
    }
}

impl Default for MemoryDarcStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DarcStore for MemoryDarcStore {
    fn insert_darc(&self, darc: &Darc) -> Result<InsertResult> {
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        inner.insert_darc(darc)
    }

    fn get_darc(&self, base_id: &DarcId, version: u64) -> Result<Option<Darc>> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(inner
            .darcs
            .get(base_id)
            .zip(usize::try_from(version).ok())
            .and_then(|(history, v)| history.get(v))
            .cloned())
    }

    fn get_latest_darc(&self, base_id: &DarcId) -> Result<Option<Darc>> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(inner.darcs.get(base_id).and_then(|h| h.last()).cloned())
    }

    fn darc_history(&self, base_id: &DarcId) -> Result<Vec<Darc>> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(inner.darcs.get(base_id).cloned().unwrap_or_default())
    }

    fn get_instance(&self, id: &InstanceId) -> Result<Option<InstanceRecord>> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(inner.instances.get(id).cloned())
    }

    fn apply_changes(&self, changes: &[StateChange]) -> Result<()> {
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;

        // Stage on a copy so a failing change leaves nothing behind.
        let mut staged = inner.clone();
        for change in changes {
            staged.apply(change)?;
        }
        *inner = staged;

        tracing::debug!(changes = changes.len(), "applied state changes");
        Ok(())
    }
}

impl DarcResolver for MemoryDarcStore {
    fn latest_darc(&self, base_id: &DarcId) -> Option<Darc> {
        self.get_latest_darc(base_id).ok().flatten()
    }
}
