//! The Ledger: admission and execution of client transactions.
//!
//! Every instruction is verified against the current version of the
//! document named by its instance id, dispatched to its contract, and the
//! resulting changes are staged. A transaction commits only if all of its
//! instructions succeed.
//!
//! Execution and commit of one transaction happen under a single lock, so a
//! transaction is always checked against the state it commits onto.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use omniledger_core::{Blake3Hash, DarcId, InstanceId};
use omniledger_darc::{Darc, DarcResolver};
use omniledger_store::{
    check_lineage, DarcStore, InsertResult, InstanceRecord, StateChange, StoreError,
};
use omniledger_tx::{sort_transactions, Action, ClientTransaction, Instruction, TxError};

use crate::config::LedgerConfig;
use crate::contract::{ContractContext, ContractRegistry};
use crate::error::{LedgerError, Result};

/// Outcome of one transaction in a batch.
#[derive(Debug)]
pub struct Rejection {
    /// Hash of the rejected transaction; `None` if it could not be hashed.
    pub tx_hash: Option<Blake3Hash>,
    pub error: LedgerError,
}

/// Result of processing a batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Hashes of committed transactions, in execution order.
    pub accepted: Vec<Blake3Hash>,
    pub rejected: Vec<Rejection>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// The ledger.
pub struct Ledger<S: DarcStore> {
    store: Arc<S>,
    contracts: ContractRegistry,
    config: LedgerConfig,
    commit: Mutex<()>,
}

impl<S: DarcStore> Ledger<S> {
    /// Create a ledger with the built-in contracts.
    pub fn new(store: S, config: LedgerConfig) -> Self {
        Self::with_contracts(store, ContractRegistry::with_defaults(), config)
    }

    pub fn with_contracts(store: S, contracts: ContractRegistry, config: LedgerConfig) -> Self {
        Self {
            store: Arc::new(store),
            contracts,
            config,
            commit: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn contracts_mut(&mut self) -> &mut ContractRegistry {
        &mut self.contracts
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Query Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// The current version of a document lineage.
    pub fn latest_darc(&self, base_id: &DarcId) -> Result<Option<Darc>> {
        Ok(self.store.get_latest_darc(base_id)?)
    }

    /// Every version of a document lineage, oldest first.
    pub fn darc_history(&self, base_id: &DarcId) -> Result<Vec<Darc>> {
        Ok(self.store.darc_history(base_id)?)
    }

    pub fn get_instance(&self, id: &InstanceId) -> Result<Option<InstanceRecord>> {
        Ok(self.store.get_instance(id)?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Admission
    // ─────────────────────────────────────────────────────────────────────────

    /// The document an instruction is checked against.
    ///
    /// This is the latest version of the instance's darc. If that lineage does
    /// not exist yet, a Spawn of `darc` carrying its own genesis version is
    /// checked against the document it creates.
    pub fn authorizing_darc(&self, instruction: &Instruction) -> Result<Darc> {
        let staging = Staging::new(self.store.as_ref());
        self.resolve_authority(instruction, &staging)
            .map(|(darc, _)| darc)
    }

    /// [`authorizing_darc`](Self::authorizing_darc) over staged state; the flag
    /// is set when the genesis path was taken.
    fn resolve_authority(
        &self,
        instruction: &Instruction,
        staged: &Staging<'_, S>,
    ) -> Result<(Darc, bool)> {
        let darc_id = instruction.instance_id.darc_id;
        if let Some(darc) = staged.current_darc(&darc_id)? {
            return Ok((darc, false));
        }
        instruction
            .genesis_darc()
            .map(|darc| (darc, true))
            .ok_or(LedgerError::DarcNotFound(darc_id))
    }

    /// Run the whole transaction without committing; returns the changes it would make.
    pub fn verify_transaction(&self, tx: &ClientTransaction) -> Result<Vec<StateChange>> {
        let mut staging = Staging::new(self.store.as_ref());
        self.execute(tx, &mut staging)?;
        Ok(staging.changes)
    }

    /// Verify and execute a transaction, committing all of its changes or none.
    pub fn apply_transaction(&self, tx: &ClientTransaction) -> Result<Blake3Hash> {
        let hash = tx.hash()?;
        let _commit = self.commit.lock().map_err(|_| StoreError::LockPoisoned)?;
        let mut staging = Staging::new(self.store.as_ref());

        match self.execute(tx, &mut staging) {
            Ok(()) => {
                self.store.apply_changes(&staging.changes)?;
                info!(
                    tx = %hash,
                    instructions = tx.len(),
                    changes = staging.changes.len(),
                    "transaction accepted"
                );
                Ok(hash)
            }
            Err(e) => {
                warn!(tx = %hash, error = %e, "transaction rejected");
                Err(e)
            }
        }
    }

    /// Sort a batch into canonical order and apply each transaction.
    ///
    /// A rejected transaction is recorded and processing continues.
    pub fn process_batch(&self, txs: Vec<ClientTransaction>) -> Result<BatchReport> {
        let mut report = BatchReport::default();

        let (mut admissible, empty): (Vec<_>, Vec<_>) =
            txs.into_iter().partition(|tx| !tx.is_empty());
        for _ in empty {
            report.rejected.push(Rejection {
                tx_hash: None,
                error: TxError::MalformedTransaction("transaction has no instructions".into())
                    .into(),
            });
        }

        sort_transactions(&mut admissible)?;
        debug!(count = admissible.len(), "processing sorted batch");

        for tx in &admissible {
            match self.apply_transaction(tx) {
                Ok(hash) => report.accepted.push(hash),
                Err(error) => report.rejected.push(Rejection {
                    tx_hash: tx.hash().ok(),
                    error,
                }),
            }
        }

        info!(
            accepted = report.accepted.len(),
            rejected = report.rejected.len(),
            "batch processed"
        );
        Ok(report)
    }

    fn execute(&self, tx: &ClientTransaction, staging: &mut Staging<'_, S>) -> Result<()> {
        if tx.is_empty() {
            return Err(
                TxError::MalformedTransaction("transaction has no instructions".into()).into(),
            );
        }
        let max = self.config.max_instructions_per_transaction;
        if tx.len() > max {
            return Err(LedgerError::TooManyInstructions {
                count: tx.len(),
                max,
            });
        }

        for (index, instruction) in tx.instructions.iter().enumerate() {
            self.execute_instruction(index, instruction, staging)?;
        }
        Ok(())
    }

    fn execute_instruction(
        &self,
        index: usize,
        instruction: &Instruction,
        staging: &mut Staging<'_, S>,
    ) -> Result<()> {
        let count = instruction.signatures.len();
        let max = self.config.max_signatures_per_instruction;
        if count > max {
            return Err(LedgerError::TooManySignatures { index, count, max });
        }

        let failed = |e: LedgerError| LedgerError::InstructionFailed {
            index,
            source: Box::new(e),
        };

        let (darc, genesis) = self.resolve_authority(instruction, staging).map_err(failed)?;

        if self.config.verify_signatures {
            let verified = if genesis {
                instruction.verify_genesis(&darc)
            } else {
                instruction.verify_with(&darc, staging, self.config.max_delegation_depth)
            };
            verified.map_err(|source| TxError::InstructionRejected { index, source })?;
        }

        let instance = staging.instance(&instruction.instance_id)?;
        let kind = match (&instruction.action, &instance) {
            (Action::Spawn { contract_kind, .. }, _) => contract_kind.clone(),
            (_, Some(record)) => record.contract_kind.clone(),
            (_, None) => return Err(failed(LedgerError::InstanceNotFound(instruction.instance_id))),
        };
        let contract = self
            .contracts
            .get(&kind)
            .ok_or_else(|| failed(LedgerError::UnknownContract(kind.clone())))?;

        let ctx = ContractContext {
            darc: &darc,
            instance: instance.as_ref(),
        };
        let changes = contract.execute(&ctx, instruction).map_err(failed)?;

        debug!(
            index,
            action = %instruction.action_name(),
            instance = %instruction.instance_id,
            changes = changes.len(),
            "instruction executed"
        );
        for change in changes {
            staging.stage(change).map_err(failed)?;
        }
        Ok(())
    }
}

/// Uncommitted changes layered over a store.
struct Staging<'a, S: DarcStore> {
    store: &'a S,
    darcs: HashMap<DarcId, Vec<Darc>>,
    instances: HashMap<InstanceId, Option<InstanceRecord>>,
    changes: Vec<StateChange>,
}

impl<'a, S: DarcStore> Staging<'a, S> {
    fn new(store: &'a S) -> Self {
        Self {
            store,
            darcs: HashMap::new(),
            instances: HashMap::new(),
            changes: Vec::new(),
        }
    }

    /// Latest darc version including staged ones.
    fn current_darc(&self, base_id: &DarcId) -> Result<Option<Darc>> {
        if let Some(latest) = self.darcs.get(base_id).and_then(|v| v.last()) {
            return Ok(Some(latest.clone()));
        }
        Ok(self.store.get_latest_darc(base_id)?)
    }

    /// Instance state including staged changes.
    fn instance(&self, id: &InstanceId) -> Result<Option<InstanceRecord>> {
        match self.instances.get(id) {
            Some(staged) => Ok(staged.clone()),
            None => Ok(self.store.get_instance(id)?),
        }
    }

    fn stage(&mut self, change: StateChange) -> Result<()> {
        match &change {
            StateChange::PutDarc(darc) => {
                let base_id = darc.base_id();
                let mut history = self.store.darc_history(&base_id)?;
                if let Some(staged) = self.darcs.get(&base_id) {
                    history.extend(staged.iter().cloned());
                }
                match check_lineage(&history, darc)? {
                    InsertResult::Inserted => {
                        self.darcs.entry(base_id).or_default().push(darc.clone())
                    }
                    InsertResult::AlreadyExists => {}
                    InsertResult::Conflict { existing } => {
                        return Err(StoreError::Conflict {
                            base_id,
                            version: darc.version,
                            existing,
                        }
                        .into())
                    }
                }
            }
            StateChange::Create {
                instance_id,
                contract_kind,
                value,
            } => {
                if self.instance(instance_id)?.is_some() {
                    return Err(LedgerError::InstanceExists(*instance_id));
                }
                self.instances.insert(
                    *instance_id,
                    Some(InstanceRecord {
                        instance_id: *instance_id,
                        contract_kind: contract_kind.clone(),
                        value: value.clone(),
                    }),
                );
            }
            StateChange::Update { instance_id, value } => {
                let mut record = self
                    .instance(instance_id)?
                    .ok_or(LedgerError::InstanceNotFound(*instance_id))?;
                record.value = value.clone();
                self.instances.insert(*instance_id, Some(record));
            }
            StateChange::Remove { instance_id } => {
                if self.instance(instance_id)?.is_none() {
                    return Err(LedgerError::InstanceNotFound(*instance_id));
                }
                self.instances.insert(*instance_id, None);
            }
        }
        self.changes.push(change);
        Ok(())
    }
}

impl<S: DarcStore> DarcResolver for Staging<'_, S> {
    fn latest_darc(&self, base_id: &DarcId) -> Option<Darc> {
        self.current_darc(base_id).ok().flatten()
    }
}
