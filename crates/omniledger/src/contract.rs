//! Contracts: what an admitted instruction does to ledger state.
//!
//! Instructions are dispatched by contract kind. A Spawn names its kind
//! directly; Invoke and Delete use the kind recorded on the target
//! instance. A contract only computes [`StateChange`]s, the ledger decides
//! whether to commit them.

use std::collections::HashMap;

use bytes::Bytes;

use omniledger_darc::Darc;
use omniledger_store::{InstanceRecord, StateChange};
use omniledger_tx::{Action, Instruction, DARC_ARGUMENT, DARC_CONTRACT};

use crate::error::{LedgerError, Result};

/// Contract kind of plain key/value instances.
pub const VALUE_CONTRACT: &str = "value";

/// Argument carrying the value of a `value` instance.
pub const VALUE_ARGUMENT: &str = "value";

/// What a contract sees when executing an instruction.
#[derive(Debug, Clone, Copy)]
pub struct ContractContext<'a> {
    /// The document that authorized the instruction.
    pub darc: &'a Darc,
    /// The target instance, if it exists.
    pub instance: Option<&'a InstanceRecord>,
}

/// Executes instructions of one contract kind.
pub trait Contract: Send + Sync {
    fn execute(&self, ctx: &ContractContext<'_>, instruction: &Instruction)
        -> Result<Vec<StateChange>>;
}

/// Contract kinds mapped to their implementations.
pub struct ContractRegistry {
    contracts: HashMap<String, Box<dyn Contract>>,
}

impl ContractRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self {
            contracts: HashMap::new(),
        }
    }

    /// A registry with the built-in `darc` and `value` contracts.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(DARC_CONTRACT, DarcContract);
        registry.register(VALUE_CONTRACT, ValueContract);
        registry
    }

    /// Register (or replace) the contract for `kind`.
    pub fn register(&mut self, kind: impl Into<String>, contract: impl Contract + 'static) {
        self.contracts.insert(kind.into(), Box::new(contract));
    }

    pub fn get(&self, kind: &str) -> Option<&dyn Contract> {
        self.contracts.get(kind).map(|c| c.as_ref())
    }

    /// Registered kinds, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.contracts.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

impl Default for ContractRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn required_arg<'a>(instruction: &'a Instruction, name: &str) -> Result<&'a Bytes> {
    instruction
        .action
        .args()
        .and_then(|args| args.search(name))
        .ok_or_else(|| LedgerError::InvalidArgument(format!("missing argument {name:?}")))
}

fn decode_darc(instruction: &Instruction) -> Result<Darc> {
    let bytes = required_arg(instruction, DARC_ARGUMENT)?;
    let darc = Darc::from_bytes(bytes)
        .map_err(|e| LedgerError::InvalidArgument(format!("undecodable darc: {e}")))?;
    darc.verify_structure()?;
    Ok(darc)
}

fn unsupported(contract: &str, instruction: &Instruction) -> LedgerError {
    LedgerError::UnsupportedAction {
        contract: contract.to_string(),
        action: instruction.action_name(),
    }
}

/// Authorization documents as ledger instances.
///
/// A darc instance lives under its own lineage: it is spawned at an id whose
/// darc part is the new document's base id, and evolved by `invoke:evolve`
/// carrying the next version in argument `darc`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DarcContract;

impl Contract for DarcContract {
    fn execute(
        &self,
        ctx: &ContractContext<'_>,
        instruction: &Instruction,
    ) -> Result<Vec<StateChange>> {
        let instance_id = instruction.instance_id;
        match &instruction.action {
            Action::Spawn { .. } => {
                if ctx.instance.is_some() {
                    return Err(LedgerError::InstanceExists(instance_id));
                }
                let darc = decode_darc(instruction)?;
                if darc.version != 0 {
                    return Err(LedgerError::InvalidArgument(format!(
                        "spawned darc has version {}",
                        darc.version
                    )));
                }
                if darc.base_id() != instance_id.darc_id {
                    return Err(LedgerError::InvalidArgument(
                        "darc must be spawned under its own id".into(),
                    ));
                }
                let value = Bytes::from(darc.to_bytes()?);
                Ok(vec![
                    StateChange::PutDarc(darc),
                    StateChange::Create {
                        instance_id,
                        contract_kind: DARC_CONTRACT.to_string(),
                        value,
                    },
                ])
            }
            Action::Invoke { command, .. } if command == "evolve" => {
                if ctx.instance.is_none() {
                    return Err(LedgerError::InstanceNotFound(instance_id));
                }
                let next = decode_darc(instruction)?;
                ctx.darc.verify_link(&next)?;
                let value = Bytes::from(next.to_bytes()?);
                Ok(vec![
                    StateChange::PutDarc(next),
                    StateChange::Update { instance_id, value },
                ])
            }
            _ => Err(unsupported(DARC_CONTRACT, instruction)),
        }
    }
}

/// Opaque values: spawn with `value`, `invoke:update` to replace, delete to remove.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueContract;

impl Contract for ValueContract {
    fn execute(
        &self,
        ctx: &ContractContext<'_>,
        instruction: &Instruction,
    ) -> Result<Vec<StateChange>> {
        let instance_id = instruction.instance_id;
        match (&instruction.action, ctx.instance) {
            (Action::Spawn { .. }, Some(_)) => Err(LedgerError::InstanceExists(instance_id)),
            (Action::Spawn { .. }, None) => Ok(vec![StateChange::Create {
                instance_id,
                contract_kind: VALUE_CONTRACT.to_string(),
                value: required_arg(instruction, VALUE_ARGUMENT)?.clone(),
            }]),
            (_, None) => Err(LedgerError::InstanceNotFound(instance_id)),
            (Action::Invoke { command, .. }, Some(_)) if command == "update" => {
                Ok(vec![StateChange::Update {
                    instance_id,
                    value: required_arg(instruction, VALUE_ARGUMENT)?.clone(),
                }])
            }
            (Action::Delete, Some(_)) => Ok(vec![StateChange::Remove { instance_id }]),
            _ => Err(unsupported(VALUE_CONTRACT, instruction)),
        }
    }
}
