//! # OmniLedger
//!
//! Transaction admission and authorization for a distributed ledger.
//!
//! ## Overview
//!
//! Every resource on the ledger is addressed by an [`InstanceId`] whose first
//! half names an authorization document (a [`Darc`]). Clients submit
//! [`ClientTransaction`]s: ordered lists of signed [`Instruction`]s that are
//! applied all or nothing. The ledger:
//!
//! - **Orders** a batch of transactions deterministically by content hash
//! - **Verifies** each instruction's signatures against the rule its darc
//!   holds for the requested action
//! - **Dispatches** admitted instructions to the contract for their kind
//! - **Commits** the resulting state changes atomically per transaction
//!
//! ## Key Concepts
//!
//! - **Darc**: a versioned rule set. Changing it means appending a new version
//!   authorized by the current one's `invoke:evolve` rule.
//! - **Genesis**: the first darc is created by an instruction that carries it;
//!   that instruction is checked against the document it creates.
//! - **Default deny**: an action with no rule is refused.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use omniledger::{create_genesis, GenesisConfig, Ledger, LedgerConfig};
//! use omniledger::core::Keypair;
//! use omniledger::skipchain::{MemoryChainService, Roster};
//! use omniledger::store::MemoryDarcStore;
//!
//! async fn example() {
//!     let owner = Keypair::generate();
//!     let roster = Roster::from_group_file("group.toml").unwrap();
//!
//!     // Ask the chain service for a genesis block
//!     let service = MemoryChainService::new();
//!     let (request, _response) =
//!         create_genesis(&service, roster, &owner, GenesisConfig::default())
//!             .await
//!             .unwrap();
//!
//!     // Replay the genesis transaction into a fresh ledger
//!     let ledger = Ledger::new(MemoryDarcStore::new(), LedgerConfig::default());
//!     ledger.apply_transaction(&request.transaction).unwrap();
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `omniledger::core` - Identifiers, keys and canonical encoding
//! - `omniledger::darc` - Authorization documents and rule evaluation
//! - `omniledger::tx` - Instructions, transactions and sorting
//! - `omniledger::store` - Ledger state
//! - `omniledger::skipchain` - Chain-creation boundary

pub mod config;
pub mod contract;
pub mod deploy;
pub mod error;
pub mod genesis;
pub mod ledger;

// Re-export component crates
pub use omniledger_core as core;
pub use omniledger_darc as darc;
pub use omniledger_skipchain as skipchain;
pub use omniledger_store as store;
pub use omniledger_tx as tx;

// Re-export main types for convenience
pub use config::{DeployConfig, GenesisConfig, LedgerConfig};
pub use contract::{
    Contract, ContractContext, ContractRegistry, DarcContract, ValueContract, VALUE_ARGUMENT,
    VALUE_CONTRACT,
};
pub use deploy::{
    build_all, prepare, BuildTarget, Builder, DeployError, Deployment, HostList, HostPair,
    Selection,
};
pub use error::{LedgerError, Result};
pub use genesis::{create_genesis, GenesisBuilder};
pub use ledger::{BatchReport, Ledger, Rejection};

// Re-export commonly used core types
pub use omniledger_core::{Blake3Hash, DarcId, Identity, InstanceId, Keypair, Nonce, Signer, SubId};
pub use omniledger_darc::{Darc, Expression, Rules};
pub use omniledger_tx::{Action, Arguments, ClientTransaction, Instruction};
