//! # OmniLedger Store
//!
//! Ledger state: document lineages and the contract instances they govern.
//!
//! ## Overview
//!
//! The [`DarcStore`] trait abstracts over storage backends. The only backend
//! here is [`MemoryDarcStore`]; it also implements
//! [`omniledger_darc::DarcResolver`] so documents stored in it can be used
//! as delegated identities.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::{check_lineage, MemoryDarcStore};
pub use traits::{DarcStore, InsertResult, InstanceRecord, StateChange};
