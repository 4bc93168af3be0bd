//! # OmniLedger Skipchain
//!
//! The boundary to the chain-creation layer.
//!
//! ## Overview
//!
//! A ledger starts from a genesis block. The caller describes the
//! participating nodes as a [`Roster`] (usually read from a group
//! description file), builds a [`GenesisRequest`] and hands it to a
//! [`ChainService`]. Block proposal and consensus happen behind that trait.

pub mod error;
pub mod messages;
pub mod service;

pub use error::{ChainError, Result};
pub use messages::{GenesisRequest, GenesisResponse, Roster, ServerIdentity, CURRENT_VERSION};
pub use service::{genesis_block_hash, validate_genesis_request, ChainService, MemoryChainService};
