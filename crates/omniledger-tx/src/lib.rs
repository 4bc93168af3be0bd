//! # OmniLedger Transactions
//!
//! Instructions, client transactions and their canonical ordering.
//!
//! ## Key Types
//!
//! - [`Instruction`] - One signed action on one instance
//! - [`ClientTransaction`] - Instructions that succeed or fail together
//! - [`sort_transactions`] - Content-derived total order over transactions
//!
//! An instruction is signed over [`Instruction::to_signed_payload`] and
//! verified against the document named by the darc part of its instance id.

pub mod error;
pub mod genesis;
pub mod instruction;
pub mod sort;
pub mod transaction;

pub use error::{Result, TxError};
pub use genesis::{DARC_ARGUMENT, DARC_CONTRACT};
pub use instruction::{Action, Argument, Arguments, Instruction, DELETE_ACTION};
pub use sort::{sort_transactions, sorted};
pub use transaction::ClientTransaction;
