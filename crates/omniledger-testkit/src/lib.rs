//! # OmniLedger Testkit
//!
//! Testing utilities for OmniLedger.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Darc ids and instruction payloads from fixed seeds
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Signers, ledgers and rosters for integration tests
//!
//! ## Golden Vectors
//!
//! ```rust
//! use omniledger_testkit::vectors::{all_vectors, output_from_vector};
//!
//! for vector in all_vectors() {
//!     let out = output_from_vector(&vector);
//!     println!("{}: {}", out.name, out.darc_id);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use omniledger_testkit::generators::{instruction_from_params, InstructionParams};
//!
//! proptest! {
//!     #[test]
//!     fn hash_ignores_signatures(params: InstructionParams) {
//!         let mut instruction = instruction_from_params(&params);
//!         let before = instruction.hash();
//!         instruction.signatures.clear();
//!         prop_assert_eq!(before, instruction.hash());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use omniledger_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let (ledger, darc) = fixture.bootstrapped_ledger();
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_party_fixtures, test_roster, TestFixture};
pub use generators::{instruction_from_params, InstructionParams};
pub use vectors::{all_vectors, output_from_vector, verify_all_vectors, GoldenVector};
