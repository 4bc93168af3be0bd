//! # OmniLedger Darc
//!
//! Distributed access-right controls: evolvable authorization documents.
//!
//! ## Overview
//!
//! A [`Darc`] maps action names (`spawn:<kind>`, `invoke:<command>`,
//! `delete`, `_sign`) to [`Expression`]s over identities. Access is
//! default-deny: an action without a rule is never allowed.
//!
//! Documents evolve by producing version N+1, which must be authorized by
//! the `invoke:evolve` rule of version N. The id of version 0 names the
//! lineage for its whole life.
//!
//! ## Usage
//!
//! ```rust
//! use omniledger_core::{Keypair, Signer};
//! use omniledger_darc::{Darc, Rules};
//!
//! let owner = Keypair::generate();
//! let darc = Darc::new(Rules::init(&[owner.identity()], &[owner.identity()]), "example");
//! assert!(darc.allows("invoke:evolve", &[owner.identity()]));
//! assert!(!darc.allows("spawn:value", &[owner.identity()]));
//! ```

pub mod darc;
pub mod error;
pub mod expression;
pub mod request;
pub mod rules;

pub use darc::{Darc, DarcResolver, NoResolver, DEFAULT_MAX_DELEGATION_DEPTH};
pub use error::{DarcError, Result};
pub use expression::{Expression, MAX_PARSE_DEPTH};
pub use request::Request;
pub use rules::{invoke_action, spawn_action, Rules, EVOLVE_ACTION, SIGN_ACTION};
