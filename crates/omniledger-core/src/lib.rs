//! # OmniLedger Core
//!
//! Pure primitives shared by every OmniLedger crate: identities and
//! signatures, ledger addressing, and the canonical encoding that all
//! hashes and signed payloads are computed over.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`Identity`] - A public identity that can verify signatures
//! - [`Signer`] - Anything that can produce signatures for an identity
//! - [`DarcId`], [`SubId`], [`InstanceId`] - Addressing of ledger-resident objects
//! - [`Nonce`] - Replay-protection value carried by instructions
//!
//! ## Canonicalization
//!
//! Hashed and signed bytes are encoded as deterministic CBOR. See [`canonical`].

pub mod canonical;
pub mod crypto;
pub mod error;
pub mod identity;
pub mod types;

pub use canonical::{encode_canonical, from_cbor, to_cbor};
pub use crypto::{Blake3Hash, Ed25519PublicKey, Keypair, SIGNATURE_LEN};
pub use error::{CoreError, Result};
pub use identity::{Identity, Signature, Signer};
pub use types::{DarcId, InstanceId, Nonce, SubId};
