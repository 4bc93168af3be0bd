//! Identities, signers and detached signatures.
//!
//! An [`Identity`] is what authorization rules are written against. Only
//! key-backed identities verify signatures; a `Darc` identity delegates to
//! another document's `_sign` rule and is resolved during rule evaluation.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::crypto::{Ed25519PublicKey, Keypair};
use crate::error::{CoreError, Result};
use crate::types::DarcId;

/// A public identity.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Identity {
    /// An Ed25519 public key.
    Ed25519(Ed25519PublicKey),
    /// Delegation to the `_sign` rule of another document lineage.
    Darc(DarcId),
}

impl Identity {
    const ED25519_PREFIX: &'static str = "ed25519";
    const DARC_PREFIX: &'static str = "darc";

    /// Verify `signature` over `message` against this identity.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<()> {
        match self {
            Identity::Ed25519(pk) => pk.verify(message, signature),
            Identity::Darc(_) => Err(CoreError::UnsupportedIdentity(self.to_string())),
        }
    }

    /// The delegated document, if this is a `Darc` identity.
    pub fn as_darc(&self) -> Option<&DarcId> {
        match self {
            Identity::Darc(id) => Some(id),
            Identity::Ed25519(_) => None,
        }
    }

    /// Bytes fed into canonical encodings: a one-byte tag followed by the key or id.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let (tag, body) = match self {
            Identity::Ed25519(pk) => (0u8, pk.as_bytes()),
            Identity::Darc(id) => (1u8, id.as_bytes()),
        };
        let mut out = Vec::with_capacity(33);
        out.push(tag);
        out.extend_from_slice(body);
        out
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Ed25519(pk) => write!(f, "{}:{}", Self::ED25519_PREFIX, pk.to_hex()),
            Identity::Darc(id) => write!(f, "{}:{}", Self::DARC_PREFIX, id.to_hex()),
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Ed25519(pk) => write!(f, "Identity({:?})", pk),
            Identity::Darc(id) => write!(f, "Identity({:?})", id),
        }
    }
}

impl FromStr for Identity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let (prefix, body) = s
            .split_once(':')
            .ok_or_else(|| CoreError::InvalidIdentity(format!("missing prefix in {s:?}")))?;

        match prefix {
            Self::ED25519_PREFIX => Ed25519PublicKey::from_hex(body)
                .map(Identity::Ed25519)
                .map_err(|e| CoreError::InvalidIdentity(e.to_string())),
            Self::DARC_PREFIX => DarcId::from_hex(body)
                .map(Identity::Darc)
                .map_err(|e| CoreError::InvalidIdentity(e.to_string())),
            other => Err(CoreError::InvalidIdentity(format!("unknown prefix {other:?}"))),
        }
    }
}

impl From<Ed25519PublicKey> for Identity {
    fn from(pk: Ed25519PublicKey) -> Self {
        Identity::Ed25519(pk)
    }
}

/// Something that can sign on behalf of an [`Identity`].
pub trait Signer {
    /// The identity signatures will be checked against.
    fn identity(&self) -> Identity;

    /// Sign the given message.
    fn sign(&self, message: &[u8]) -> Result<Bytes>;
}

impl Signer for Keypair {
    fn identity(&self) -> Identity {
        Identity::Ed25519(self.public_key())
    }

    fn sign(&self, message: &[u8]) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(&Keypair::sign(self, message)))
    }
}

/// A detached signature together with the identity that claims it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub signer: Identity,
    pub signature: Bytes,
}

impl Signature {
    /// Sign `message` with `signer`.
    pub fn create(signer: &dyn Signer, message: &[u8]) -> Result<Self> {
        Ok(Self {
            signer: signer.identity(),
            signature: signer.sign(message)?,
        })
    }

    /// Verify this signature over `message`.
    pub fn verify(&self, message: &[u8]) -> Result<()> {
        self.signer.verify(message, &self.signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_text_roundtrip() {
        let kp = Keypair::from_seed(&[3u8; 32]);
        let id = kp.identity();
        let text = id.to_string();
        assert!(text.starts_with("ed25519:"));
        assert_eq!(text.parse::<Identity>().unwrap(), id);

        let darc = Identity::Darc(DarcId::from_bytes([5; 32]));
        assert_eq!(darc.to_string().parse::<Identity>().unwrap(), darc);
    }

    #[test]
    fn test_identity_parse_errors() {
        assert!("nocolon".parse::<Identity>().is_err());
        assert!("rsa:00".parse::<Identity>().is_err());
        assert!("ed25519:zz".parse::<Identity>().is_err());
    }

    #[test]
    fn test_signature_create_and_verify() {
        let kp = Keypair::generate();
        let sig = Signature::create(&kp, b"payload").unwrap();
        assert_eq!(sig.signer, kp.identity());
        sig.verify(b"payload").unwrap();
        assert!(sig.verify(b"payloaD").is_err());
    }

    #[test]
    fn test_darc_identity_cannot_verify() {
        let id = Identity::Darc(DarcId::ZERO);
        assert!(matches!(
            id.verify(b"m", &[0u8; 64]),
            Err(CoreError::UnsupportedIdentity(_))
        ));
    }

    #[test]
    fn test_canonical_bytes_are_tagged() {
        let pk = Identity::Ed25519(Ed25519PublicKey::from_bytes([1; 32]));
        let darc = Identity::Darc(DarcId::from_bytes([1; 32]));
        assert_eq!(pk.canonical_bytes()[0], 0);
        assert_eq!(darc.canonical_bytes()[0], 1);
        assert_ne!(pk.canonical_bytes(), darc.canonical_bytes());
    }
}
