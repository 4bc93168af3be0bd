//! Addresses on the ledger: document ids, sub ids, nonces and the instance
//! ids composed from them.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

macro_rules! id32 {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            pub const fn from_bytes(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            pub const fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
                let mut raw = [0u8; 32];
                hex::decode_to_slice(s, &mut raw)?;
                Ok(Self(raw))
            }

            pub fn random() -> Self {
                let mut raw = [0u8; 32];
                rand::thread_rng().fill_bytes(&mut raw);
                Self(raw)
            }

            /// Copy a label into a zeroed array, truncating at 32 bytes.
            pub fn from_label(label: &str) -> Self {
                let mut arr = [0u8; 32];
                let bytes = label.as_bytes();
                let len = bytes.len().min(32);
                arr[..len].copy_from_slice(&bytes[..len]);
                Self(arr)
            }

            pub const ZERO: Self = Self([0u8; 32]);
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), &self.to_hex()[..16])
            }
        }

        /// First eight bytes, enough to tell ids apart in logs.
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0[..8].iter().try_for_each(|b| write!(f, "{b:02x}"))
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }

        impl TryFrom<&[u8]> for $name {
            type Error = CoreError;

            fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
                let arr: [u8; 32] = slice.try_into().map_err(|_| CoreError::InvalidLength {
                    expected: 32,
                    got: slice.len(),
                })?;
                Ok(Self(arr))
            }
        }
    };
}

id32!(
    /// Identifier of an authorization document lineage.
    ///
    /// This is the content hash of the document's genesis version (version 0)
    /// and never changes as the document evolves.
    DarcId
);

id32!(
    /// Sub-identifier of an instance inside a document's namespace.
    SubId
);

id32!(
    /// Replay-protection value carried by every instruction.
    Nonce
);

/// Address of a ledger-resident object: `darc_id || sub_id`.
///
/// The darc part names the document governing the object. Two equal pairs
/// denote the same object.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstanceId {
    pub darc_id: DarcId,
    pub sub_id: SubId,
}

impl InstanceId {
    pub const LEN: usize = 64;

    pub const fn new(darc_id: DarcId, sub_id: SubId) -> Self {
        Self { darc_id, sub_id }
    }

    /// Address a fresh instance under a document with a random sub id.
    pub fn random_in(darc_id: DarcId) -> Self {
        Self::new(darc_id, SubId::random())
    }

    pub fn to_bytes(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&self.darc_id.0);
        out[32..].copy_from_slice(&self.sub_id.0);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        if bytes.len() != Self::LEN {
            return Err(CoreError::InvalidLength {
                expected: Self::LEN,
                got: bytes.len(),
            });
        }
        Ok(Self {
            darc_id: DarcId::try_from(&bytes[..32])?,
            sub_id: SubId::try_from(&bytes[32..])?,
        })
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

impl fmt::Debug for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstanceId({}/{})", self.darc_id, self.sub_id)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.darc_id, self.sub_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_darc_id_hex_roundtrip() {
        let id = DarcId::random();
        assert_eq!(DarcId::from_hex(&id.to_hex()).unwrap(), id);
        assert!(DarcId::from_hex(&id.to_hex()[..62]).is_err());
    }

    #[test]
    fn test_display_is_truncated() {
        let id = SubId::from_bytes([0xab; 32]);
        assert_eq!(format!("{}", id), "abababababababab");
        assert!(format!("{:?}", id).starts_with("SubId("));
    }

    #[test]
    fn test_from_label_pads_and_truncates() {
        let short = SubId::from_label("nonce1");
        assert_eq!(&short.0[..6], b"nonce1");
        assert!(short.0[6..].iter().all(|b| *b == 0));

        let long = Nonce::from_label(&"x".repeat(40));
        assert!(long.0.iter().all(|b| *b == b'x'));
    }

    #[test]
    fn test_instance_id_layout() {
        let id = InstanceId::new(DarcId::from_bytes([1; 32]), SubId::from_bytes([2; 32]));
        let bytes = id.to_bytes();
        assert_eq!(&bytes[..32], &[1u8; 32]);
        assert_eq!(&bytes[32..], &[2u8; 32]);
        assert_eq!(InstanceId::from_bytes(&bytes).unwrap(), id);
    }

    #[test]
    fn test_instance_id_rejects_wrong_length() {
        let result = InstanceId::from_bytes(&[0u8; 63]);
        assert!(matches!(
            result,
            Err(CoreError::InvalidLength {
                expected: 64,
                got: 63
            })
        ));
    }

    #[test]
    fn test_random_sub_ids_differ() {
        let darc = DarcId::from_bytes([9; 32]);
        assert_ne!(InstanceId::random_in(darc), InstanceId::random_in(darc));
    }
}
