//! Messages exchanged with the chain-creation service.

use std::path::Path;

use serde::{Deserialize, Serialize};

use omniledger_core::{Blake3Hash, Ed25519PublicKey};
use omniledger_darc::Darc;
use omniledger_tx::ClientTransaction;

use crate::error::{ChainError, Result};

/// Current protocol version.
pub const CURRENT_VERSION: u32 = 1;

/// Network address and public key of one ledger node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerIdentity {
    pub address: String,
    pub public: Ed25519PublicKey,
    pub description: String,
}

/// Ordered list of participating nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    pub servers: Vec<ServerIdentity>,
}

/// On-disk group description, as written by node setup tooling.
#[derive(Debug, Deserialize)]
struct GroupToml {
    #[serde(default)]
    servers: Vec<ServerToml>,
}

#[derive(Debug, Deserialize)]
struct ServerToml {
    #[serde(rename = "Address")]
    address: String,
    #[serde(rename = "Public")]
    public: String,
    #[serde(rename = "Description", default)]
    description: String,
    #[serde(rename = "Suite", default)]
    suite: Option<String>,
}

impl Roster {
    /// Build a roster; an empty server list is rejected.
    pub fn new(servers: Vec<ServerIdentity>) -> Result<Self> {
        if servers.is_empty() {
            return Err(ChainError::EmptyRoster);
        }
        Ok(Self { servers })
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Parse a group description:
    ///
    /// ```toml
    /// [[servers]]
    ///   Address = "tls://127.0.0.1:7002"
    ///   Suite = "Ed25519"
    ///   Public = "<64 hex chars>"
    ///   Description = "node 1"
    /// ```
    pub fn from_group_toml(content: &str) -> Result<Self> {
        let group: GroupToml =
            toml::from_str(content).map_err(|e| ChainError::InvalidGroup(e.to_string()))?;

        let servers = group
            .servers
            .into_iter()
            .map(|s| {
                if let Some(suite) = s.suite.as_deref() {
                    if !suite.eq_ignore_ascii_case("ed25519") {
                        return Err(ChainError::InvalidGroup(format!(
                            "unsupported suite {suite:?} for {}",
                            s.address
                        )));
                    }
                }
                let public = Ed25519PublicKey::from_hex(&s.public).map_err(|e| {
                    ChainError::InvalidGroup(format!("bad public key for {}: {e}", s.address))
                })?;
                Ok(ServerIdentity {
                    address: s.address,
                    public,
                    description: s.description,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(servers)
    }

    /// Read and parse a group description file.
    pub fn from_group_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_group_toml(&content)
    }
}

/// Everything the chain-creation service needs to start a ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisRequest {
    pub version: u32,
    pub roster: Roster,
    pub genesis_darc: Darc,
    pub transaction: ClientTransaction,
}

/// Reply to a [`GenesisRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisResponse {
    pub skipblock_hash: Blake3Hash,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const GROUP: &str = r#"
[[servers]]
  Address = "tls://127.0.0.1:7002"
  Suite = "Ed25519"
  Public = "0101010101010101010101010101010101010101010101010101010101010101"
  Description = "Conode_1"

[[servers]]
  Address = "tls://127.0.0.1:7004"
  Public = "0202020202020202020202020202020202020202020202020202020202020202"
"#;

    #[test]
    fn test_parse_group() {
        let roster = Roster::from_group_toml(GROUP).unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster.servers[0].address, "tls://127.0.0.1:7002");
        assert_eq!(roster.servers[0].description, "Conode_1");
        assert_eq!(roster.servers[1].public, Ed25519PublicKey::from_bytes([2; 32]));
        assert!(roster.servers[1].description.is_empty());
    }

    #[test]
    fn test_empty_group_rejected() {
        assert!(matches!(Roster::from_group_toml(""), Err(ChainError::EmptyRoster)));
    }

    #[test]
    fn test_bad_key_rejected() {
        let bad = "[[servers]]\nAddress = \"a\"\nPublic = \"zz\"\n";
        assert!(matches!(
            Roster::from_group_toml(bad),
            Err(ChainError::InvalidGroup(_))
        ));
    }

    #[test]
    fn test_wrong_suite_rejected() {
        let bad = format!(
            "[[servers]]\nAddress = \"a\"\nSuite = \"bn256\"\nPublic = \"{}\"\n",
            "01".repeat(32)
        );
        assert!(matches!(
            Roster::from_group_toml(&bad),
            Err(ChainError::InvalidGroup(_))
        ));
    }

    #[test]
    fn test_read_group_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(GROUP.as_bytes()).unwrap();
        let roster = Roster::from_group_file(file.path()).unwrap();
        assert_eq!(roster.len(), 2);

        assert!(matches!(
            Roster::from_group_file(file.path().with_extension("missing")),
            Err(ChainError::Io(_))
        ));
    }
}
