//! The chain-creation service.
//!
//! Creating the first block of a ledger is delegated to an external
//! service. [`MemoryChainService`] stands in for it in-process: it performs
//! the same admission checks and keeps created chains in memory.

use std::collections::HashMap;

use async_trait::async_trait;
use ciborium::value::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};

use omniledger_core::canonical::{bytes, text, uint};
use omniledger_core::{encode_canonical, Blake3Hash};
use omniledger_tx::TxError;

use crate::error::{ChainError, Result};
use crate::messages::{GenesisRequest, GenesisResponse, CURRENT_VERSION};

/// Creates new ledgers from genesis requests.
#[async_trait]
pub trait ChainService: Send + Sync {
    /// Create the genesis block described by `request`.
    async fn create_genesis_block(&self, request: GenesisRequest) -> Result<GenesisResponse>;
}

/// Check that a genesis request can start a ledger.
///
/// The roster must be non-empty, the version supported, and the transaction
/// must spawn `genesis_darc` at its own id, signed as that document demands.
pub fn validate_genesis_request(request: &GenesisRequest) -> Result<()> {
    if request.roster.is_empty() {
        return Err(ChainError::EmptyRoster);
    }
    if request.version != CURRENT_VERSION {
        return Err(ChainError::UnsupportedVersion {
            got: request.version,
            supported: CURRENT_VERSION,
        });
    }

    let darc = &request.genesis_darc;
    if darc.version != 0 {
        return Err(ChainError::InvalidRequest(format!(
            "genesis darc has version {}",
            darc.version
        )));
    }
    darc.verify_structure()
        .map_err(|e| ChainError::InvalidRequest(e.to_string()))?;

    let first = request
        .transaction
        .instructions
        .first()
        .ok_or_else(|| TxError::MalformedTransaction("transaction has no instructions".into()))?;
    if first.genesis_darc().as_ref() != Some(darc) {
        return Err(ChainError::InvalidRequest(
            "first instruction does not spawn the genesis darc".into(),
        ));
    }

    for (index, instr) in request.transaction.instructions.iter().enumerate() {
        instr
            .verify_genesis(darc)
            .map_err(|source| TxError::InstructionRejected { index, source })?;
    }
    Ok(())
}

/// Deterministic id of the block a request creates.
pub fn genesis_block_hash(request: &GenesisRequest) -> Result<Blake3Hash> {
    let servers = request
        .roster
        .servers
        .iter()
        .map(|s| Value::Array(vec![text(&s.address), bytes(s.public.as_bytes())]))
        .collect();
    let encoded = encode_canonical(&Value::Array(vec![
        uint(u64::from(request.version)),
        Value::Array(servers),
        bytes(request.genesis_darc.id().as_bytes()),
        bytes(request.transaction.hash()?.as_bytes()),
    ]));
    Ok(Blake3Hash::hash(&encoded))
}

/// In-process chain service.
#[derive(Default)]
pub struct MemoryChainService {
    chains: RwLock<HashMap<Blake3Hash, GenesisRequest>>,
}

impl MemoryChainService {
    pub fn new() -> Self {
        Self::default()
    }

    /// The request a chain was created from.
    pub async fn genesis(&self, skipblock_hash: &Blake3Hash) -> Option<GenesisRequest> {
        self.chains.read().await.get(skipblock_hash).cloned()
    }

    /// Number of chains created so far.
    pub async fn chain_count(&self) -> usize {
        self.chains.read().await.len()
    }
}

#[async_trait]
impl ChainService for MemoryChainService {
    async fn create_genesis_block(&self, request: GenesisRequest) -> Result<GenesisResponse> {
        validate_genesis_request(&request)?;
        let skipblock_hash = genesis_block_hash(&request)?;

        let mut chains = self.chains.write().await;
        if chains.contains_key(&skipblock_hash) {
            debug!(%skipblock_hash, "genesis block already exists");
        } else {
            info!(
                %skipblock_hash,
                servers = request.roster.len(),
                darc = %request.genesis_darc.base_id(),
                "created genesis block"
            );
            chains.insert(skipblock_hash, request);
        }

        Ok(GenesisResponse { skipblock_hash })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{Roster, ServerIdentity};
    use omniledger_core::{InstanceId, Keypair, Nonce, Signer, SubId};
    use omniledger_darc::{Darc, Rules};
    use omniledger_tx::{Arguments, ClientTransaction, Instruction, DARC_ARGUMENT, DARC_CONTRACT};

    fn roster() -> Roster {
        Roster::new(vec![ServerIdentity {
            address: "tls://127.0.0.1:7002".into(),
            public: Keypair::from_seed(&[9; 32]).public_key(),
            description: "node".into(),
        }])
        .unwrap()
    }

    fn request(signer: &Keypair, owner: &Keypair) -> GenesisRequest {
        let darc = Darc::new(
            Rules::init(&[owner.identity()], &[owner.identity()]),
            "genesis",
        );
        let mut instr = Instruction::spawn(
            InstanceId::new(darc.base_id(), SubId::from_label("genesis")),
            DARC_CONTRACT,
            Arguments::new().with(DARC_ARGUMENT, darc.to_bytes().unwrap()),
            Nonce::from_label("genesis"),
        );
        instr.sign_by(signer).unwrap();
        GenesisRequest {
            version: CURRENT_VERSION,
            roster: roster(),
            genesis_darc: darc,
            transaction: ClientTransaction::single(instr),
        }
    }

    #[tokio::test]
    async fn test_create_genesis_block() {
        let owner = Keypair::from_seed(&[1; 32]);
        let service = MemoryChainService::new();
        let req = request(&owner, &owner);

        let resp = service.create_genesis_block(req.clone()).await.unwrap();
        assert_eq!(resp.skipblock_hash, genesis_block_hash(&req).unwrap());
        assert_eq!(service.genesis(&resp.skipblock_hash).await, Some(req.clone()));

        let again = service.create_genesis_block(req).await.unwrap();
        assert_eq!(again, resp);
        assert_eq!(service.chain_count().await, 1);
    }

    #[tokio::test]
    async fn test_rejects_foreign_signer() {
        let owner = Keypair::from_seed(&[1; 32]);
        let stranger = Keypair::from_seed(&[2; 32]);
        let service = MemoryChainService::new();

        let err = service
            .create_genesis_block(request(&stranger, &owner))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ChainError::Transaction(TxError::InstructionRejected { index: 0, .. })
        ));
        assert_eq!(service.chain_count().await, 0);
    }

    #[tokio::test]
    async fn test_rejects_bad_version_and_empty_roster() {
        let owner = Keypair::from_seed(&[1; 32]);
        let service = MemoryChainService::new();

        let mut req = request(&owner, &owner);
        req.version = CURRENT_VERSION + 1;
        assert!(matches!(
            service.create_genesis_block(req).await,
            Err(ChainError::UnsupportedVersion { .. })
        ));

        let mut req = request(&owner, &owner);
        req.roster.servers.clear();
        assert!(matches!(
            service.create_genesis_block(req).await,
            Err(ChainError::EmptyRoster)
        ));
    }

    #[test]
    fn test_rejects_mismatched_darc() {
        let owner = Keypair::from_seed(&[1; 32]);
        let mut req = request(&owner, &owner);
        req.genesis_darc = Darc::new(
            Rules::init(&[owner.identity()], &[owner.identity()]),
            "other",
        );
        assert!(matches!(
            validate_genesis_request(&req),
            Err(ChainError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_block_hash_depends_on_roster() {
        let owner = Keypair::from_seed(&[1; 32]);
        let a = request(&owner, &owner);
        let mut b = a.clone();
        b.roster.servers[0].address = "tls://10.0.0.1:7002".into();
        assert_ne!(genesis_block_hash(&a).unwrap(), genesis_block_hash(&b).unwrap());
    }
}
