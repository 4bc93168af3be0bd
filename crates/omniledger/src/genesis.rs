//! Genesis assembly: the first document, the instruction spawning it, and
//! the request that asks the chain service to start a ledger from them.

use tracing::info;

use omniledger_core::{Identity, InstanceId, Nonce, Signer};
use omniledger_darc::{spawn_action, Darc, Expression, Rules};
use omniledger_skipchain::{ChainError, ChainService, GenesisRequest, GenesisResponse, Roster};
use omniledger_tx::{Arguments, ClientTransaction, Instruction, DARC_ARGUMENT, DARC_CONTRACT};

use crate::config::GenesisConfig;
use crate::error::{LedgerError, Result};

/// Builds genesis requests for a fixed set of owners.
#[derive(Debug, Clone)]
pub struct GenesisBuilder {
    owners: Vec<Identity>,
    config: GenesisConfig,
}

impl GenesisBuilder {
    pub fn new(owners: Vec<Identity>, config: GenesisConfig) -> Self {
        Self { owners, config }
    }

    pub fn owners(&self) -> &[Identity] {
        &self.owners
    }

    /// The version-0 document.
    ///
    /// Owners may evolve and sign; `spawn:darc` and every extra rule are
    /// bound to the same expression as `_sign`.
    pub fn build_darc(&self) -> Result<Darc> {
        if self.owners.is_empty() {
            return Err(LedgerError::InvalidArgument(
                "genesis darc needs at least one owner".into(),
            ));
        }
        let signers = Expression::any_of(&self.owners);
        let mut rules = Rules::init(&self.owners, &self.owners)
            .with_rule(spawn_action(DARC_CONTRACT), signers.clone())?;
        for action in &self.config.extra_rules {
            if !rules.contains(action) {
                rules = rules.with_rule(action.clone(), signers.clone())?;
            }
        }
        Ok(Darc::new(rules, self.config.description.clone()))
    }

    /// A signed genesis request for `roster`.
    ///
    /// The spawn instruction targets a fresh sub id under the new document's
    /// own id and carries a fresh nonce.
    pub fn build_request(&self, roster: Roster, signer: &dyn Signer) -> Result<GenesisRequest> {
        if roster.is_empty() {
            return Err(ChainError::EmptyRoster.into());
        }
        let darc = self.build_darc()?;
        let mut instruction = Instruction::spawn(
            InstanceId::random_in(darc.base_id()),
            DARC_CONTRACT,
            Arguments::new().with(DARC_ARGUMENT, darc.to_bytes()?),
            Nonce::random(),
        );
        instruction.sign_by(signer)?;

        Ok(GenesisRequest {
            version: self.config.protocol_version,
            roster,
            genesis_darc: darc,
            transaction: ClientTransaction::single(instruction),
        })
    }
}

/// Build a genesis request owned by `signer` and submit it.
pub async fn create_genesis<C: ChainService + ?Sized>(
    service: &C,
    roster: Roster,
    signer: &dyn Signer,
    config: GenesisConfig,
) -> Result<(GenesisRequest, GenesisResponse)> {
    let request = GenesisBuilder::new(vec![signer.identity()], config).build_request(roster, signer)?;
    let darc_id = request.genesis_darc.base_id();

    let response = service.create_genesis_block(request.clone()).await?;
    info!(
        darc = %darc_id,
        skipblock = %response.skipblock_hash,
        nodes = request.roster.len(),
        "genesis block created"
    );
    Ok((request, response))
}
