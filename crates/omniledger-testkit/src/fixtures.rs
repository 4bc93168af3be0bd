//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use omniledger::{Ledger, LedgerConfig, VALUE_ARGUMENT, VALUE_CONTRACT};
use omniledger_core::{Identity, InstanceId, Keypair, Nonce, Signer, SubId};
use omniledger_darc::{invoke_action, spawn_action, Darc, Expression, Rules};
use omniledger_skipchain::{Roster, ServerIdentity};
use omniledger_store::MemoryDarcStore;
use omniledger_tx::{
    Arguments, ClientTransaction, Instruction, DARC_ARGUMENT, DARC_CONTRACT, DELETE_ACTION,
};

/// Sub id under which a document's own `darc` instance lives.
pub const DARC_SUB_ID: SubId = SubId::ZERO;

/// A signer with helpers for building signed instructions.
pub struct TestFixture {
    pub keypair: Keypair,
}

impl TestFixture {
    /// Create a new test fixture with a random keypair.
    pub fn new() -> Self {
        Self {
            keypair: Keypair::generate(),
        }
    }

    /// Create with a deterministic keypair from seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self {
            keypair: Keypair::from_seed(&seed),
        }
    }

    pub fn identity(&self) -> Identity {
        self.keypair.identity()
    }

    /// A version-0 document owned by this fixture that also grants the
    /// `value` contract's actions.
    pub fn genesis_darc(&self, description: &str) -> Darc {
        let me = Expression::Id(self.identity());
        let rules = [
            spawn_action(VALUE_CONTRACT),
            invoke_action("update"),
            DELETE_ACTION.to_string(),
        ]
        .into_iter()
        .fold(
            Rules::init(&[self.identity()], &[self.identity()]),
            |rules, action| {
                rules
                    .with_rule(action, me.clone())
                    .expect("fresh rule set has no value actions")
            },
        );
        Darc::new(rules, description.to_string())
    }

    /// Id of the `darc` instance holding `darc`'s lineage.
    pub fn darc_instance(darc: &Darc) -> InstanceId {
        InstanceId::new(darc.base_id(), DARC_SUB_ID)
    }

    /// Id of a `value` instance governed by `darc`.
    pub fn value_instance(darc: &Darc, key: &str) -> InstanceId {
        InstanceId::new(darc.base_id(), SubId::from_label(key))
    }

    /// Sign `instruction` with this fixture's key.
    pub fn sign(&self, mut instruction: Instruction) -> Instruction {
        instruction
            .sign_by(&self.keypair)
            .expect("ed25519 signing is infallible");
        instruction
    }

    /// Spawn of `darc` at its own id.
    pub fn spawn_darc(&self, darc: &Darc) -> Instruction {
        self.sign(Instruction::spawn(
            Self::darc_instance(darc),
            DARC_CONTRACT,
            Arguments::new().with(DARC_ARGUMENT, darc.to_bytes().expect("darc encodes")),
            Nonce::random(),
        ))
    }

    /// `invoke:evolve` replacing `current` with `next`.
    pub fn evolve_darc(&self, current: &Darc, next: &Darc) -> Instruction {
        self.sign(Instruction::invoke(
            Self::darc_instance(current),
            "evolve",
            Arguments::new().with(DARC_ARGUMENT, next.to_bytes().expect("darc encodes")),
            Nonce::random(),
        ))
    }

    pub fn spawn_value(&self, darc: &Darc, key: &str, value: &[u8]) -> Instruction {
        self.sign(Instruction::spawn(
            Self::value_instance(darc, key),
            VALUE_CONTRACT,
            Arguments::new().with(VALUE_ARGUMENT, value.to_vec()),
            Nonce::random(),
        ))
    }

    pub fn update_value(&self, darc: &Darc, key: &str, value: &[u8]) -> Instruction {
        self.sign(Instruction::invoke(
            Self::value_instance(darc, key),
            "update",
            Arguments::new().with(VALUE_ARGUMENT, value.to_vec()),
            Nonce::random(),
        ))
    }

    pub fn delete_value(&self, darc: &Darc, key: &str) -> Instruction {
        self.sign(Instruction::delete(
            Self::value_instance(darc, key),
            Nonce::random(),
        ))
    }

    /// A memory-backed ledger in which this fixture's genesis darc exists.
    pub fn bootstrapped_ledger(&self) -> (Ledger<MemoryDarcStore>, Darc) {
        let darc = self.genesis_darc("test genesis");
        let ledger = Ledger::new(MemoryDarcStore::new(), LedgerConfig::default());
        ledger
            .apply_transaction(&ClientTransaction::single(self.spawn_darc(&darc)))
            .expect("genesis transaction applies");
        (ledger, darc)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Create multiple test fixtures for multi-party tests.
pub fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            seed[31] = 0x5a;
            TestFixture::with_seed(seed)
        })
        .collect()
}

/// A roster of `nodes` local servers with deterministic keys.
pub fn test_roster(nodes: usize) -> Roster {
    let servers = (0..nodes)
        .map(|i| ServerIdentity {
            address: format!("tcp://127.0.0.1:{}", 7002 + 2 * i),
            public: Keypair::from_seed(&[i as u8 + 1; 32]).public_key(),
            description: format!("node {i}"),
        })
        .collect();
    Roster { servers }
}
