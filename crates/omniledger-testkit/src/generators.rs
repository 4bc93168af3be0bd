//! Proptest generators for property-based testing.

use proptest::prelude::*;

use omniledger::VALUE_CONTRACT;
use omniledger_core::{DarcId, Identity, InstanceId, Keypair, Nonce, Signer, SubId};
use omniledger_darc::{Darc, Expression, Rules};
use omniledger_tx::{Arguments, ClientTransaction, Instruction};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

pub fn darc_id() -> impl Strategy<Value = DarcId> {
    any::<[u8; 32]>().prop_map(DarcId)
}

pub fn sub_id() -> impl Strategy<Value = SubId> {
    any::<[u8; 32]>().prop_map(SubId)
}

pub fn nonce() -> impl Strategy<Value = Nonce> {
    any::<[u8; 32]>().prop_map(Nonce)
}

pub fn instance_id() -> impl Strategy<Value = InstanceId> {
    (darc_id(), sub_id()).prop_map(|(d, s)| InstanceId::new(d, s))
}

/// Generate an ed25519 or delegated identity.
pub fn identity() -> impl Strategy<Value = Identity> {
    prop_oneof![
        3 => keypair().prop_map(|kp| kp.identity()),
        1 => darc_id().prop_map(Identity::Darc),
    ]
}

/// Generate a structurally valid expression, nested at most three deep.
pub fn expression() -> impl Strategy<Value = Expression> {
    let leaf = identity().prop_map(Expression::Id);
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1..4).prop_map(Expression::And),
            prop::collection::vec(inner.clone(), 1..4).prop_map(Expression::Or),
            prop::collection::vec(inner, 1..4).prop_flat_map(|of| {
                let n = of.len();
                (1..=n).prop_map(move |threshold| Expression::Threshold {
                    threshold,
                    of: of.clone(),
                })
            }),
        ]
    })
}

/// Generate an action name.
pub fn action() -> impl Strategy<Value = String> {
    prop_oneof![
        "spawn:[a-z]{1,8}",
        "invoke:[a-z]{1,8}",
        Just("delete".to_string()),
        Just("_sign".to_string()),
    ]
}

pub fn rules() -> impl Strategy<Value = Rules> {
    prop::collection::btree_map(action(), expression(), 0..6)
        .prop_map(|map| map.into_iter().collect())
}

/// Generate a version-0 document.
pub fn genesis_darc() -> impl Strategy<Value = Darc> {
    (rules(), payload(32)).prop_map(|(rules, desc)| Darc::new(rules, desc))
}

/// Generate payload bytes of specified max length.
pub fn payload(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Parameters for generating a signed `value` spawn.
#[derive(Debug, Clone)]
pub struct InstructionParams {
    pub keypair: Keypair,
    pub instance_id: InstanceId,
    pub nonce: Nonce,
    pub value: Vec<u8>,
}

impl Arbitrary for InstructionParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (keypair(), instance_id(), nonce(), payload(64))
            .prop_map(|(keypair, instance_id, nonce, value)| InstructionParams {
                keypair,
                instance_id,
                nonce,
                value,
            })
            .boxed()
    }
}

/// Build the signed instruction described by `params`.
pub fn instruction_from_params(params: &InstructionParams) -> Instruction {
    let mut instruction = Instruction::spawn(
        params.instance_id,
        VALUE_CONTRACT,
        Arguments::new().with(omniledger::VALUE_ARGUMENT, params.value.clone()),
        params.nonce,
    );
    instruction
        .sign_by(&params.keypair)
        .expect("ed25519 signing is infallible");
    instruction
}

/// Generate a non-empty transaction of signed instructions.
pub fn client_transaction(max_instructions: usize) -> impl Strategy<Value = ClientTransaction> {
    prop::collection::vec(any::<InstructionParams>(), 1..=max_instructions.max(1)).prop_map(
        |params| ClientTransaction {
            instructions: params.iter().map(instruction_from_params).collect(),
        },
    )
}
