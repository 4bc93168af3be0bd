//! End-to-end flows: genesis through the chain service, then admission,
//! evolution and batch processing on a memory-backed ledger.

use std::sync::Once;

use omniledger::darc::{spawn_action, Expression, EVOLVE_ACTION};
use omniledger::skipchain::{ChainError, MemoryChainService};
use omniledger::store::MemoryDarcStore;
use omniledger::tx::TxError;
use omniledger::{
    create_genesis, ClientTransaction, GenesisConfig, Identity, Ledger, LedgerConfig,
    LedgerError,
};
use omniledger_testkit::{multi_party_fixtures, test_roster, TestFixture};

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

fn rejected_by_rule(err: &LedgerError) -> bool {
    matches!(err, LedgerError::Tx(TxError::InstructionRejected { .. }))
}

#[tokio::test]
async fn genesis_request_bootstraps_a_ledger() {
    init_tracing();
    let owner = TestFixture::with_seed([1; 32]);
    let service = MemoryChainService::new();
    let config = GenesisConfig {
        extra_rules: vec![spawn_action("value")],
        ..GenesisConfig::default()
    };

    let (request, response) = create_genesis(&service, test_roster(4), &owner.keypair, config)
        .await
        .unwrap();
    assert_eq!(service.chain_count().await, 1);
    assert!(service.genesis(&response.skipblock_hash).await.is_some());

    let ledger = Ledger::new(MemoryDarcStore::new(), LedgerConfig::default());
    ledger.apply_transaction(&request.transaction).unwrap();
    let darc = request.genesis_darc;
    assert_eq!(ledger.latest_darc(&darc.base_id()).unwrap(), Some(darc.clone()));

    let tx = ClientTransaction::single(owner.spawn_value(&darc, "greeting", b"hello"));
    ledger.apply_transaction(&tx).unwrap();
    let record = ledger
        .get_instance(&TestFixture::value_instance(&darc, "greeting"))
        .unwrap()
        .unwrap();
    assert_eq!(&record.value[..], b"hello");
}

#[tokio::test]
async fn genesis_with_empty_roster_fails() {
    init_tracing();
    let owner = TestFixture::with_seed([1; 32]);
    let err = create_genesis(
        &MemoryChainService::new(),
        test_roster(0),
        &owner.keypair,
        GenesisConfig::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, LedgerError::Chain(ChainError::EmptyRoster)));
}

#[test]
fn genesis_replay_is_rejected() {
    init_tracing();
    let owner = TestFixture::with_seed([1; 32]);
    let (ledger, darc) = owner.bootstrapped_ledger();

    // The lineage exists now, so the spawn needs `spawn:darc`, which this darc lacks.
    let err = ledger
        .apply_transaction(&ClientTransaction::single(owner.spawn_darc(&darc)))
        .unwrap_err();
    assert!(rejected_by_rule(&err));
    assert_eq!(ledger.darc_history(&darc.base_id()).unwrap().len(), 1);
}

#[test]
fn value_lifecycle() {
    init_tracing();
    let owner = TestFixture::with_seed([1; 32]);
    let (ledger, darc) = owner.bootstrapped_ledger();
    let id = TestFixture::value_instance(&darc, "counter");

    for instruction in [
        owner.spawn_value(&darc, "counter", b"1"),
        owner.update_value(&darc, "counter", b"2"),
    ] {
        ledger
            .apply_transaction(&ClientTransaction::single(instruction))
            .unwrap();
    }
    assert_eq!(&ledger.get_instance(&id).unwrap().unwrap().value[..], b"2");

    ledger
        .apply_transaction(&ClientTransaction::single(owner.delete_value(&darc, "counter")))
        .unwrap();
    assert!(ledger.get_instance(&id).unwrap().is_none());

    let err = ledger
        .apply_transaction(&ClientTransaction::single(
            owner.update_value(&darc, "counter", b"3"),
        ))
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InstructionFailed { ref source, .. }
            if matches!(**source, LedgerError::InstanceNotFound(_))
    ));
}

#[test]
fn evolution_changes_who_may_act() {
    init_tracing();
    let parties = multi_party_fixtures(2);
    let (owner, friend) = (&parties[0], &parties[1]);
    let (ledger, v0) = owner.bootstrapped_ledger();

    let denied = ClientTransaction::single(friend.spawn_value(&v0, "a", b"1"));
    assert!(rejected_by_rule(&ledger.apply_transaction(&denied).unwrap_err()));

    let both = Expression::any_of(&[owner.identity(), friend.identity()]);
    let rules = v0
        .rules
        .with_updated_rule(spawn_action("value"), both)
        .unwrap();
    let v1 = v0.successor(rules, None);
    ledger
        .apply_transaction(&ClientTransaction::single(owner.evolve_darc(&v0, &v1)))
        .unwrap();
    assert_eq!(ledger.latest_darc(&v0.base_id()).unwrap(), Some(v1.clone()));

    let allowed = ClientTransaction::single(friend.spawn_value(&v1, "a", b"1"));
    ledger.apply_transaction(&allowed).unwrap();
}

#[test]
fn evolution_by_non_owner_and_stale_evolution_fail() {
    init_tracing();
    let parties = multi_party_fixtures(2);
    let (owner, stranger) = (&parties[0], &parties[1]);
    let (ledger, v0) = owner.bootstrapped_ledger();

    let hijack = v0.successor(
        v0.rules
            .with_updated_rule(EVOLVE_ACTION, Expression::Id(stranger.identity()))
            .unwrap(),
        None,
    );
    let err = ledger
        .apply_transaction(&ClientTransaction::single(stranger.evolve_darc(&v0, &hijack)))
        .unwrap_err();
    assert!(rejected_by_rule(&err));

    let v1 = v0.successor(v0.rules.clone(), Some("v1".into()));
    ledger
        .apply_transaction(&ClientTransaction::single(owner.evolve_darc(&v0, &v1)))
        .unwrap();

    // A second successor of v0 no longer links onto the lineage.
    let fork = v0.successor(v0.rules.clone(), Some("fork".into()));
    let err = ledger
        .apply_transaction(&ClientTransaction::single(owner.evolve_darc(&v0, &fork)))
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InstructionFailed { ref source, .. }
            if matches!(**source, LedgerError::Darc(_))
    ));
    assert_eq!(ledger.darc_history(&v0.base_id()).unwrap().len(), 2);
}

#[test]
fn delegated_identity_is_resolved_through_the_store() {
    init_tracing();
    let parties = multi_party_fixtures(2);
    let (owner, member) = (&parties[0], &parties[1]);
    let (ledger, team_darc) = owner.bootstrapped_ledger();

    // The member's own document; its `_sign` rule names the member.
    let member_darc = member.genesis_darc("member");
    ledger
        .apply_transaction(&ClientTransaction::single(member.spawn_darc(&member_darc)))
        .unwrap();

    let delegated = Expression::Id(Identity::Darc(member_darc.base_id()));
    let rules = team_darc
        .rules
        .with_updated_rule(spawn_action("value"), delegated)
        .unwrap();
    let next = team_darc.successor(rules, None);
    ledger
        .apply_transaction(&ClientTransaction::single(owner.evolve_darc(&team_darc, &next)))
        .unwrap();

    let tx = ClientTransaction::single(member.spawn_value(&next, "shared", b"x"));
    ledger.apply_transaction(&tx).unwrap();

    let outsider = TestFixture::with_seed([3; 32]);
    let tx = ClientTransaction::single(outsider.spawn_value(&next, "other", b"y"));
    assert!(rejected_by_rule(&ledger.apply_transaction(&tx).unwrap_err()));
}

#[test]
fn batch_is_sorted_and_survives_rejections() {
    init_tracing();
    let parties = multi_party_fixtures(2);
    let (owner, stranger) = (&parties[0], &parties[1]);
    let (ledger, darc) = owner.bootstrapped_ledger();

    let batch = vec![
        ClientTransaction::single(owner.spawn_value(&darc, "a", b"1")),
        ClientTransaction::single(owner.spawn_value(&darc, "b", b"2")),
        ClientTransaction::single(stranger.spawn_value(&darc, "c", b"3")),
        ClientTransaction::single(owner.spawn_value(&darc, "d", b"4")),
    ];
    let mut expected: Vec<_> = batch[..2]
        .iter()
        .chain(std::iter::once(&batch[3]))
        .map(|tx| tx.hash().unwrap())
        .collect();
    expected.sort();

    let report = ledger.process_batch(batch).unwrap();
    assert_eq!(report.accepted, expected);
    assert_eq!(report.rejected.len(), 1);
    assert!(rejected_by_rule(&report.rejected[0].error));
    assert_eq!(ledger.store().instance_count().unwrap(), 4);
}

#[test]
fn unsigned_instructions_pass_when_verification_is_off() {
    init_tracing();
    let owner = TestFixture::with_seed([1; 32]);
    let stranger = TestFixture::with_seed([2; 32]);
    let darc = owner.genesis_darc("trusting");

    let ledger = Ledger::new(
        MemoryDarcStore::new(),
        LedgerConfig {
            verify_signatures: false,
            ..LedgerConfig::default()
        },
    );
    let tx = ClientTransaction::new(vec![
        stranger.spawn_darc(&darc),
        stranger.spawn_value(&darc, "k", b"v"),
    ])
    .unwrap();
    ledger.apply_transaction(&tx).unwrap();
    assert_eq!(ledger.store().instance_count().unwrap(), 2);
}
