use regression_validation::{
    expected_map::{
        decode_snapshot, encode_snapshot, ContentHash, ExpectedMap, ExpectedMapData, Status,
        TransactionState, TransactionType,
    },
    validators::{
        pta_lifecycle::{diagnose, PtaLifecycleValidator},
        ValidationReport, Validator,
    },
};

mod common;

use common::fixtures::{handled, key};

/// A map of three live entities.
fn baseline() -> ExpectedMap {
    let mut map = ExpectedMap::new();
    for num in 1..=3 {
        let mut value = handled(TransactionType::Update);
        value.hash = Some(ContentHash::digest(format!("entity {}", num).as_bytes()));
        map.insert(key(num), value);
    }
    map
}

fn validate(maps: Vec<ExpectedMap>) -> ValidationReport {
    PtaLifecycleValidator::new(ExpectedMapData::new(maps))
        .run()
        .unwrap()
}

/// Tests that identical maps on all nodes are valid.
#[test]
fn identical_maps_test() {
    let report = validate(vec![baseline(), baseline(), baseline()]);

    assert!(report.is_valid());
    assert!(report.errors().is_empty());
    assert!(report.warnings().is_empty());
}

/// Tests that a node lacking an entity the baseline saw deleted is tolerated.
#[test]
fn missing_deleted_key_test() {
    let mut with_deleted = baseline();
    with_deleted.insert(key(4), handled(TransactionType::Delete));

    let report = validate(vec![with_deleted, baseline()]);

    assert!(report.is_valid(), "{:?}", report.errors());
    assert_eq!(
        report.infos(),
        ["Node 1 lacks 1 removed entities that node 0 still has".to_string()]
    );
}

/// Tests that a node lacking an entity the baseline saw created is an error naming both nodes.
#[test]
fn missing_created_key_test() {
    let mut with_created = baseline();
    with_created.insert(key(4), handled(TransactionType::Create));

    let report = validate(vec![with_created, baseline()]);

    assert!(!report.is_valid());
    assert_eq!(
        report.errors(),
        ["Node 1 is missing keys that node 0 has: [0.0.4]".to_string()]
    );

    // The other way around, the baseline is the node missing the key.
    let mut with_created = baseline();
    with_created.insert(key(4), handled(TransactionType::Create));
    let report = validate(vec![baseline(), with_created]);
    assert_eq!(
        report.errors(),
        ["Node 0 is missing keys that node 1 has: [0.0.4]".to_string()]
    );
}

/// Tests that every differing field of a shared entity is its own error.
#[test]
fn field_mismatch_test() {
    let mut diverged = baseline();
    let value = diverged.get_mut(&key(2)).unwrap();
    value.hash = Some(ContentHash::digest(b"something else"));
    value.latest_handled_status = Some(Status::new(
        TransactionState::Handled,
        TransactionType::Transfer,
    ));

    let report = validate(vec![baseline(), diverged]);

    assert!(!report.is_valid());
    assert_eq!(report.errors().len(), 2);
    assert!(report.errors()[0].starts_with("Entity 0.0.2 hash differs"));
    assert!(report.errors()[1].starts_with("Entity 0.0.2 latestHandledStatus differs"));
}

/// Tests that a rejected entity must have been deleted or expired.
#[test]
fn handle_rejected_test() {
    let rejected = |history: TransactionType| {
        let mut map = baseline();
        let value = map.get_mut(&key(1)).unwrap();
        value.latest_handled_status = Some(Status::new(
            TransactionState::HandleRejected,
            TransactionType::Update,
        ));
        value.history_handled_status = Some(Status::new(TransactionState::Handled, history));
        map
    };

    let report = validate(vec![rejected(TransactionType::Expire), rejected(TransactionType::Expire)]);
    assert!(report.is_valid(), "{:?}", report.errors());

    let report = validate(vec![rejected(TransactionType::Create), rejected(TransactionType::Create)]);
    assert!(!report.is_valid());
    // Once per node.
    assert_eq!(report.errors().len(), 2);
    assert!(report.errors()[0].starts_with("Node 0 entity 0.0.1 was rejected"));
    assert!(report.errors()[1].starts_with("Node 1 entity 0.0.1 was rejected"));
}

/// Tests that an entity errored on both sides is consistent, with a diagnostic warning.
#[test]
fn both_errored_test() {
    let errored = |state: TransactionState| {
        let mut map = baseline();
        let value = map.get_mut(&key(3)).unwrap();
        value.is_errored = true;
        value.latest_submit_status = Some(Status::new(state, TransactionType::Transfer));
        map
    };

    let report = validate(vec![
        errored(TransactionState::SubmissionFailed),
        errored(TransactionState::SubmissionFailed),
    ]);

    assert!(report.is_valid(), "{:?}", report.errors());
    assert_eq!(
        report.warnings(),
        ["Entity 0.0.3 is errored on node 0 (transaction could not be submitted) and node 1 (transaction could not be submitted)".to_string()]
    );
}

/// Tests the root cause diagnostics.
#[test]
fn diagnose_test() {
    let mut value = handled(TransactionType::Transfer);
    value.latest_handled_status = Some(Status::new(
        TransactionState::InvalidSig,
        TransactionType::Transfer,
    ));
    assert_eq!(diagnose(&value), "transaction had an invalid signature");

    value.latest_handled_status = Some(Status::new(
        TransactionState::HandleEntityTypeMismatch,
        TransactionType::Transfer,
    ));
    assert_eq!(diagnose(&value), "transaction targeted an entity of another type");

    value.latest_handled_status = None;
    assert_eq!(diagnose(&value), "unknown cause");
}

/// Tests that missing snapshots are errors, and that snapshots decode to the maps they were made from.
#[test]
fn snapshots_test() {
    let snapshot = encode_snapshot(&baseline()).unwrap();
    assert_eq!(decode_snapshot(&snapshot).unwrap(), baseline());

    let maps = ExpectedMapData::from_snapshots(&[Some(snapshot.clone()), None, Some(snapshot)]).unwrap();
    assert_eq!(maps.node_count(), 3);
    assert!(maps.map(1).is_none());

    let report = PtaLifecycleValidator::new(maps).run().unwrap();
    assert!(!report.is_valid());
    assert_eq!(report.errors(), ["Node 1 expected map is missing".to_string()]);

    let corrupt = ExpectedMapData::from_snapshots(&[Some(vec![1u8, 2, 3])]);
    assert_eq!(corrupt.unwrap_err().node, 0);
}
