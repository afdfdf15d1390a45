use regression_validation::{
    log_reader::markers::{
        EXCEPTION, MIGRATION_END_LOAD, MIGRATION_END_PROCESS, MIGRATION_START_LOAD,
        MIGRATION_START_PROCESS, SOCKET_EXCEPTIONS, SUITE_FAILED, SUITE_PASSED, SUITE_START,
        SYNC_STALE_COMPENSATION_FAILURE, SYNC_STALE_COMPENSATION_SUCCESS, WRONG_STATUS,
    },
    node_data::NodeData,
    validators::{
        gossip_compensation::GossipCompensationValidator,
        hapi_client::{count_suites, HapiClientValidator, HgcaaValidator, SuiteCounts},
        migration::MigrationValidator,
        Validator,
    },
};

mod common;

use common::fixtures::{hapi_log, healthy_csv, line, log, node};

fn client_node(lines: &[String]) -> NodeData {
    NodeData::new(None, None).with_hapi_client(hapi_log(lines))
}

/// Tests that every node must log the four migration stages in order.
#[test]
fn migration_test() {
    let complete = [
        line(0, MIGRATION_START_LOAD, "Loading state"),
        line(10, MIGRATION_END_LOAD, "Loaded state"),
        line(11, MIGRATION_START_PROCESS, "Migrating"),
        line(40, MIGRATION_END_PROCESS, "Migrated"),
    ];
    let out_of_order = [
        line(0, MIGRATION_START_LOAD, "Loading state"),
        line(11, MIGRATION_START_PROCESS, "Migrating"),
        line(12, MIGRATION_END_LOAD, "Loaded state"),
    ];

    let report = MigrationValidator::new(vec![
        node(&complete, healthy_csv(10.0)),
        node(&out_of_order, healthy_csv(10.0)),
    ])
    .run()
    .unwrap();

    assert!(!report.is_valid());
    assert_eq!(report.infos(), ["Node 0 completed the migration".to_string()]);
    assert_eq!(
        report.errors(),
        ["Node 1 never reached migration stage MIGRATION_START_PROCESS".to_string()]
    );
}

/// Tests that stale-event compensation success is a warning and failure an error.
#[test]
fn gossip_compensation_test() {
    let report = GossipCompensationValidator::new(vec![
        node(
            &[line(5, SYNC_STALE_COMPENSATION_SUCCESS, "Compensated 12 stale events")],
            healthy_csv(10.0),
        ),
        NodeData::new(Some(log(&[])), None),
    ])
    .run()
    .unwrap();
    assert!(report.is_valid());
    assert_eq!(
        report.warnings(),
        ["Node 0 compensated for stale events: Compensated 12 stale events".to_string()]
    );

    let report = GossipCompensationValidator::new(vec![node(
        &[line(5, SYNC_STALE_COMPENSATION_FAILURE, "Could not compensate")],
        healthy_csv(10.0),
    )])
    .run()
    .unwrap();
    assert!(!report.is_valid());
}

/// Tests the per-suite tally of a client log.
#[test]
fn count_suites_test() {
    let mut client = hapi_log(&[
        line(0, SUITE_START, "'CryptoCreateSuite' starting"),
        line(1, WRONG_STATUS, "'CryptoCreateSuite' expected SUCCESS got BUSY"),
        line(2, SUITE_PASSED, "'CryptoCreateSuite' passed"),
        line(3, SUITE_START, "'FileUpdateSuite' starting"),
        line(4, EXCEPTION, "'FileUpdateSuite' timed out"),
        // Stack trace of the exception above, not an exception of its own.
        "java.util.concurrent.TimeoutException: no receipt".to_string(),
        line(5, SUITE_FAILED, "'FileUpdateSuite' failed"),
    ]);
    let mut entries = Vec::new();
    while let Some(entry) = client.next_entry().unwrap() {
        entries.push(entry);
    }

    let suites = count_suites(&entries);

    assert_eq!(
        suites["CryptoCreateSuite"],
        SuiteCounts {
            started: 1,
            passed: 1,
            failed: 0,
            wrong_status: 1,
            exceptions: 0,
        }
    );
    assert_eq!(
        suites["FileUpdateSuite"],
        SuiteCounts {
            started: 1,
            passed: 0,
            failed: 1,
            wrong_status: 0,
            exceptions: 1,
        }
    );
}

/// Tests the HAPI client verdicts: failed suites and client exceptions are errors, wrong statuses are
/// warnings.
#[test]
fn hapi_client_test() {
    let passing = [
        line(0, SUITE_START, "'CryptoCreateSuite' starting"),
        line(1, WRONG_STATUS, "'CryptoCreateSuite' expected SUCCESS got BUSY"),
        line(2, SUITE_PASSED, "'CryptoCreateSuite' passed"),
    ];
    let report = HapiClientValidator::new(vec![client_node(&passing), NodeData::new(None, None)])
        .run()
        .unwrap();
    assert!(report.is_valid(), "{:?}", report.errors());
    assert_eq!(report.warnings().len(), 1);
    assert_eq!(
        report.infos(),
        ["Node 0 suite CryptoCreateSuite: 1 passed, 0 failed, 1 wrong status, 0 exceptions".to_string()]
    );

    let failing = [
        line(0, SUITE_START, "'FileUpdateSuite' starting"),
        line(4, EXCEPTION, "'FileUpdateSuite' timed out"),
        line(5, SUITE_FAILED, "'FileUpdateSuite' failed"),
    ];
    let report = HapiClientValidator::new(vec![client_node(&failing)]).run().unwrap();
    assert!(!report.is_valid());
    assert_eq!(
        report.errors(),
        [
            "Node 0 suite FileUpdateSuite failed".to_string(),
            "Node 0 HAPI client has EXCEPTION: timed out".to_string(),
        ]
    );

    let report = HapiClientValidator::new(vec![NodeData::new(None, None)]).run().unwrap();
    assert_eq!(report.errors(), ["No node has a HAPI client log".to_string()]);
}

/// Tests that services nodes tolerate socket exceptions only.
#[test]
fn hgcaa_test() {
    let report = HgcaaValidator::new(vec![
        node(&[line(5, SOCKET_EXCEPTIONS, "Connection reset")], healthy_csv(10.0)),
        node(&[line(5, EXCEPTION, "Record stream failure")], healthy_csv(10.0)),
        NodeData::new(None, None),
    ])
    .run()
    .unwrap();

    assert_eq!(
        report.errors(),
        [
            "Node 1 log has EXCEPTION: Record stream failure".to_string(),
            "Node 2 log is missing or unreadable".to_string(),
        ]
    );
    assert!(report.infos().is_empty());
}
