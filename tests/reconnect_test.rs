use chrono::Duration;

use regression_validation::{
    config::ReconnectScenario,
    log_reader::{
        markers::{
            CHANGED_TO_ACTIVE, RECONNECT_FINISHED, RECONNECT_START, RECV_STATE_ERROR,
            RECV_STATE_HASH_MISMATCH, SOCKET_EXCEPTIONS,
        },
        LogMarker,
    },
    node_data::NodeData,
    validators::{
        reconnect::{
            receive_state_error_tolerated, transition, ReconnectAction, ReconnectValidator,
        },
        ValidationReport, Validator,
    },
};

mod common;

use common::{
    fixtures::{healthy_csv, line, node, run_start},
    logging::setup_logger,
};

const SAVED_STATE_START_ROUND: u64 = 100;

/// Three peers that stayed up until round 500.
fn peers() -> Vec<NodeData> {
    (0..3)
        .map(|_| node(&[line(0, "STARTUP", "node started")], healthy_csv(500.0)))
        .collect()
}

fn run(reconnect_node_log: &[String], final_round: f64) -> ValidationReport {
    let mut nodes = peers();
    nodes.push(node(reconnect_node_log, healthy_csv(final_round)));
    ReconnectValidator::new(nodes, ReconnectScenario::KillNetwork, SAVED_STATE_START_ROUND)
        .run()
        .unwrap()
}

/// Tests that a node which reconnected once and caught up with the network is valid.
#[test]
fn reconnect_success_test() {
    setup_logger(log::LevelFilter::Debug);

    let report = run(
        &[
            line(0, "STARTUP", "node started"),
            line(60, RECONNECT_START, "Reconnect started"),
            line(75, RECONNECT_FINISHED, "Reconnect finished with round 420"),
            line(76, CHANGED_TO_ACTIVE, "Platform status changed to ACTIVE"),
        ],
        500.0,
    );

    assert!(report.is_valid(), "{:?}", report.errors());
    assert!(report.errors().is_empty());
    assert!(report
        .infos()
        .iter()
        .any(|info| info == "Node 3 finished reconnect 1 in 15 seconds"));
}

/// Tests that a reconnect that never finished before the log ended makes the report invalid and names
/// the reconnect node.
#[test]
fn reconnect_unfinished_test() {
    let report = run(
        &[
            line(0, "STARTUP", "node started"),
            line(60, RECONNECT_START, "Reconnect started"),
        ],
        500.0,
    );

    assert!(!report.is_valid());
    assert!(report.errors().iter().any(|error| error.contains("Node 3")));
    assert!(report
        .errors()
        .iter()
        .any(|error| error.contains("never finished")));
}

/// Tests that a reconnected node lagging the network by more than 10 rounds is invalid.
#[test]
fn reconnect_lagging_test() {
    let report = run(
        &[
            line(60, RECONNECT_START, "Reconnect started"),
            line(75, RECONNECT_FINISHED, "Reconnect finished"),
        ],
        480.0,
    );

    assert!(!report.is_valid());
    assert!(report
        .errors()
        .iter()
        .any(|error| error.contains("lags the network minimum")));
}

/// Tests that a node which ended before the saved state it should have reconnected to is invalid.
#[test]
fn reconnect_before_saved_state_test() {
    let mut nodes: Vec<NodeData> = (0..2)
        .map(|_| node(&[], healthy_csv(60.0)))
        .collect();
    nodes.push(node(
        &[
            line(60, RECONNECT_START, "Reconnect started"),
            line(75, RECONNECT_FINISHED, "Reconnect finished"),
        ],
        healthy_csv(60.0),
    ));

    let report = ReconnectValidator::new(nodes, ReconnectScenario::KillNode, SAVED_STATE_START_ROUND)
        .run()
        .unwrap();

    assert!(!report.is_valid());
    assert!(report
        .errors()
        .iter()
        .any(|error| error.contains("before the saved state start round 100")));
}

/// Tests that a hash mismatch is an error, but the scan goes on to find a later successful attempt.
#[test]
fn hash_mismatch_then_success_test() {
    let report = run(
        &[
            line(10, RECONNECT_START, "Reconnect started"),
            line(20, RECV_STATE_HASH_MISMATCH, "Hash mismatch"),
            line(30, RECONNECT_START, "Reconnect started"),
            line(45, RECONNECT_FINISHED, "Reconnect finished"),
        ],
        495.0,
    );

    assert_eq!(report.errors().len(), 1);
    assert!(report.errors()[0].contains("hash does not match"));
    assert!(report
        .infos()
        .iter()
        .any(|info| info.starts_with("Node 3 finished reconnect 1")));
}

/// Tests that a receive-state error right after the node became active is tolerated when the network
/// was killed, but not when the node was.
#[test]
fn receive_state_error_grace_test() {
    let log = [
        line(10, RECONNECT_START, "Reconnect started"),
        line(25, RECONNECT_FINISHED, "Reconnect finished"),
        line(26, CHANGED_TO_ACTIVE, "ACTIVE"),
        line(40, RECV_STATE_ERROR, "Error while receiving a state"),
        line(50, SOCKET_EXCEPTIONS, "Connection reset"),
    ];

    let report = run(&log, 500.0);
    assert!(report.is_valid(), "{:?}", report.errors());
    assert!(report
        .infos()
        .iter()
        .any(|info| info.contains("within 30 seconds of becoming active")));

    let mut nodes = peers();
    nodes.push(node(&log, healthy_csv(500.0)));
    let report = ReconnectValidator::new(nodes, ReconnectScenario::KillNode, SAVED_STATE_START_ROUND)
        .run()
        .unwrap();
    assert!(!report.is_valid());
}

/// Tests that a tolerated receive-state error in the middle of an attempt does not abort it, so the
/// attempt's later finish still counts.
#[test]
fn tolerated_error_keeps_attempt_test() {
    // 1. The error comes 10 seconds after the node became active, while it is reconnecting.
    let report = run(
        &[
            line(0, CHANGED_TO_ACTIVE, "Platform status changed to ACTIVE"),
            line(5, RECONNECT_START, "Reconnect started"),
            line(10, RECV_STATE_ERROR, "Error while receiving a state"),
            line(20, RECONNECT_FINISHED, "Reconnect finished"),
        ],
        500.0,
    );

    // 2. The finish pairs with the start, so there is no stray finish and the duration is measured from
    //    the start.
    assert!(report.is_valid(), "{:?}", report.errors());
    assert!(report.warnings().is_empty(), "{:?}", report.warnings());
    assert!(report
        .infos()
        .iter()
        .any(|info| info == "Node 3 finished reconnect 1 in 15 seconds"));
    assert!(report
        .infos()
        .iter()
        .any(|info| info.contains("within 30 seconds of becoming active")));
}

/// Tests the transition table of the reconnect state machine.
#[test]
fn transition_table_test() {
    use regression_validation::validators::reconnect::ReconnectState::{Reconnecting, Scanning};

    assert_eq!(
        transition(Scanning, LogMarker::ReconnectStart),
        (Reconnecting, ReconnectAction::StartAttempt)
    );
    assert_eq!(
        transition(Reconnecting, LogMarker::ReconnectFinished),
        (Scanning, ReconnectAction::FinishAttempt)
    );
    assert_eq!(
        transition(Reconnecting, LogMarker::ReceiveStateIoException),
        (Scanning, ReconnectAction::AbortAttempt)
    );
    assert_eq!(
        transition(Reconnecting, LogMarker::ChangedToActive),
        (Reconnecting, ReconnectAction::RecordActivation)
    );
    assert_eq!(
        transition(Scanning, LogMarker::SyncStaleCompensationFailure),
        (Scanning, ReconnectAction::StaleCompensationFailure)
    );
    assert_eq!(
        transition(Scanning, LogMarker::PtdFinish),
        (Scanning, ReconnectAction::Ignore)
    );
}

/// Tests the receive-state error grace window.
#[test]
fn receive_state_error_tolerated_test() {
    let active = Some(run_start());
    let inside = Some(run_start() + Duration::seconds(30));
    let outside = Some(run_start() + Duration::seconds(31));

    assert!(receive_state_error_tolerated(ReconnectScenario::KillNetwork, active, inside));
    assert!(!receive_state_error_tolerated(ReconnectScenario::KillNetwork, active, outside));
    assert!(!receive_state_error_tolerated(ReconnectScenario::KillNode, active, inside));
    assert!(!receive_state_error_tolerated(ReconnectScenario::KillNetwork, None, inside));
}
