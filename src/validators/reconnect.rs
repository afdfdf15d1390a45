/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Checks that the last node, after being forced to reconnect, caught back up with the rest of the network.
//!
//! ## The scan
//!
//! The last node's log is scanned by a finite state machine with two states, [`Scanning`] and
//! [`Reconnecting`]. The machine only looks at entries carrying one of [`RECONNECT_MARKERS`]; every
//! `(state, marker)` pair maps to a next state and an [action](ReconnectAction) through the table in
//! [`transition`]:
//!
//! | State | Marker | Next state | Action |
//! |---|---|---|---|
//! | Scanning | `RECONNECT_START` | Reconnecting | start an attempt |
//! | Reconnecting | `RECONNECT_START` | Reconnecting | previous attempt never finished, start another |
//! | Reconnecting | `RECONNECT_FINISHED` | Scanning | attempt succeeded, record its duration |
//! | Scanning | `RECONNECT_FINISHED` | Scanning | finish without a start |
//! | any | `RECV_STATE_ERROR` | Scanning | abort attempt, unless tolerated (below) |
//! | any | `RECV_STATE_IO_EXCEPTION` | Scanning | abort attempt |
//! | any | `RECV_STATE_HASH_MISMATCH` | Scanning | error, keep looking for the next attempt |
//! | any | `CHANGED_TO_ACTIVE` | unchanged | record activation time |
//! | any | `SYNC_STALE_COMPENSATION_*` | unchanged | warning on success, error on failure |
//!
//! A `RECV_STATE_ERROR` within [`ACTIVE_GRACE_SECS`] seconds after the latest `CHANGED_TO_ACTIVE` is
//! expected churn and only reported as info, except in the [`KillNode`](ReconnectScenario::KillNode)
//! scenario, which tolerates no receive-state error. A tolerated error leaves the machine in its state,
//! so the attempt in progress can still finish.
//!
//! ## After the scan
//!
//! The experiment is valid only if:
//! 1. At least one reconnect attempt finished, and no attempt was left unfinished.
//! 2. The reconnected node's final `roundSup` is at least the experiment's saved-state start round.
//! 3. The reconnected node's final `roundSup` lags the minimum final `roundSup` of the other nodes by at
//!    most [`MAX_ROUND_LAG`] rounds.
//! 4. No node logged an exception outside of the whitelist (socket exceptions, acceptable testing
//!    exceptions, and the reconnect markers the scan already judged).

use chrono::{Duration, NaiveDateTime};

use crate::{
    config::ReconnectScenario,
    csv_reader,
    log_reader::{LogEntry, LogLine, LogMarker},
    logging,
    node_data::NodeData,
};

use super::{
    node_log_is_null, report_exceptions, ExceptionVerdict, ValidationReport, Validator,
    ValidatorError,
};

use ReconnectState::{Reconnecting, Scanning};

pub const ACTIVE_GRACE_SECS: i64 = 30;
pub const MAX_ROUND_LAG: f64 = 10.0;

/// The markers the reconnect scan reacts to.
pub const RECONNECT_MARKERS: [LogMarker; 8] = [
    LogMarker::ReconnectStart,
    LogMarker::ReconnectFinished,
    LogMarker::ReceiveStateError,
    LogMarker::ReceiveStateIoException,
    LogMarker::ReceiveStateHashMismatch,
    LogMarker::ChangedToActive,
    LogMarker::SyncStaleCompensationSuccess,
    LogMarker::SyncStaleCompensationFailure,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconnectState {
    Scanning,
    Reconnecting,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconnectAction {
    StartAttempt,
    RestartUnfinishedAttempt,
    FinishAttempt,
    FinishWithoutStart,
    ReceiveStateError,
    AbortAttempt,
    HashMismatch,
    RecordActivation,
    StaleCompensationSuccess,
    StaleCompensationFailure,
    Ignore,
}

/// The reconnect state machine's transition table.
pub fn transition(state: ReconnectState, marker: LogMarker) -> (ReconnectState, ReconnectAction) {
    match (state, marker) {
        (Scanning, LogMarker::ReconnectStart) => (Reconnecting, ReconnectAction::StartAttempt),
        (Reconnecting, LogMarker::ReconnectStart) => {
            (Reconnecting, ReconnectAction::RestartUnfinishedAttempt)
        }
        (Reconnecting, LogMarker::ReconnectFinished) => (Scanning, ReconnectAction::FinishAttempt),
        (Scanning, LogMarker::ReconnectFinished) => (Scanning, ReconnectAction::FinishWithoutStart),
        (_, LogMarker::ReceiveStateError) => (Scanning, ReconnectAction::ReceiveStateError),
        (_, LogMarker::ReceiveStateIoException) => (Scanning, ReconnectAction::AbortAttempt),
        (_, LogMarker::ReceiveStateHashMismatch) => (Scanning, ReconnectAction::HashMismatch),
        (state, LogMarker::ChangedToActive) => (state, ReconnectAction::RecordActivation),
        (state, LogMarker::SyncStaleCompensationSuccess) => {
            (state, ReconnectAction::StaleCompensationSuccess)
        }
        (state, LogMarker::SyncStaleCompensationFailure) => {
            (state, ReconnectAction::StaleCompensationFailure)
        }
        (state, _) => (state, ReconnectAction::Ignore),
    }
}

/// Whether a receive-state error at `at` is expected churn after the node became active at `active`.
pub fn receive_state_error_tolerated(
    scenario: ReconnectScenario,
    active: Option<NaiveDateTime>,
    at: Option<NaiveDateTime>,
) -> bool {
    if scenario == ReconnectScenario::KillNode {
        return false;
    }
    match (active, at) {
        (Some(active), Some(at)) => {
            at >= active && at - active <= Duration::seconds(ACTIVE_GRACE_SECS)
        }
        _ => false,
    }
}

pub struct ReconnectValidator {
    nodes: Vec<NodeData>,
    scenario: ReconnectScenario,
    saved_state_start_round: u64,
}

impl ReconnectValidator {
    pub fn new(
        nodes: Vec<NodeData>,
        scenario: ReconnectScenario,
        saved_state_start_round: u64,
    ) -> Self {
        Self {
            nodes,
            scenario,
            saved_state_start_round,
        }
    }

    /// Run the state machine over the reconnect node's log. Returns the number of finished attempts.
    fn scan(
        &mut self,
        node: usize,
        report: &mut ValidationReport,
    ) -> Result<Option<usize>, ValidatorError> {
        let scenario = self.scenario;
        let Some(log) = self.nodes[node].log.as_mut() else {
            node_log_is_null(report, node);
            return Ok(None);
        };

        let mut state = Scanning;
        let mut attempt_started: Option<NaiveDateTime> = None;
        let mut last_active: Option<NaiveDateTime> = None;
        let mut finished = 0;

        while let Some(entry) = log.next_entry_containing(&RECONNECT_MARKERS)? {
            let (mut next, action) = transition(state, entry.marker());
            let at = entry.timestamp();
            match action {
                ReconnectAction::StartAttempt => attempt_started = at,
                ReconnectAction::RestartUnfinishedAttempt => {
                    report.add_error(format!(
                        "Node {} started a new reconnect before the previous one finished",
                        node
                    ));
                    attempt_started = at;
                }
                ReconnectAction::FinishAttempt => {
                    finished += 1;
                    let seconds = attempt_started
                        .zip(at)
                        .map(|(start, end)| (end - start).num_seconds());
                    logging::log_reconnect(logging::RECONNECT_FINISHED, node, seconds);
                    match seconds {
                        Some(seconds) => report.add_info(format!(
                            "Node {} finished reconnect {} in {} seconds",
                            node, finished, seconds
                        )),
                        None => {
                            report.add_info(format!("Node {} finished reconnect {}", node, finished))
                        }
                    }
                    attempt_started = None;
                }
                ReconnectAction::FinishWithoutStart => report.add_warning(format!(
                    "Node {} finished a reconnect that was never started: {}",
                    node,
                    entry.text()
                )),
                ReconnectAction::ReceiveStateError => {
                    if receive_state_error_tolerated(scenario, last_active, at) {
                        report.add_info(format!(
                            "Node {} failed to receive state within {} seconds of becoming active: {}",
                            node,
                            ACTIVE_GRACE_SECS,
                            entry.text()
                        ));
                        next = state;
                    } else {
                        logging::log_reconnect(logging::RECONNECT_ABORTED, node, None);
                        report.add_error(format!(
                            "Node {} failed to receive state: {}",
                            node,
                            entry.text()
                        ));
                        attempt_started = None;
                    }
                }
                ReconnectAction::AbortAttempt => {
                    logging::log_reconnect(logging::RECONNECT_ABORTED, node, None);
                    report.add_error(format!(
                        "Node {} hit an I/O exception while receiving state: {}",
                        node,
                        entry.text()
                    ));
                    attempt_started = None;
                }
                ReconnectAction::HashMismatch => {
                    report.add_error(format!(
                        "Node {} received a state whose hash does not match: {}",
                        node,
                        entry.text()
                    ));
                    attempt_started = None;
                }
                ReconnectAction::RecordActivation => last_active = at,
                ReconnectAction::StaleCompensationSuccess => report.add_warning(format!(
                    "Node {} compensated for stale events: {}",
                    node,
                    entry.text()
                )),
                ReconnectAction::StaleCompensationFailure => report.add_error(format!(
                    "Node {} failed to compensate for stale events: {}",
                    node,
                    entry.text()
                )),
                ReconnectAction::Ignore => {}
            }
            state = next;
        }

        if state == Reconnecting {
            report.add_error(format!(
                "Node {} started reconnecting but never finished before its log ended",
                node
            ));
        }

        report_exceptions(report, node, "log", log.exceptions(), classify_reconnect_node_exception);
        Ok(Some(finished))
    }

    fn check_rounds(&self, reconnect_node: usize, report: &mut ValidationReport) {
        let final_round = |node: usize| {
            self.nodes[node]
                .csv
                .as_ref()
                .and_then(|csv| csv.column(csv_reader::ROUND_SUPER_MAJORITY))
                .map(|column| column.last_entry_as_double())
        };

        let Some(reconnected_round) = final_round(reconnect_node) else {
            report.add_error(format!(
                "Node {} has no {} metric, cannot check that it caught up",
                reconnect_node,
                csv_reader::ROUND_SUPER_MAJORITY
            ));
            return;
        };

        if reconnected_round < self.saved_state_start_round as f64 {
            report.add_error(format!(
                "Node {} ended at round {} which is before the saved state start round {}",
                reconnect_node, reconnected_round, self.saved_state_start_round
            ));
        }

        let min_other_round = (0..reconnect_node)
            .filter_map(final_round)
            .reduce(f64::min);
        match min_other_round {
            Some(min_other_round) if min_other_round - reconnected_round > MAX_ROUND_LAG => {
                report.add_error(format!(
                    "Node {} ended at round {} which lags the network minimum {} by more than {} rounds",
                    reconnect_node, reconnected_round, min_other_round, MAX_ROUND_LAG
                ))
            }
            Some(min_other_round) => report.add_info(format!(
                "Node {} ended at round {}, network minimum is {}",
                reconnect_node, reconnected_round, min_other_round
            )),
            None => report.add_warning(format!(
                "No other node has a {} metric to compare node {} against",
                csv_reader::ROUND_SUPER_MAJORITY,
                reconnect_node
            )),
        }
    }
}

impl Validator for ReconnectValidator {
    fn name(&self) -> &'static str {
        "ReconnectValidator"
    }

    fn validate(&mut self, report: &mut ValidationReport) -> Result<(), ValidatorError> {
        let Some(reconnect_node) = self.nodes.len().checked_sub(1) else {
            report.add_error("Experiment has no nodes");
            return Ok(());
        };

        for node in 0..reconnect_node {
            let Some(log) = self.nodes[node].log.as_mut() else {
                node_log_is_null(report, node);
                continue;
            };
            log.read_fully()?;
            report_exceptions(report, node, "log", log.exceptions(), classify_peer_exception);
        }

        let finished = self.scan(reconnect_node, report)?;
        if finished == Some(0) {
            report.add_error(format!("Node {} never finished a reconnect", reconnect_node));
        }

        self.check_rounds(reconnect_node, report);
        Ok(())
    }
}

/// Exceptions on the reconnect node. The receive-state markers were already judged by the scan.
pub(crate) fn classify_reconnect_node_exception(entry: &LogEntry) -> ExceptionVerdict {
    match entry.marker() {
        LogMarker::SocketException | LogMarker::TestingExceptionsAcceptable => ExceptionVerdict::Info,
        LogMarker::ReceiveStateError
        | LogMarker::ReceiveStateIoException
        | LogMarker::ReceiveStateHashMismatch
        | LogMarker::SyncStaleCompensationFailure => ExceptionVerdict::Ignore,
        _ => ExceptionVerdict::Error,
    }
}

/// Exceptions on the nodes that stayed up. Peers see their connections to the reconnecting node break.
pub(crate) fn classify_peer_exception(entry: &LogEntry) -> ExceptionVerdict {
    match entry.marker() {
        LogMarker::SocketException | LogMarker::TestingExceptionsAcceptable => ExceptionVerdict::Info,
        _ => ExceptionVerdict::Error,
    }
}
