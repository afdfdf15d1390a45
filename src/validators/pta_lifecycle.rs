/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Checks that every node ended with the same view of the test application's entities.
//!
//! Node 0's expected map is the baseline. Every other node's map is compared against it:
//! 1. **Key sets**: a key present on one side only is tolerated if the side that has it last saw the
//!    entity deleted or expired. Any other missing key is an error naming both nodes.
//! 2. **Fields**: for every shared key, the entity type, errored flag, content hash, latest handled
//!    status, and history handled status must be equal. Each differing field is its own error.
//! 3. **Rejections**: on every node, an entity whose latest handled transaction was rejected must have a
//!    deleting or expiring transaction in its history.
//! 4. **Errored entities**: an entity errored on both sides is consistent, but suspicious. The root
//!    cause on each side is diagnosed and reported as a warning.

use std::fmt::Debug;

use crate::expected_map::{ExpectedMap, ExpectedMapData, ExpectedValue, TransactionState};

use super::{ValidationReport, Validator, ValidatorError};

const BASELINE: usize = 0;

pub struct PtaLifecycleValidator {
    maps: ExpectedMapData,
}

impl PtaLifecycleValidator {
    pub fn new(maps: ExpectedMapData) -> Self {
        Self { maps }
    }
}

impl Validator for PtaLifecycleValidator {
    fn name(&self) -> &'static str {
        "PTALifecycleValidator"
    }

    fn validate(&mut self, report: &mut ValidationReport) -> Result<(), ValidatorError> {
        for node in 0..self.maps.node_count() {
            match self.maps.map(node) {
                Some(map) => check_rejections(report, node, map),
                None => report.add_error(format!("Node {} expected map is missing", node)),
            }
        }

        let Some(baseline) = self.maps.map(BASELINE) else {
            return Ok(());
        };
        for node in 1..self.maps.node_count() {
            let Some(map) = self.maps.map(node) else {
                continue;
            };
            check_missing_keys(report, (BASELINE, baseline), (node, map));
            check_missing_keys(report, (node, map), (BASELINE, baseline));
            check_shared_keys(report, baseline, node, map);
        }
        Ok(())
    }
}

/// Report the keys of `present` that `missing` lacks, unless they were legitimately removed.
fn check_missing_keys(
    report: &mut ValidationReport,
    (present_node, present): (usize, &ExpectedMap),
    (missing_node, missing): (usize, &ExpectedMap),
) {
    let mut tolerated = 0;
    let mut missing_keys = Vec::new();
    for (key, value) in present {
        if missing.contains_key(key) {
            continue;
        }
        match value.last_transaction_type() {
            Some(transaction_type) if transaction_type.removes_entity() => tolerated += 1,
            _ => missing_keys.push(key.to_string()),
        }
    }

    if tolerated > 0 {
        report.add_info(format!(
            "Node {} lacks {} removed entities that node {} still has",
            missing_node, tolerated, present_node
        ));
    }
    if !missing_keys.is_empty() {
        report.add_error(format!(
            "Node {} is missing keys that node {} has: [{}]",
            missing_node,
            present_node,
            missing_keys.join(", ")
        ));
    }
}

fn check_shared_keys(report: &mut ValidationReport, baseline: &ExpectedMap, node: usize, map: &ExpectedMap) {
    for (key, expected) in baseline {
        let Some(actual) = map.get(key) else {
            continue;
        };

        let mut compare = |field: &str, expected: &dyn Debug, actual: &dyn Debug, equal: bool| {
            if !equal {
                report.add_error(format!(
                    "Entity {} {} differs: node {} has {:?}, node {} has {:?}",
                    key, field, BASELINE, expected, node, actual
                ));
            }
        };
        compare(
            "entityType",
            &expected.entity_type,
            &actual.entity_type,
            expected.entity_type == actual.entity_type,
        );
        compare(
            "isErrored",
            &expected.is_errored,
            &actual.is_errored,
            expected.is_errored == actual.is_errored,
        );
        compare("hash", &expected.hash, &actual.hash, expected.hash == actual.hash);
        compare(
            "latestHandledStatus",
            &expected.latest_handled_status,
            &actual.latest_handled_status,
            expected.latest_handled_status == actual.latest_handled_status,
        );
        compare(
            "historyHandledStatus",
            &expected.history_handled_status,
            &actual.history_handled_status,
            expected.history_handled_status == actual.history_handled_status,
        );

        if expected.is_errored && actual.is_errored {
            report.add_warning(format!(
                "Entity {} is errored on node {} ({}) and node {} ({})",
                key,
                BASELINE,
                diagnose(expected),
                node,
                diagnose(actual)
            ));
        }
    }
}

fn check_rejections(report: &mut ValidationReport, node: usize, map: &ExpectedMap) {
    for (key, value) in map {
        if !is_rejected(value) {
            continue;
        }
        let history_removes = value
            .history_handled_status
            .is_some_and(|status| status.transaction_type.removes_entity());
        if !history_removes {
            report.add_error(format!(
                "Node {} entity {} was rejected but its history has no delete or expire: {}",
                node,
                key,
                describe_history(value)
            ));
        }
    }
}

fn is_rejected(value: &ExpectedValue) -> bool {
    value
        .latest_handled_status
        .is_some_and(|status| status.transaction_state == TransactionState::HandleRejected)
}

fn describe_history(value: &ExpectedValue) -> String {
    value
        .history_handled_status
        .map(|status| status.to_string())
        .unwrap_or_else(|| "none".to_string())
}

/// Human-readable root cause of an errored entity.
pub fn diagnose(value: &ExpectedValue) -> &'static str {
    let handled = value.latest_handled_status.map(|status| status.transaction_state);
    let submitted = value.latest_submit_status.map(|status| status.transaction_state);

    match (handled, submitted) {
        (Some(TransactionState::InvalidSig), _) => "transaction had an invalid signature",
        (Some(TransactionState::HandleFailed), _) => "handling the transaction failed",
        (Some(TransactionState::HandleRejected), _) => "transaction was rejected but the entity was not deleted",
        (Some(TransactionState::HandleEntityTypeMismatch), _) => {
            "transaction targeted an entity of another type"
        }
        (_, Some(TransactionState::SubmissionFailed)) => "transaction could not be submitted",
        _ => "unknown cause",
    }
}
