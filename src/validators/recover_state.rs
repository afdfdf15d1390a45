/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Checks the recover-from-saved-state scenario.
//!
//! Every node rebuilds its state from a saved state plus the event stream, saves the recovered state
//! (logging `STATE_SAVED` with its round), and then resumes the test application until it finishes
//! (`PTD_FINISH`). All nodes must have recovered the same round.

use std::collections::BTreeMap;

use crate::{
    log_reader::{LogEntry, LogLine, LogMarker},
    node_data::NodeData,
};

use super::{
    classify_restart_exception, node_log_is_null, report_exceptions, ValidationReport, Validator,
    ValidatorError,
};

pub struct RecoverStateValidator {
    nodes: Vec<NodeData>,
}

impl RecoverStateValidator {
    pub fn new(nodes: Vec<NodeData>) -> Self {
        Self { nodes }
    }
}

impl Validator for RecoverStateValidator {
    fn name(&self) -> &'static str {
        "RecoverStateValidator"
    }

    fn validate(&mut self, report: &mut ValidationReport) -> Result<(), ValidatorError> {
        // Recovered round -> nodes that recovered it.
        let mut recovered: BTreeMap<u64, Vec<usize>> = BTreeMap::new();

        for (node, data) in self.nodes.iter_mut().enumerate() {
            let Some(log) = data.log.as_mut() else {
                node_log_is_null(report, node);
                continue;
            };

            match log.next_entry_containing(&[LogMarker::StateSaved])? {
                Some(entry) => match entry.trailing_number() {
                    Some(round) => recovered.entry(round).or_default().push(node),
                    None => report.add_error(format!(
                        "Node {} saved its recovered state without a round number: {}",
                        node,
                        entry.text()
                    )),
                },
                None => report.add_error(format!("Node {} never saved a recovered state", node)),
            }

            if log.next_entry_containing(&[LogMarker::PtdFinish])?.is_none() {
                report.add_error(format!("Node {} did not finish after recovering", node));
            }

            log.read_fully()?;
            report_exceptions(report, node, "log", log.exceptions(), |exception: &LogEntry| {
                classify_restart_exception(exception)
            });
        }

        match recovered.len() {
            0 => {}
            1 => {
                if let Some(round) = recovered.keys().next() {
                    report.add_info(format!("All nodes recovered round {}", round));
                }
            }
            _ => report.add_error(format!(
                "Nodes recovered different rounds (round -> nodes): {:?}",
                recovered
            )),
        }
        Ok(())
    }
}
