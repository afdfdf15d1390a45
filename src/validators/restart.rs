/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Checks that every node, after a freeze, restarted from exactly the states it froze.
//!
//! Before freezing, a node logs `FREEZE_STATE_SAVED` with the round of the state it is about to save.
//! After restarting, it logs `LOAD_RESTART` with the round of the state it loaded. Both round numbers
//! end their messages. A node is consistent if the rounds it loaded are the rounds it froze, in the same
//! order.

use crate::{
    log_reader::{LogEntry, LogLine, LogMarker},
    node_data::NodeData,
};

use super::{
    classify_restart_exception, node_log_is_null, report_exceptions, ValidationReport, Validator,
    ValidatorError,
};

pub struct RestartValidator {
    nodes: Vec<NodeData>,
}

impl RestartValidator {
    pub fn new(nodes: Vec<NodeData>) -> Self {
        Self { nodes }
    }
}

impl Validator for RestartValidator {
    fn name(&self) -> &'static str {
        "RestartValidator"
    }

    fn validate(&mut self, report: &mut ValidationReport) -> Result<(), ValidatorError> {
        for (node, data) in self.nodes.iter_mut().enumerate() {
            let Some(log) = data.log.as_mut() else {
                node_log_is_null(report, node);
                continue;
            };

            let mut freeze_rounds = Vec::new();
            let mut load_rounds = Vec::new();
            while let Some(entry) =
                log.next_entry_containing(&[LogMarker::FreezeStateSaved, LogMarker::LoadRestart])?
            {
                let Some(round) = entry.trailing_number() else {
                    report.add_error(format!(
                        "Node {} logged {} without a round number: {}",
                        node,
                        entry.marker(),
                        entry.text()
                    ));
                    continue;
                };
                match entry.marker() {
                    LogMarker::FreezeStateSaved => freeze_rounds.push(round),
                    _ => load_rounds.push(round),
                }
            }

            check_rounds(report, node, &freeze_rounds, &load_rounds);
            report_exceptions(report, node, "log", log.exceptions(), |exception: &LogEntry| {
                classify_restart_exception(exception)
            });
        }
        Ok(())
    }
}

fn check_rounds(report: &mut ValidationReport, node: usize, freeze_rounds: &[u64], load_rounds: &[u64]) {
    if freeze_rounds.is_empty() {
        report.add_error(format!("Node {} never saved a freeze state", node));
    } else if freeze_rounds != load_rounds {
        report.add_error(format!(
            "Node {} froze at rounds {:?} but restarted from rounds {:?}",
            node, freeze_rounds, load_rounds
        ));
    } else {
        report.add_info(format!(
            "Node {} restarted from its frozen rounds {:?}",
            node, freeze_rounds
        ));
    }
}
