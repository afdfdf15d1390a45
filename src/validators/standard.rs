/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The validator every experiment runs: no unexpected exceptions, healthy metrics.
//!
//! Which exceptions are unexpected depends on the fault the experiment injected. Reconnect and restart
//! experiments provoke exceptions that their own validators judge, so the standard validator applies
//! the same rule those validators do (see [`ExceptionPolicy`]).

use crate::{
    config::ExperimentConfig,
    log_reader::{LogLine, LogMarker},
    node_data::NodeData,
};

use super::{
    classify_restart_exception, classify_standard_exception, node::NodeValidator, node_log_is_null,
    reconnect::{classify_peer_exception, classify_reconnect_node_exception},
    report_exceptions, ValidationReport, Validator, ValidatorError,
};

/// The rule the standard validator judges exceptions by.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExceptionPolicy {
    /// Socket exceptions are expected only while the nodes shut down at the end of the run.
    #[default]
    Plain,
    /// The last node was forced to reconnect. Socket exceptions are expected on every node, and the
    /// receive-state markers of the last node are left to the reconnect validator.
    Reconnect,
    /// Nodes were frozen and restarted, or recovered their state. Socket exceptions are expected and an
    /// oversized signed-state delete queue is a warning.
    Restart,
}

impl ExceptionPolicy {
    pub fn for_config(config: &ExperimentConfig) -> Self {
        if config.reconnect.is_some() {
            ExceptionPolicy::Reconnect
        } else if config.freeze_restart || config.recover_state {
            ExceptionPolicy::Restart
        } else {
            ExceptionPolicy::Plain
        }
    }
}

pub struct StandardValidator {
    nodes: Vec<NodeData>,
    expect_ptd_finish: bool,
    policy: ExceptionPolicy,
}

impl StandardValidator {
    pub fn new(nodes: Vec<NodeData>, expect_ptd_finish: bool) -> Self {
        Self {
            nodes,
            expect_ptd_finish,
            policy: ExceptionPolicy::Plain,
        }
    }

    pub fn with_policy(mut self, policy: ExceptionPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl Validator for StandardValidator {
    fn name(&self) -> &'static str {
        "StandardValidator"
    }

    fn validate(&mut self, report: &mut ValidationReport) -> Result<(), ValidatorError> {
        let policy = self.policy;
        let reconnect_node = self.nodes.len().saturating_sub(1);
        for (node, data) in self.nodes.iter_mut().enumerate() {
            let Some(log) = data.log.as_mut() else {
                node_log_is_null(report, node);
                continue;
            };

            let mut finished = false;
            while let Some(entry) =
                log.next_entry_containing(&[LogMarker::PtdSuccess, LogMarker::PtdFinish])?
            {
                match entry.marker() {
                    LogMarker::PtdSuccess => report.add_info(format!("Node {}: {}", node, entry.text())),
                    _ => finished = true,
                }
            }
            if self.expect_ptd_finish && !finished {
                report.add_warning(format!("Node {} never reported that the test app finished", node));
            }

            let run_end = log.last_timestamp();
            report_exceptions(report, node, "log", log.exceptions(), |exception| match policy {
                ExceptionPolicy::Plain => classify_standard_exception(exception, run_end),
                ExceptionPolicy::Reconnect if node == reconnect_node => {
                    classify_reconnect_node_exception(exception)
                }
                ExceptionPolicy::Reconnect => classify_peer_exception(exception),
                ExceptionPolicy::Restart => classify_restart_exception(exception),
            });
        }

        self.check_node_statistics(report);
        Ok(())
    }
}

impl NodeValidator for StandardValidator {
    fn nodes(&self) -> &[NodeData] {
        &self.nodes
    }
}
