/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Reports how nodes dealt with stale events received through gossip.
//!
//! A node that receives events too old to be used compensates by syncing them again. Succeeding at this
//! is legal, but a sign that the node fell behind (warning). Failing leaves the node unable to progress
//! (error).

use crate::{
    log_reader::{LogLine, LogMarker},
    node_data::NodeData,
};

use super::{node_log_is_null, ValidationReport, Validator, ValidatorError};

pub struct GossipCompensationValidator {
    nodes: Vec<NodeData>,
}

impl GossipCompensationValidator {
    pub fn new(nodes: Vec<NodeData>) -> Self {
        Self { nodes }
    }
}

impl Validator for GossipCompensationValidator {
    fn name(&self) -> &'static str {
        "GossipCompensationValidator"
    }

    fn validate(&mut self, report: &mut ValidationReport) -> Result<(), ValidatorError> {
        for (node, data) in self.nodes.iter_mut().enumerate() {
            let Some(log) = data.log.as_mut() else {
                node_log_is_null(report, node);
                continue;
            };

            while let Some(entry) = log.next_entry_containing(&[
                LogMarker::SyncStaleCompensationSuccess,
                LogMarker::SyncStaleCompensationFailure,
            ])? {
                match entry.marker() {
                    LogMarker::SyncStaleCompensationSuccess => report.add_warning(format!(
                        "Node {} compensated for stale events: {}",
                        node,
                        entry.text()
                    )),
                    _ => report.add_error(format!(
                        "Node {} failed to compensate for stale events: {}",
                        node,
                        entry.text()
                    )),
                }
            }
        }
        Ok(())
    }
}
