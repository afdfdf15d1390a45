/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Checks that every node went through the whole state migration.

use crate::{log_reader::LogMarker, node_data::NodeData};

use super::{node_log_is_null, ValidationReport, Validator, ValidatorError};

/// The migration stages, in the order every node must log them.
pub const MIGRATION_STAGES: [LogMarker; 4] = [
    LogMarker::MigrationStartLoad,
    LogMarker::MigrationEndLoad,
    LogMarker::MigrationStartProcess,
    LogMarker::MigrationEndProcess,
];

pub struct MigrationValidator {
    nodes: Vec<NodeData>,
}

impl MigrationValidator {
    pub fn new(nodes: Vec<NodeData>) -> Self {
        Self { nodes }
    }
}

impl Validator for MigrationValidator {
    fn name(&self) -> &'static str {
        "MigrationValidator"
    }

    fn validate(&mut self, report: &mut ValidationReport) -> Result<(), ValidatorError> {
        for (node, data) in self.nodes.iter_mut().enumerate() {
            let Some(log) = data.log.as_mut() else {
                node_log_is_null(report, node);
                continue;
            };

            // Each stage is searched for after the previous one, so stages logged out of order are
            // reported as missing.
            let mut completed = true;
            for stage in MIGRATION_STAGES {
                if log.next_entry_containing(&[stage])?.is_none() {
                    report.add_error(format!("Node {} never reached migration stage {}", node, stage));
                    completed = false;
                    break;
                }
            }
            if completed {
                report.add_info(format!("Node {} completed the migration", node));
            }
        }
        Ok(())
    }
}
