/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Exceptions that escaped the platform log and only made it to a node's stdout.

use crate::node_data::NodeData;

use super::{
    classify_standard_exception, report_exceptions, ValidationReport, Validator, ValidatorError,
};

pub struct StdoutValidator {
    nodes: Vec<NodeData>,
}

impl StdoutValidator {
    pub fn new(nodes: Vec<NodeData>) -> Self {
        Self { nodes }
    }
}

impl Validator for StdoutValidator {
    fn name(&self) -> &'static str {
        "StdoutValidator"
    }

    fn validate(&mut self, report: &mut ValidationReport) -> Result<(), ValidatorError> {
        for (node, data) in self.nodes.iter_mut().enumerate() {
            // A node run without stdout capture has nothing to check.
            let Some(stdout) = data.stdout.as_mut() else {
                continue;
            };

            stdout.read_fully()?;
            let run_end = stdout.last_timestamp();
            report_exceptions(report, node, "stdout", stdout.exceptions(), |exception| {
                classify_standard_exception(exception, run_end)
            });
        }
        Ok(())
    }
}
