/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Validators for experiments that drive the services layer: the HAPI client test suites, and the
//! services nodes they talk to (HGCAA).
//!
//! A HAPI client log is a sequence of suite blocks. Each block starts with `SUITE_START` and ends with
//! `SUITE_PASSED` or `SUITE_FAILED`; in between, the client logs `WRONG_STATUS` for each transaction that
//! got an unexpected response code, and `EXCEPTION` for each client-side failure. Lines that name no
//! suite (stack traces, for example) belong to the suite that was started last.

use std::collections::BTreeMap;

use crate::{
    log_reader::{HapiClientEntry, LogEntry, LogLine, LogMarker},
    node_data::NodeData,
};

use super::{
    node_log_is_null, report_exceptions, ExceptionVerdict, ValidationReport, Validator,
    ValidatorError,
};

/// Outcome counts of one suite.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SuiteCounts {
    pub started: usize,
    pub passed: usize,
    pub failed: usize,
    pub wrong_status: usize,
    pub exceptions: usize,
}

/// Tally every suite block of one client log, keyed by suite name.
pub fn count_suites(entries: &[HapiClientEntry]) -> BTreeMap<String, SuiteCounts> {
    let mut suites: BTreeMap<String, SuiteCounts> = BTreeMap::new();
    let mut current: Option<String> = None;

    for entry in entries {
        let suite = match entry.suite() {
            Some(suite) => suite.to_string(),
            None => match &current {
                Some(suite) => suite.clone(),
                None => continue,
            },
        };

        match entry.marker() {
            LogMarker::SuiteStart => {
                suites.entry(suite.clone()).or_default().started += 1;
                current = Some(suite);
            }
            LogMarker::SuitePassed => suites.entry(suite).or_default().passed += 1,
            LogMarker::SuiteFailed => suites.entry(suite).or_default().failed += 1,
            LogMarker::WrongStatus => suites.entry(suite).or_default().wrong_status += 1,
            _ if entry.is_exception() => suites.entry(suite).or_default().exceptions += 1,
            _ => {}
        }
    }
    suites
}

pub struct HapiClientValidator {
    nodes: Vec<NodeData>,
}

impl HapiClientValidator {
    pub fn new(nodes: Vec<NodeData>) -> Self {
        Self { nodes }
    }
}

impl Validator for HapiClientValidator {
    fn name(&self) -> &'static str {
        "HAPIClientValidator"
    }

    fn validate(&mut self, report: &mut ValidationReport) -> Result<(), ValidatorError> {
        let mut clients = 0;
        for (node, data) in self.nodes.iter_mut().enumerate() {
            // Clients only run next to some of the nodes.
            let Some(client) = data.hapi_client.as_mut() else {
                continue;
            };
            clients += 1;

            let mut entries = Vec::new();
            while let Some(entry) = client.next_entry()? {
                entries.push(entry);
            }

            for (suite, counts) in count_suites(&entries) {
                report.add_info(format!(
                    "Node {} suite {}: {} passed, {} failed, {} wrong status, {} exceptions",
                    node, suite, counts.passed, counts.failed, counts.wrong_status, counts.exceptions
                ));
                if counts.failed > 0 {
                    report.add_error(format!("Node {} suite {} failed", node, suite));
                }
                if counts.wrong_status > 0 {
                    report.add_warning(format!(
                        "Node {} suite {} got {} unexpected response statuses",
                        node, suite, counts.wrong_status
                    ));
                }
                if counts.started > counts.passed + counts.failed {
                    report.add_warning(format!("Node {} suite {} never finished", node, suite));
                }
            }

            report_exceptions(report, node, "HAPI client", client.exceptions(), classify_client_exception);
        }

        if clients == 0 {
            report.add_error("No node has a HAPI client log");
        }
        Ok(())
    }
}

fn classify_client_exception(entry: &HapiClientEntry) -> ExceptionVerdict {
    match entry.marker() {
        LogMarker::SocketException | LogMarker::TestingExceptionsAcceptable => ExceptionVerdict::Info,
        _ => ExceptionVerdict::Error,
    }
}

/// Checks the logs of the services nodes a HAPI client experiment ran against.
pub struct HgcaaValidator {
    nodes: Vec<NodeData>,
}

impl HgcaaValidator {
    pub fn new(nodes: Vec<NodeData>) -> Self {
        Self { nodes }
    }
}

impl Validator for HgcaaValidator {
    fn name(&self) -> &'static str {
        "HGCAAValidator"
    }

    fn validate(&mut self, report: &mut ValidationReport) -> Result<(), ValidatorError> {
        for (node, data) in self.nodes.iter_mut().enumerate() {
            let Some(log) = data.log.as_mut() else {
                node_log_is_null(report, node);
                continue;
            };

            log.read_fully()?;
            report_exceptions(report, node, "log", log.exceptions(), |exception: &LogEntry| {
                match exception.marker() {
                    LogMarker::SocketException | LogMarker::TestingExceptionsAcceptable => {
                        ExceptionVerdict::Ignore
                    }
                    _ => ExceptionVerdict::Error,
                }
            });
        }
        Ok(())
    }
}
