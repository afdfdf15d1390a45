/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The outcome of validating a whole experiment.
//!
//! An [`ExperimentReport`] collects the [`ValidationReport`] of every validator that ran, and every
//! validator that could not run because reading its inputs failed. The two are kept apart: a validator
//! that could not run is an exception against the experiment, not a finding about it. Either way, the
//! experiment fails.

use std::fmt::{self, Display, Formatter, Write};

use crate::validators::{ValidationReport, ValidatorError};

/// Overall outcome of an experiment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    PassedWithWarnings,
    Failed,
}

impl Display for Verdict {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verdict::Passed => "PASSED",
            Verdict::PassedWithWarnings => "PASSED WITH WARNINGS",
            Verdict::Failed => "FAILED",
        })
    }
}

/// A validator that failed to run.
#[derive(Debug)]
pub struct ValidatorFailure {
    pub validator: &'static str,
    pub error: ValidatorError,
}

#[derive(Debug, Default)]
pub struct ExperimentReport {
    reports: Vec<ValidationReport>,
    failures: Vec<ValidatorFailure>,
}

impl ExperimentReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_report(&mut self, report: ValidationReport) {
        self.reports.push(report)
    }

    pub fn add_failure(&mut self, validator: &'static str, error: ValidatorError) {
        self.failures.push(ValidatorFailure { validator, error })
    }

    pub fn reports(&self) -> &[ValidationReport] {
        &self.reports
    }

    pub fn failures(&self) -> &[ValidatorFailure] {
        &self.failures
    }

    /// The report of the validator named `validator`, if it ran.
    pub fn report(&self, validator: &str) -> Option<&ValidationReport> {
        self.reports.iter().find(|report| report.validator() == validator)
    }

    pub fn error_count(&self) -> usize {
        self.reports.iter().map(|report| report.errors().len()).sum()
    }

    pub fn warning_count(&self) -> usize {
        self.reports.iter().map(|report| report.warnings().len()).sum()
    }

    pub fn verdict(&self) -> Verdict {
        if !self.failures.is_empty() || self.reports.iter().any(|report| !report.is_valid()) {
            Verdict::Failed
        } else if self.warning_count() > 0 {
            Verdict::PassedWithWarnings
        } else {
            Verdict::Passed
        }
    }

    /// Concatenate every validator's messages into a plain-text report, errors first.
    pub fn render(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = writeln!(out, "Experiment {}", self.verdict());

        for failure in &self.failures {
            let _ = writeln!(out, "\n== {}: exception ==", failure.validator);
            let _ = writeln!(out, "EXCEPTION: {}", failure.error);
        }

        for report in &self.reports {
            let status = if report.is_valid() { "valid" } else { "invalid" };
            let _ = writeln!(out, "\n== {}: {} ==", report.validator(), status);
            for error in report.errors() {
                let _ = writeln!(out, "ERROR: {}", error);
            }
            for warning in report.warnings() {
                let _ = writeln!(out, "WARNING: {}", warning);
            }
            for info in report.infos() {
                let _ = writeln!(out, "INFO: {}", info);
            }
        }
        out
    }
}
