/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The contract shared by all checks, and the protocol-specific validators that implement it.
//!
//! A [`Validator`] owns its inputs (readers, snapshots, and the part of the experiment configuration it
//! needs) and produces a [`ValidationReport`]: three ordered lists of info, warning, and error messages
//! plus a validity verdict.
//!
//! ## Validity
//!
//! [`ValidationReport::is_valid`] is true only if the validator *ran to completion* and recorded *no
//! errors*. Separating the two lets a report that was cut short still carry its partial findings without
//! being treated as passing.
//!
//! ## Message severities
//!
//! - **Error**: missing input for a node, or a broken protocol invariant. Makes the report invalid.
//! - **Warning**: advisory threshold breach or suspicious-but-legal behavior.
//! - **Info**: tolerated divergence and progress notes.
//!
//! ## Failures
//!
//! Business-logic findings are never returned as `Err`. [`Validator::validate`] only fails with a
//! [`ValidatorError`] when reading an underlying stream fails.

use std::{
    fmt::{self, Display, Formatter},
    io,
};

use chrono::{Duration, NaiveDateTime};

use crate::{
    expected_map::SnapshotError,
    log_reader::{LogEntry, LogLine, LogMarker},
};

pub mod gossip_compensation;
pub mod hapi_client;
pub mod migration;
pub mod node;
pub mod pta_lifecycle;
pub mod reconnect;
pub mod recover_state;
pub mod restart;
pub mod standard;
pub mod stdout;
pub mod streaming_server;
pub mod throttle;

/// Implemented by every check that runs over an experiment's artifacts.
pub trait Validator: Send {
    /// Name of the validator, used in reports and logs.
    fn name(&self) -> &'static str;

    /// Perform the check, appending findings to `report`.
    ///
    /// Readers are consumed in the process, so calling this twice on the same validator does not
    /// repeat the check.
    fn validate(&mut self, report: &mut ValidationReport) -> Result<(), ValidatorError>;

    /// Perform the check and return the completed report.
    fn run(&mut self) -> Result<ValidationReport, ValidatorError> {
        let mut report = ValidationReport::new(self.name());
        self.validate(&mut report)?;
        report.mark_validated();
        Ok(report)
    }
}

/// Findings of one validator run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationReport {
    validator: &'static str,
    infos: Vec<String>,
    warnings: Vec<String>,
    errors: Vec<String>,
    validated: bool,
}

impl ValidationReport {
    pub fn new(validator: &'static str) -> Self {
        Self {
            validator,
            infos: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
            validated: false,
        }
    }

    pub fn validator(&self) -> &'static str {
        self.validator
    }

    pub fn add_info(&mut self, message: impl Into<String>) {
        self.infos.push(message.into())
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into())
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into())
    }

    pub fn infos(&self) -> &[String] {
        &self.infos
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn is_validated(&self) -> bool {
        self.validated
    }

    pub fn is_valid(&self) -> bool {
        self.validated && self.errors.is_empty()
    }

    pub(crate) fn mark_validated(&mut self) {
        self.validated = true
    }
}

/// Enumerates the ways reading a validator's inputs can fail.
#[derive(Debug)]
pub enum ValidatorError {
    /// A log or artifact stream could not be read.
    Io(io::Error),

    /// A metrics CSV could not be read.
    Csv(csv::Error),

    /// The test application's JSON configuration is malformed.
    AppConfig(serde_json::Error),

    /// See: [`SnapshotError`].
    Snapshot(SnapshotError),

    /// An input that the validator cannot run without was not provided at all.
    MissingInput { what: &'static str },
}

impl From<io::Error> for ValidatorError {
    fn from(value: io::Error) -> Self {
        ValidatorError::Io(value)
    }
}

impl From<csv::Error> for ValidatorError {
    fn from(value: csv::Error) -> Self {
        ValidatorError::Csv(value)
    }
}

impl From<serde_json::Error> for ValidatorError {
    fn from(value: serde_json::Error) -> Self {
        ValidatorError::AppConfig(value)
    }
}

impl From<SnapshotError> for ValidatorError {
    fn from(value: SnapshotError) -> Self {
        ValidatorError::Snapshot(value)
    }
}

impl Display for ValidatorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ValidatorError::Io(err) => write!(f, "failed to read an input stream: {}", err),
            ValidatorError::Csv(err) => write!(f, "failed to read a metrics CSV: {}", err),
            ValidatorError::AppConfig(err) => write!(f, "malformed application config: {}", err),
            ValidatorError::Snapshot(err) => Display::fmt(err, f),
            ValidatorError::MissingInput { what } => write!(f, "missing input: {}", what),
        }
    }
}

impl std::error::Error for ValidatorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ValidatorError::Io(err) => Some(err),
            ValidatorError::Csv(err) => Some(err),
            ValidatorError::AppConfig(err) => Some(err),
            ValidatorError::Snapshot(err) => Some(err),
            ValidatorError::MissingInput { .. } => None,
        }
    }
}

/// How a validator classifies one exception entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ExceptionVerdict {
    Ignore,
    Info,
    Warning,
    Error,
}

/// Report every exception a reader collected, classified by `classify`.
pub(crate) fn report_exceptions<T: LogLine>(
    report: &mut ValidationReport,
    node: usize,
    source: &str,
    exceptions: &[T],
    classify: impl Fn(&T) -> ExceptionVerdict,
) {
    for exception in exceptions {
        let message = format!(
            "Node {} {} has {}: {}",
            node,
            source,
            exception.marker(),
            exception.text()
        );
        match classify(exception) {
            ExceptionVerdict::Ignore => {}
            ExceptionVerdict::Info => report.add_info(message),
            ExceptionVerdict::Warning => report.add_warning(message),
            ExceptionVerdict::Error => report.add_error(message),
        }
    }
}

/// How long before the end of a run a socket exception may occur and still be put down to nodes
/// shutting down.
pub const SHUTDOWN_GRACE_SECS: i64 = 10;

/// The exception rule of a plain run: socket exceptions in the last [`SHUTDOWN_GRACE_SECS`] seconds of
/// the run are expected, any other exception is an error.
///
/// A socket exception whose timing cannot be established (the stream has no timestamps) is a warning.
pub(crate) fn classify_standard_exception<T: LogLine>(
    entry: &T,
    run_end: Option<NaiveDateTime>,
) -> ExceptionVerdict {
    match entry.marker() {
        LogMarker::TestingExceptionsAcceptable => ExceptionVerdict::Info,
        LogMarker::SocketException => match (entry.timestamp(), run_end) {
            (Some(at), Some(end)) if end - at <= Duration::seconds(SHUTDOWN_GRACE_SECS) => {
                ExceptionVerdict::Info
            }
            (Some(_), Some(_)) => ExceptionVerdict::Error,
            _ => ExceptionVerdict::Warning,
        },
        _ => ExceptionVerdict::Error,
    }
}

/// The exception rule of the restart and recover-state scenarios: socket exceptions are expected while
/// nodes go down, an oversized signed-state delete queue is suspicious, anything else is an error.
pub(crate) fn classify_restart_exception(entry: &LogEntry) -> ExceptionVerdict {
    match entry.marker() {
        LogMarker::SocketException | LogMarker::TestingExceptionsAcceptable => ExceptionVerdict::Info,
        LogMarker::SignedStateDeleteQueueTooBig => ExceptionVerdict::Warning,
        _ => ExceptionVerdict::Error,
    }
}

pub(crate) fn node_log_is_null(report: &mut ValidationReport, node: usize) {
    crate::logging::log_missing_input(crate::logging::NODE_LOG_MISSING, report.validator(), node);
    report.add_error(format!("Node {} log is missing or unreadable", node));
}
