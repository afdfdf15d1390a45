/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions that log out validation events.
//!
//! Validator start and end events, and the experiment verdict, are printed if the user enabled them via
//! the experiment's [config](crate::config::ExperimentConfig). A validator failing to run is always
//! printed at the `warn` level. Per-node events (missing inputs, reconnect attempts, throttle phases) are
//! always emitted at the `debug` level.
//!
//! The validation engine logs using the [log](https://docs.rs/log/latest/log/) crate. To get these
//! messages printed onto a terminal or to a file, either call [`setup_logger`] or set up another
//! [logging implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
//!
//! ## Log message format
//!
//! Log messages are CSVs (Comma Separated Values) with at least two values. The first two values are
//! always:
//! 1. The name of the event in PascalCase (defined in this module as constants).
//! 2. The time the event was emitted (as number of seconds since the Unix Epoch).
//!
//! The rest of the values differ depending on the kind of event. For example, the following snippet
//! is how the end of a validator run is printed:
//!
//! ```text
//! ValidationEnd, 1701329264, ReconnectValidator, true, 0, 1, 3
//! ```
//!
//! In the snippet:
//! - The third value is the name of the validator.
//! - The fourth value is whether the validator judged the experiment valid.
//! - The fifth, sixth, and seventh values are the number of error, warning, and info messages.

use std::{io, path::Path, sync::Once, time::SystemTime};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use log::LevelFilter;

use crate::{
    report::ExperimentReport,
    validators::{ValidationReport, ValidatorError},
};

// Names of each event in PascalCase for printing:
pub const VALIDATION_START: &str = "ValidationStart";
pub const VALIDATION_END: &str = "ValidationEnd";
pub const VALIDATION_FAILED_TO_RUN: &str = "ValidationFailedToRun";
pub const NODE_LOG_MISSING: &str = "NodeLogMissing";
pub const NODE_CSV_MISSING: &str = "NodeCsvMissing";
pub const RECONNECT_FINISHED: &str = "ReconnectFinished";
pub const RECONNECT_ABORTED: &str = "ReconnectAborted";
pub const THROTTLE_PHASE: &str = "ThrottlePhase";
pub const EXPERIMENT_VERDICT: &str = "ExperimentVerdict";

static LOGGER_INIT: Once = Once::new();

/// Install a [fern] dispatcher that prints every log message with level `level` and above onto stdout,
/// and, if `log_file` is provided, also appends them to that file.
///
/// Only the first call in a process has an effect. Errors opening the log file are returned; an
/// already-installed logger (e.g., by the embedding program) is silently kept.
pub fn setup_logger(level: LevelFilter, log_file: Option<&Path>) -> io::Result<()> {
    let file = match log_file {
        Some(path) => Some(fern::log_file(path)?),
        None => None,
    };

    LOGGER_INIT.call_once(|| {
        let mut dispatch = fern::Dispatch::new()
            .format(|out, message, record| {
                out.finish(format_args!("[{}][{}] {}", record.level(), record.target(), message))
            })
            .level(level)
            .chain(io::stdout());
        if let Some(file) = file {
            dispatch = dispatch.chain(file);
        }
        let _ = dispatch.apply();
    });

    Ok(())
}

pub(crate) fn log_validation_start(validator: &str, node_count: usize) {
    log::info!(
        "{}, {}, {}, {}",
        VALIDATION_START,
        secs_since_unix_epoch(SystemTime::now()),
        validator,
        node_count
    )
}

pub(crate) fn log_validation_end(report: &ValidationReport) {
    log::info!(
        "{}, {}, {}, {}, {}, {}, {}",
        VALIDATION_END,
        secs_since_unix_epoch(SystemTime::now()),
        report.validator(),
        report.is_valid(),
        report.errors().len(),
        report.warnings().len(),
        report.infos().len()
    )
}

pub(crate) fn log_validation_failed_to_run(validator: &str, error: &ValidatorError) {
    log::warn!(
        "{}, {}, {}, {}",
        VALIDATION_FAILED_TO_RUN,
        secs_since_unix_epoch(SystemTime::now()),
        validator,
        error
    )
}

pub(crate) fn log_experiment_verdict(report: &ExperimentReport) {
    log::info!(
        "{}, {}, {}, {}, {}, {}",
        EXPERIMENT_VERDICT,
        secs_since_unix_epoch(SystemTime::now()),
        report.verdict(),
        report.failures().len(),
        report.error_count(),
        report.warning_count()
    )
}

pub(crate) fn log_missing_input(event: &str, validator: &str, node: usize) {
    log::debug!(
        "{}, {}, {}, {}",
        event,
        secs_since_unix_epoch(SystemTime::now()),
        validator,
        node
    )
}

pub(crate) fn log_reconnect(event: &str, node: usize, seconds: Option<i64>) {
    log::debug!(
        "{}, {}, {}, {}",
        event,
        secs_since_unix_epoch(SystemTime::now()),
        node,
        seconds.map(|s| s.to_string()).unwrap_or_default()
    )
}

pub(crate) fn log_throttle_phase(phase: usize, expected: f64, actual: f64) {
    log::debug!(
        "{}, {}, {}, {:.2}, {:.2}",
        THROTTLE_PHASE,
        secs_since_unix_epoch(SystemTime::now()),
        phase,
        expected,
        actual
    )
}

// Get a more readable representation of a bytesequence by base64-encoding it and taking the first 7 characters.
pub(crate) fn first_seven_base64_chars(bytes: &[u8]) -> String {
    let encoded = STANDARD_NO_PAD.encode(bytes);
    if encoded.len() > 7 {
        encoded[0..7].to_string()
    } else {
        encoded
    }
}

pub(crate) fn secs_since_unix_epoch(timestamp: SystemTime) -> u64 {
    timestamp
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or(0)
}
