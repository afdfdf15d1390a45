/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Checks that the network's throughput settled at each configured throttle value.
//!
//! A throttled experiment submits transactions in phases, each capped at a target rate. The
//! network-wide throughput is the per-sample sum of every node's `trans/sec` metric. The validator
//! slides a window of [`WINDOW_SIZE`] samples over that series and sums each window. A window is
//! *stable* if its sum differs from the previous window's by less than [`STABILITY_FRACTION`] of itself,
//! or if it is flat: its samples spread over less than [`STABILITY_FRACTION`] of their mean. A phase
//! held for exactly one window is therefore found even though its neighbours differ from it.
//!
//! Each run of stable windows is one phase. Its throughput is the sum of its most stable window (the one
//! with the smallest change from its predecessor, or the smallest spread), divided by the window size and
//! the node count. When
//! the run ends (the next window is unstable, or the series ends), that throughput is compared against
//! the next expected throttle value. A deviation of more than [`MAX_DEVIATION`] is a warning.
//!
//! Throttle checks are advisory: they never make a report invalid.

use crate::{
    config::{ExperimentConfig, PtaConfig},
    csv_reader,
    logging,
    node_data::NodeData,
};

use super::{ValidationReport, Validator, ValidatorError};

pub const WINDOW_SIZE: usize = 5;
pub const STABILITY_FRACTION: f64 = 0.02;
pub const MAX_DEVIATION: f64 = 0.10;

/// Per-node throughput of every stable phase of `series`, in order.
///
/// `series` is the network-wide throughput, `node_count` the number of nodes that contributed to it.
pub fn stable_phases(series: &[f64], node_count: usize) -> Vec<f64> {
    if node_count == 0 || series.len() < WINDOW_SIZE {
        return Vec::new();
    }
    let per_node = |sum: f64| sum / WINDOW_SIZE as f64 / node_count as f64;

    let mut phases = Vec::new();
    let mut previous_sum: Option<f64> = None;
    // (smallest delta, sum of that window) of the current stable run.
    let mut most_stable: Option<(f64, f64)> = None;

    for window in series.windows(WINDOW_SIZE) {
        let sum: f64 = window.iter().sum();
        let max = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = window.iter().copied().fold(f64::INFINITY, f64::min);
        // Both measured on the scale of a window sum.
        let change = previous_sum.map(|previous| (sum - previous).abs());
        let spread = (max - min) * WINDOW_SIZE as f64;
        let stable_delta = [change, Some(spread)]
            .into_iter()
            .flatten()
            .filter(|delta| *delta < STABILITY_FRACTION * sum)
            .reduce(f64::min);

        match (stable_delta, most_stable) {
            (Some(delta), Some((best_delta, _))) if delta < best_delta => most_stable = Some((delta, sum)),
            (Some(_), Some(_)) => {}
            (Some(delta), None) => most_stable = Some((delta, sum)),
            (None, Some((_, best_sum))) => {
                phases.push(per_node(best_sum));
                most_stable = None;
            }
            (None, None) => {}
        }
        previous_sum = Some(sum);
    }

    if let Some((_, best_sum)) = most_stable {
        phases.push(per_node(best_sum));
    }
    phases
}

/// Validates throughput against throttle values taken from the experiment configuration.
pub struct ThrottleValidator {
    name: &'static str,
    nodes: Vec<NodeData>,
    expected: Vec<f64>,
}

impl ThrottleValidator {
    pub fn new(nodes: Vec<NodeData>, expected: Vec<f64>) -> Self {
        Self {
            name: "ThrottleValidator",
            nodes,
            expected,
        }
    }

    /// The network-wide throughput series, truncated to the shortest node series, and the number of
    /// nodes it sums over. Nodes without a `trans/sec` metric are reported and left out.
    fn network_series(&self, report: &mut ValidationReport) -> (Vec<f64>, usize) {
        let mut columns = Vec::new();
        for (node, data) in self.nodes.iter().enumerate() {
            match data
                .csv
                .as_ref()
                .and_then(|csv| csv.column(csv_reader::TRANSACTIONS_PER_SEC))
            {
                Some(column) => columns.push(column),
                None => {
                    logging::log_missing_input(logging::NODE_CSV_MISSING, report.validator(), node);
                    report.add_error(format!(
                        "Node {} has no {} metric",
                        node,
                        csv_reader::TRANSACTIONS_PER_SEC
                    ));
                }
            }
        }

        let length = columns.iter().map(|column| column.data_size()).min().unwrap_or(0);
        let mut series = vec![0.0; length];
        for column in &columns {
            for (total, sample) in series.iter_mut().zip(column.values()) {
                *total += sample;
            }
        }
        (series, columns.len())
    }
}

impl Validator for ThrottleValidator {
    fn name(&self) -> &'static str {
        self.name
    }

    fn validate(&mut self, report: &mut ValidationReport) -> Result<(), ValidatorError> {
        if self.expected.is_empty() {
            report.add_info("No throttle values configured");
            return Ok(());
        }

        let (series, node_count) = self.network_series(report);
        let phases = stable_phases(&series, node_count);
        if phases.is_empty() {
            report.add_warning("Throughput never stabilized");
            return Ok(());
        }

        for (phase, (&expected, &actual)) in self.expected.iter().zip(&phases).enumerate() {
            logging::log_throttle_phase(phase, expected, actual);
            if expected <= 0.0 {
                continue;
            }
            let deviation = (actual - expected).abs() / expected;
            if deviation > MAX_DEVIATION {
                report.add_warning(format!(
                    "Throttle phase {} expected {:.2} trans/sec per node but stabilized at {:.2} ({:.0}% off)",
                    phase,
                    expected,
                    actual,
                    deviation * 100.0
                ));
            } else {
                report.add_info(format!(
                    "Throttle phase {} stabilized at {:.2} trans/sec per node (expected {:.2})",
                    phase, actual, expected
                ));
            }
        }

        if phases.len() < self.expected.len() {
            report.add_warning(format!(
                "Throughput stabilized {} times but {} throttle phases were configured",
                phases.len(),
                self.expected.len()
            ));
        }
        Ok(())
    }
}

/// Validates throughput against the throttle phases in the Platform Testing App's own configuration.
pub struct PtaThrottleValidator {
    inner: ThrottleValidator,
}

impl PtaThrottleValidator {
    pub fn new(nodes: Vec<NodeData>, config: &ExperimentConfig) -> Result<Self, ValidatorError> {
        let mut inner = ThrottleValidator::new(nodes, pta_throttle_values(config)?);
        inner.name = "PTAThrottleValidator";
        Ok(Self { inner })
    }
}

impl Validator for PtaThrottleValidator {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn validate(&mut self, report: &mut ValidationReport) -> Result<(), ValidatorError> {
        self.inner.validate(report)
    }
}

/// Throttle values of the Platform Testing App's `submitConfig.tpsMap`, in phase order. Empty if the
/// experiment does not throttle or runs another application.
pub fn pta_throttle_values(config: &ExperimentConfig) -> Result<Vec<f64>, ValidatorError> {
    if !config.use_throttle || !config.runs_platform_testing_app() {
        return Ok(Vec::new());
    }
    let json = config
        .app_config_json
        .as_deref()
        .ok_or(ValidatorError::MissingInput {
            what: "Platform Testing App JSON config",
        })?;
    Ok(PtaConfig::from_json(json)?.throttle_values())
}
