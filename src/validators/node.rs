/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Statistical health checks over every node's metrics.
//!
//! These checks are advisory: each one iterates all nodes, and if any node breaches the threshold, a
//! single warning naming every offending node is added. They never make a report invalid.
//!
//! | Check | Metric(s) | Threshold |
//! |---|---|---|
//! | C2C variation | `secC2C` | `max / min_not_0 <= 4.0` |
//! | Consensus queue | `q2` | `max <= 450` |
//! | State hashing | `rounds/sec`, `sigStateHashTime` | `1 / max(rounds/sec) >= max(sigStateHashTime)` |
//! | Free memory | `memFree` | `min_not_0 >= 50 MiB` |
//! | Free disk space | `diskspaceFree` | `min_not_0 >= 50 MiB` |
//! | Memory used | `memTotUsed`, `memMax` | `max(memTotUsed) <= 95% of max(memMax)` |

use crate::{
    csv_reader::{self, CsvColumn, CsvReader},
    logging,
    node_data::NodeData,
};

use super::{ValidationReport, Validator};

pub const MAX_C2C_VARIATION: f64 = 4.0;
pub const MAX_CONSENSUS_QUEUE_SIZE: f64 = 450.0;
pub const MIN_FREE_BYTES: f64 = 50.0 * 1024.0 * 1024.0;
pub const MAX_MEMORY_USED_FRACTION: f64 = 0.95;

/// A validator over per-node data, which gets the shared statistical checks for free.
pub trait NodeValidator: Validator {
    fn nodes(&self) -> &[NodeData];

    /// Run every statistical check, and add an error for each node without metrics.
    fn check_node_statistics(&self, report: &mut ValidationReport) {
        for (node, data) in self.nodes().iter().enumerate() {
            if data.csv.is_none() {
                logging::log_missing_input(logging::NODE_CSV_MISSING, report.validator(), node);
                report.add_error(format!("Node {} metrics CSV is missing or unreadable", node));
            }
        }

        self.check_c2c_variation(report);
        self.check_consensus_queue(report);
        self.check_state_hashing_time(report);
        self.check_free_memory(report);
        self.check_free_disk_space(report);
        self.check_memory_used(report);
    }

    fn check_c2c_variation(&self, report: &mut ValidationReport) {
        let failures = for_each_column(self.nodes(), csv_reader::C2C, |c2c| {
            let min = c2c.min_not_0();
            if min <= 0.0 {
                return None;
            }
            let variation = c2c.max() / min;
            (variation > MAX_C2C_VARIATION).then(|| format!("{:.2}", variation))
        });
        warn_if_any(
            report,
            &format!("C2C variation (max / min) exceeds {}", MAX_C2C_VARIATION),
            failures,
        );
    }

    fn check_consensus_queue(&self, report: &mut ValidationReport) {
        let failures = for_each_column(self.nodes(), csv_reader::CONSENSUS_QUEUE_SIZE, |queue| {
            let max = queue.max();
            (max > MAX_CONSENSUS_QUEUE_SIZE).then(|| format!("{:.0}", max))
        });
        warn_if_any(
            report,
            &format!("Consensus queue size exceeds {}", MAX_CONSENSUS_QUEUE_SIZE),
            failures,
        );
    }

    fn check_state_hashing_time(&self, report: &mut ValidationReport) {
        let failures = for_each_csv(self.nodes(), |csv| {
            let rounds_per_sec = csv.column(csv_reader::ROUNDS_PER_SEC)?.max();
            let hashing_time = csv.column(csv_reader::STATE_HASHING_TIME)?.max();
            if rounds_per_sec <= 0.0 {
                return None;
            }
            let round_time = 1.0 / rounds_per_sec;
            (round_time < hashing_time).then(|| {
                format!("hashing {:.4}s > fastest round {:.4}s", hashing_time, round_time)
            })
        });
        warn_if_any(report, "Hashing a signed state takes longer than producing a round", failures);
    }

    fn check_free_memory(&self, report: &mut ValidationReport) {
        let failures = for_each_column(self.nodes(), csv_reader::FREE_MEMORY, below_free_floor);
        warn_if_any(report, "Free memory dropped below 50 MiB", failures);
    }

    fn check_free_disk_space(&self, report: &mut ValidationReport) {
        let failures = for_each_column(self.nodes(), csv_reader::DISK_SPACE_FREE, below_free_floor);
        warn_if_any(report, "Free disk space dropped below 50 MiB", failures);
    }

    fn check_memory_used(&self, report: &mut ValidationReport) {
        let failures = for_each_csv(self.nodes(), |csv| {
            let used = csv.column(csv_reader::TOTAL_MEMORY_USED)?.max();
            let max = csv.column(csv_reader::MAX_MEMORY)?.max();
            if max <= 0.0 {
                return None;
            }
            (used > MAX_MEMORY_USED_FRACTION * max)
                .then(|| format!("{:.1}% used", used / max * 100.0))
        });
        warn_if_any(
            report,
            &format!("Memory used exceeds {:.0}% of max memory", MAX_MEMORY_USED_FRACTION * 100.0),
            failures,
        );
    }
}

fn below_free_floor(column: &CsvColumn) -> Option<String> {
    let min = column.min_not_0();
    (min > 0.0 && min < MIN_FREE_BYTES).then(|| format!("{:.1} MiB", min / 1024.0 / 1024.0))
}

/// Apply `check` to the CSV of every node that has one. Returns `(node, finding)` for each node the
/// check flagged.
fn for_each_csv(
    nodes: &[NodeData],
    check: impl Fn(&CsvReader) -> Option<String>,
) -> Vec<(usize, String)> {
    nodes
        .iter()
        .enumerate()
        .filter_map(|(node, data)| Some((node, check(data.csv.as_ref()?)?)))
        .collect()
}

fn for_each_column(
    nodes: &[NodeData],
    column: &str,
    check: impl Fn(&CsvColumn) -> Option<String>,
) -> Vec<(usize, String)> {
    for_each_csv(nodes, |csv| check(csv.column(column)?))
}

fn warn_if_any(report: &mut ValidationReport, title: &str, failures: Vec<(usize, String)>) {
    if failures.is_empty() {
        return;
    }
    let details = failures
        .iter()
        .map(|(node, finding)| format!("node {}: {}", node, finding))
        .collect::<Vec<_>>()
        .join(", ");
    report.add_warning(format!("{} on {} node(s) ({})", title, failures.len(), details));
}
