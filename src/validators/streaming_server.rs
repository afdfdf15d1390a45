/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Cross-node consistency of the event streams written by streaming-enabled nodes.
//!
//! Every streaming node writes the consensus events it sees into event files, hashes each file, and
//! aggregates the file hashes into one final hash. It also signs each stream file, leaving a signature
//! file whose name embeds the instant the stream file was started. Since all nodes see the same events in
//! the same order, all of this must agree across nodes, up to the following tolerances.
//!
//! ## Trailing divergence
//!
//! Nodes are not stopped at the same instant, so the last event file a node wrote may be cut short or be
//! missing entirely. Lists are therefore compared position by position up to the length of the shorter
//! one, and a mismatch is tolerated if it falls in the last [`HASH_TRAILING_TOLERANCE`] positions (for
//! event file hashes) or the last [`SIG_FILE_TRAILING_TOLERANCE`] positions (for signature files).
//! Signature files get the looser tolerance because they are written before the hash of the file they
//! sign is finalized. Signature file lists may also differ in length by at most
//! [`SIG_FILE_TRAILING_TOLERANCE`].
//!
//! ## Checks
//!
//! 1. Every node either wrote events and hashed them, or wrote nothing and has no hash.
//! 2. The final hashes of adjacent nodes (node `i` vs node `i - 1`) agree, or their event file hash lists
//!    diverge only in the trailing position.
//! 3. Every node's signature file list agrees with node 0's, and holds nothing but signature file names.
//! 4. If the experiment recovered the event stream from a saved state, every node logged that the
//!    recovered events matched the original stream ([`RECOVERED_EVENTS_MATCH`]).

use crate::node_data::StreamingServerData;

use super::{ValidationReport, Validator, ValidatorError};

/// Number of trailing event file hashes that may differ between two nodes.
pub const HASH_TRAILING_TOLERANCE: usize = 1;

/// Number of trailing signature files that may differ between two nodes.
pub const SIG_FILE_TRAILING_TOLERANCE: usize = 2;

/// Phrase the recovery tool logs when the recovered event stream is identical to the original one.
pub const RECOVERED_EVENTS_MATCH: &str = "Recovered events match original events";

/// Result of comparing two nodes' lists position by position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListAgreement {
    /// Same length, same entries.
    Identical,
    /// Entries agree except within the trailing tolerance, or one list is a prefix of the other.
    TrailingDivergence,
    /// The lists first differ at `index`, before the trailing tolerance.
    DivergesAt { index: usize },
}

/// Compare `left` and `right` up to the length of the shorter list, tolerating mismatches in its last
/// `tolerance` positions.
pub fn compare_lists<T: PartialEq>(left: &[T], right: &[T], tolerance: usize) -> ListAgreement {
    let common = left.len().min(right.len());
    let first_mismatch = left
        .iter()
        .zip(right.iter())
        .position(|(left, right)| left != right);

    match first_mismatch {
        None if left.len() == right.len() => ListAgreement::Identical,
        None => ListAgreement::TrailingDivergence,
        Some(index) if index >= common.saturating_sub(tolerance) => ListAgreement::TrailingDivergence,
        Some(index) => ListAgreement::DivergesAt { index },
    }
}

pub struct StreamingServerValidator {
    nodes: Vec<Option<StreamingServerData>>,
    recover_event_stream: bool,
}

impl StreamingServerValidator {
    pub fn new(nodes: Vec<Option<StreamingServerData>>, recover_event_stream: bool) -> Self {
        Self {
            nodes,
            recover_event_stream,
        }
    }

    fn check_event_counts(&self, report: &mut ValidationReport) {
        for (node, data) in self.nodes.iter().enumerate() {
            let Some(data) = data else {
                report.add_error(format!("Node {} streaming data is missing", node));
                continue;
            };

            match (data.event_count(), data.final_hash.is_empty()) {
                (0, true) => report.add_error(format!("Node {} did not write any events", node)),
                (0, false) => report.add_error(format!(
                    "Node {} has final hash {} but no event files",
                    node, data.final_hash
                )),
                (count, true) => report.add_error(format!(
                    "Node {} wrote {} event files but did not hash them",
                    node, count
                )),
                (_, false) => {}
            }
        }
    }

    fn check_final_hashes(&self, report: &mut ValidationReport) {
        for node in 1..self.nodes.len() {
            let (Some(previous), Some(current)) = (&self.nodes[node - 1], &self.nodes[node]) else {
                continue;
            };
            if previous.final_hash.is_empty() || current.final_hash.is_empty() {
                continue;
            }
            if previous.final_hash == current.final_hash {
                continue;
            }

            match compare_lists(
                &previous.file_hashes,
                &current.file_hashes,
                HASH_TRAILING_TOLERANCE,
            ) {
                ListAgreement::Identical => report.add_error(format!(
                    "Nodes {} and {} have the same event file hashes but different final hashes",
                    node - 1,
                    node
                )),
                ListAgreement::TrailingDivergence => report.add_info(format!(
                    "Nodes {} and {} have different final hashes because of trailing divergence in their last event file",
                    node - 1,
                    node
                )),
                ListAgreement::DivergesAt { index } => report.add_error(format!(
                    "Nodes {} and {} have different event file hashes at position {}: {} vs {}",
                    node - 1,
                    node,
                    index,
                    previous.file_hashes[index],
                    current.file_hashes[index]
                )),
            }
        }
    }

    fn check_sig_files(&self, report: &mut ValidationReport) {
        let Some(Some(reference)) = self.nodes.first() else {
            return;
        };

        for (node, data) in self.nodes.iter().enumerate().skip(1) {
            let Some(data) = data else {
                continue;
            };

            let length_difference = reference.sig_files.len().abs_diff(data.sig_files.len());
            if length_difference > SIG_FILE_TRAILING_TOLERANCE {
                report.add_error(format!(
                    "Node {} has {} signature files but node 0 has {}",
                    node,
                    data.sig_files.len(),
                    reference.sig_files.len()
                ));
                continue;
            }

            match compare_lists(
                &reference.sig_files,
                &data.sig_files,
                SIG_FILE_TRAILING_TOLERANCE,
            ) {
                ListAgreement::Identical => {}
                ListAgreement::TrailingDivergence => report.add_info(format!(
                    "Node {} signature files diverge from node 0 only in the last {} files",
                    node, SIG_FILE_TRAILING_TOLERANCE
                )),
                ListAgreement::DivergesAt { index } => report.add_error(format!(
                    "Node {} signature file {} does not match node 0 signature file {}",
                    node, data.sig_files[index], reference.sig_files[index]
                )),
            }
        }
    }

    fn check_malformed_sig_files(&self, report: &mut ValidationReport) {
        for (node, data) in self.nodes.iter().enumerate() {
            let Some(data) = data else {
                continue;
            };
            if !data.malformed_sig_files.is_empty() {
                report.add_error(format!(
                    "Node {} has {} malformed signature file names: {}",
                    node,
                    data.malformed_sig_files.len(),
                    data.malformed_sig_files.join(", ")
                ));
            }
        }
    }

    fn check_recovered_events(&self, report: &mut ValidationReport) {
        for (node, data) in self.nodes.iter().enumerate() {
            let Some(data) = data else {
                continue;
            };

            match &data.recovered_event_match {
                Some(line) if line.contains(RECOVERED_EVENTS_MATCH) => {
                    report.add_info(format!("Node {} recovered events match the original stream", node))
                }
                Some(line) => report.add_error(format!(
                    "Node {} recovered events do not match the original stream: {}",
                    node, line
                )),
                None if self.recover_event_stream => report.add_error(format!(
                    "Node {} did not report whether its recovered events match",
                    node
                )),
                None => {}
            }
        }
    }
}

impl Validator for StreamingServerValidator {
    fn name(&self) -> &'static str {
        "StreamingServerValidator"
    }

    fn validate(&mut self, report: &mut ValidationReport) -> Result<(), ValidatorError> {
        if self.nodes.is_empty() {
            return Err(ValidatorError::MissingInput {
                what: "streaming server data",
            });
        }

        self.check_event_counts(report);
        self.check_final_hashes(report);
        self.check_sig_files(report);
        self.check_malformed_sig_files(report);
        self.check_recovered_events(report);
        Ok(())
    }
}
