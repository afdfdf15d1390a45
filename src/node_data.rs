/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Immutable bundles that tie a node's artifacts together.
//!
//! Bundles are always handled as ordered lists, in which a node's position is its node ID. Several
//! validators rely on that order: node 0 is the baseline the other nodes are compared against, and the
//! last node is the node that the experiment injected faults into.

use std::{
    cmp::Ordering,
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::{
    csv_reader::CsvReader,
    log_reader::{HapiClientEntry, LogEntry, LogReader},
};

/// The readers of one node.
#[derive(Debug, Default)]
pub struct NodeData {
    pub log: Option<LogReader<LogEntry>>,
    pub csv: Option<CsvReader>,
    pub stdout: Option<LogReader<LogEntry>>,
    pub hapi_client: Option<LogReader<HapiClientEntry>>,
}

impl NodeData {
    pub fn new(log: Option<LogReader<LogEntry>>, csv: Option<CsvReader>) -> Self {
        Self {
            log,
            csv,
            stdout: None,
            hapi_client: None,
        }
    }

    pub fn with_stdout(mut self, stdout: LogReader<LogEntry>) -> Self {
        self.stdout = Some(stdout);
        self
    }

    pub fn with_hapi_client(mut self, hapi_client: LogReader<HapiClientEntry>) -> Self {
        self.hapi_client = Some(hapi_client);
        self
    }
}

/// The event-stream artifacts of one streaming-enabled node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StreamingServerData {
    /// Aggregate hash over every event file the node wrote.
    pub final_hash: String,
    /// Hash of each event file, in file order.
    pub file_hashes: Vec<String>,
    /// Signature files, ordered by the instant embedded in their names.
    pub sig_files: Vec<SigFile>,
    /// Result line of comparing recovered events against the original stream, if recovery ran.
    pub recovered_event_match: Option<String>,
    /// Lines of the signature file list that are not signature file names.
    pub malformed_sig_files: Vec<String>,
}

impl StreamingServerData {
    pub fn new(
        final_hash: impl Into<String>,
        file_hashes: Vec<String>,
        mut sig_files: Vec<SigFile>,
        recovered_event_match: Option<String>,
    ) -> Self {
        sig_files.sort();
        Self {
            final_hash: final_hash.into().trim().to_string(),
            file_hashes,
            sig_files,
            recovered_event_match,
            malformed_sig_files: Vec::new(),
        }
    }

    /// Build from the plain-text artifacts: one record per line, blank lines ignored. Signature file
    /// names that do not parse are kept aside in [`malformed_sig_files`](Self::malformed_sig_files).
    pub fn from_text(
        final_hash: &str,
        file_hashes: &str,
        sig_files: &str,
        recovered_event_match: Option<&str>,
    ) -> Self {
        let file_hashes = non_blank_lines(file_hashes).map(ToString::to_string).collect();
        let mut parsed = Vec::new();
        let mut malformed = Vec::new();
        for name in non_blank_lines(sig_files) {
            match name.parse::<SigFile>() {
                Ok(sig_file) => parsed.push(sig_file),
                Err(_) => malformed.push(name.to_string()),
            }
        }
        let recovered_event_match = recovered_event_match
            .and_then(|text| non_blank_lines(text).next())
            .map(ToString::to_string);

        let mut data = Self::new(final_hash, file_hashes, parsed, recovered_event_match);
        data.malformed_sig_files = malformed;
        data
    }

    pub fn event_count(&self) -> usize {
        self.file_hashes.len()
    }
}

fn non_blank_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|line| !line.is_empty())
}

pub const EVENT_SIG_EXTENSION: &str = "evts_sig";
pub const STREAM_SIG_EXTENSION: &str = "rcd_sig";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SigFileKind {
    /// Signature over an event stream file.
    Event,
    /// Signature over a record stream file.
    Stream,
}

/// Name of a stream signature file, e.g. `2024-03-01T10_15_30.123456Z.evts_sig`.
///
/// The name embeds the instant at which the signed stream file was started (colons are replaced by
/// underscores). Signature files order by that instant.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SigFile {
    name: String,
    created: DateTime<Utc>,
    kind: SigFileKind,
}

impl SigFile {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn kind(&self) -> SigFileKind {
        self.kind
    }
}

impl FromStr for SigFile {
    type Err = SigFileParseError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let name = name.trim();
        let (stem, extension) = name
            .rsplit_once('.')
            .ok_or_else(|| SigFileParseError::new(name))?;
        let kind = match extension {
            EVENT_SIG_EXTENSION => SigFileKind::Event,
            STREAM_SIG_EXTENSION => SigFileKind::Stream,
            _ => return Err(SigFileParseError::new(name)),
        };

        let instant = stem.trim_end_matches('Z').replace('_', ":");
        let created = NaiveDateTime::parse_from_str(&instant, "%Y-%m-%dT%H:%M:%S%.f")
            .map_err(|_| SigFileParseError::new(name))?
            .and_utc();

        Ok(SigFile {
            name: name.to_string(),
            created,
            kind,
        })
    }
}

impl Ord for SigFile {
    fn cmp(&self, other: &Self) -> Ordering {
        self.created
            .cmp(&other.created)
            .then_with(|| self.kind.cmp(&other.kind))
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl PartialOrd for SigFile {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for SigFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A signature file name that does not follow the `<instant>.<extension>` layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SigFileParseError {
    pub name: String,
}

impl SigFileParseError {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

impl Display for SigFileParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "not a signature file name: {}", self.name)
    }
}

impl std::error::Error for SigFileParseError {}
