/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! An [`ArtifactSource`] over node artifacts downloaded into a local directory.
//!
//! ## Layout
//!
//! ```text
//! <root>/
//!   node000/
//!     swirlds.log
//!     stats.csv
//!     output.log
//!     hapi-client.log
//!     expected-map.borsh
//!     event-hash/
//!       final-hash.txt
//!       file-hashes.txt
//!       sig-files.txt
//!       recovered-match.txt
//!   node001/
//!   ...
//! ```
//!
//! Node directories are numbered from zero without gaps. Any file may be absent; an absent file leaves
//! the corresponding input of that node empty, to be reported by the validators that need it.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use crate::{
    csv_reader::CsvReader,
    expected_map::ExpectedMapData,
    factory::ArtifactSource,
    log_reader::{LogLine, LogReader},
    node_data::{NodeData, StreamingServerData},
    validators::ValidatorError,
};

pub const NODE_LOG: &str = "swirlds.log";
pub const NODE_CSV: &str = "stats.csv";
pub const NODE_STDOUT: &str = "output.log";
pub const HAPI_CLIENT_LOG: &str = "hapi-client.log";
pub const EXPECTED_MAP: &str = "expected-map.borsh";
pub const EVENT_HASH_DIR: &str = "event-hash";
pub const FINAL_HASH: &str = "final-hash.txt";
pub const FILE_HASHES: &str = "file-hashes.txt";
pub const SIG_FILES: &str = "sig-files.txt";
pub const RECOVERED_MATCH: &str = "recovered-match.txt";

#[derive(Clone, Debug)]
pub struct DirectoryArtifacts {
    root: PathBuf,
    node_count: usize,
}

impl DirectoryArtifacts {
    pub fn new(root: impl Into<PathBuf>, node_count: usize) -> Self {
        Self {
            root: root.into(),
            node_count,
        }
    }

    /// Count the node directories under `root`, stopping at the first missing one.
    pub fn discover(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not a directory", root.display()),
            ));
        }

        let mut node_count = 0;
        while root.join(node_dir_name(node_count)).is_dir() {
            node_count += 1;
        }
        Ok(Self { root, node_count })
    }

    pub fn node_dir(&self, node: usize) -> PathBuf {
        self.root.join(node_dir_name(node))
    }

    fn log<T: LogLine>(&self, node: usize, file: &str) -> io::Result<Option<LogReader<T>>> {
        let path = self.node_dir(node).join(file);
        if !path.is_file() {
            return Ok(None);
        }
        LogReader::from_path(path).map(Some)
    }

    fn csv(&self, node: usize) -> Result<Option<CsvReader>, ValidatorError> {
        let path = self.node_dir(node).join(NODE_CSV);
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(CsvReader::from_path(path)?))
    }
}

fn node_dir_name(node: usize) -> String {
    format!("node{:03}", node)
}

/// Contents of `path`, or `None` if there is no such file.
fn read_optional(path: &Path) -> io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

impl ArtifactSource for DirectoryArtifacts {
    fn node_count(&self) -> usize {
        self.node_count
    }

    fn node_data(&self) -> Result<Vec<NodeData>, ValidatorError> {
        (0..self.node_count)
            .map(|node| -> Result<NodeData, ValidatorError> {
                let mut data = NodeData::new(self.log(node, NODE_LOG)?, self.csv(node)?);
                data.stdout = self.log(node, NODE_STDOUT)?;
                data.hapi_client = self.log(node, HAPI_CLIENT_LOG)?;
                Ok(data)
            })
            .collect()
    }

    fn streaming_data(&self) -> Result<Vec<Option<StreamingServerData>>, ValidatorError> {
        (0..self.node_count)
            .map(|node| -> Result<Option<StreamingServerData>, ValidatorError> {
                let dir = self.node_dir(node).join(EVENT_HASH_DIR);
                if !dir.is_dir() {
                    return Ok(None);
                }
                let final_hash = read_optional(&dir.join(FINAL_HASH))?.unwrap_or_default();
                let file_hashes = read_optional(&dir.join(FILE_HASHES))?.unwrap_or_default();
                let sig_files = read_optional(&dir.join(SIG_FILES))?.unwrap_or_default();
                let recovered_match = read_optional(&dir.join(RECOVERED_MATCH))?;
                Ok(Some(StreamingServerData::from_text(
                    &final_hash,
                    &file_hashes,
                    &sig_files,
                    recovered_match.as_deref(),
                )))
            })
            .collect()
    }

    fn expected_maps(&self) -> Result<ExpectedMapData, ValidatorError> {
        let snapshots = (0..self.node_count)
            .map(|node| match fs::read(self.node_dir(node).join(EXPECTED_MAP)) {
                Ok(bytes) => Ok(Some(bytes)),
                Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(err) => Err(err),
            })
            .collect::<io::Result<Vec<_>>>()?;
        Ok(ExpectedMapData::from_snapshots(&snapshots)?)
    }
}
