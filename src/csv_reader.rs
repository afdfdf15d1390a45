/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Per-node metrics time series.
//!
//! Every node writes its platform statistics to a CSV file: a header row naming each metric, followed
//! by one row per sampling period. Lines starting with `#` are comments. [`CsvReader`] loads the whole
//! file into named [`CsvColumn`]s, which then only answer aggregate queries.
//!
//! Many metrics report `0` before their first real measurement, which is why [`CsvColumn::min_not_0`]
//! exists alongside `max` and `average`.

use std::{
    collections::HashMap,
    fs::File,
    io::{Cursor, Read},
    path::Path,
};

// Names of the metric columns that validators read:
pub const C2C: &str = "secC2C";
pub const CONSENSUS_QUEUE_SIZE: &str = "q2";
pub const ROUNDS_PER_SEC: &str = "rounds/sec";
pub const STATE_HASHING_TIME: &str = "sigStateHashTime";
pub const FREE_MEMORY: &str = "memFree";
pub const TOTAL_MEMORY_USED: &str = "memTotUsed";
pub const MAX_MEMORY: &str = "memMax";
pub const DISK_SPACE_FREE: &str = "diskspaceFree";
pub const DISK_SPACE_USED: &str = "diskspaceUsed";
pub const TRANSACTIONS_HANDLED_PER_SEC: &str = "transH/sec";
pub const TRANSACTIONS_PER_SEC: &str = "trans/sec";
pub const ROUND_SUPER_MAJORITY: &str = "roundSup";

/// One named column of a node's metrics CSV.
#[derive(Clone, Debug, PartialEq)]
pub struct CsvColumn {
    name: String,
    samples: Vec<String>,
}

impl CsvColumn {
    pub fn new(name: impl Into<String>, samples: Vec<String>) -> Self {
        Self {
            name: name.into(),
            samples,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Numeric value of a raw sample. Blank and unparsable cells read as `0.0`.
    pub fn as_double(sample: &str) -> f64 {
        sample
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .unwrap_or(0.0)
    }

    pub fn data_size(&self) -> usize {
        self.samples.len()
    }

    pub fn data_element(&self, index: usize) -> Option<&str> {
        self.samples.get(index).map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|sample| Self::as_double(sample))
    }

    pub fn max(&self) -> f64 {
        self.values().reduce(f64::max).unwrap_or(0.0)
    }

    /// Minimum over the strictly positive samples, or `0.0` if there are none.
    pub fn min_not_0(&self) -> f64 {
        self.values()
            .filter(|value| *value > 0.0)
            .reduce(f64::min)
            .unwrap_or(0.0)
    }

    pub fn average(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.values().sum::<f64>() / self.samples.len() as f64
    }

    pub fn last_entry_as_double(&self) -> f64 {
        self.samples
            .last()
            .map(|sample| Self::as_double(sample))
            .unwrap_or(0.0)
    }
}

/// All metric columns of one node.
#[derive(Clone, Debug, Default)]
pub struct CsvReader {
    columns: Vec<CsvColumn>,
    index: HashMap<String, usize>,
}

impl CsvReader {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, csv::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .comment(Some(b'#'))
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let names = reader
            .headers()?
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        let mut samples: Vec<Vec<String>> = vec![Vec::new(); names.len()];

        for record in reader.records() {
            let record = record?;
            for (column, field) in samples.iter_mut().zip(record.iter()) {
                column.push(field.to_string());
            }
        }

        Ok(Self::from_columns(
            names
                .into_iter()
                .zip(samples)
                .map(|(name, samples)| CsvColumn::new(name, samples))
                .collect(),
        ))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, csv::Error> {
        Self::from_reader(File::open(path)?)
    }

    pub fn from_text(text: &str) -> Result<Self, csv::Error> {
        Self::from_reader(Cursor::new(text.as_bytes()))
    }

    pub fn from_columns(columns: Vec<CsvColumn>) -> Self {
        let index = columns
            .iter()
            .enumerate()
            .map(|(i, column)| (column.name.clone(), i))
            .collect();
        Self { columns, index }
    }

    pub fn column(&self, name: &str) -> Option<&CsvColumn> {
        self.index.get(name).map(|i| &self.columns[*i])
    }

    pub fn columns(&self) -> &[CsvColumn] {
        &self.columns
    }
}
