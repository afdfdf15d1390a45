/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Parsed log entries and the line-parsing front end that produces them.
//!
//! ## Platform log layout
//!
//! A structured platform log line has four whitespace-separated parts:
//!
//! ```text
//! 2024-03-01 10:15:30.123 RECONNECT_FINISHED Reconnect finished with round 1520
//! ```
//!
//! 1. The date, `yyyy-mm-dd`.
//! 2. The time of day, `hh:mm:ss` with optional fractional seconds.
//! 3. The marker name (see [`LogMarker`]).
//! 4. The free-form message, up to the end of the line.
//!
//! Lines that do not have this layout (stdout, stray exception lines) still become entries. They are
//! classified by their content, and have no timestamp of their own: a [`LogReader`](super::LogReader)
//! stamps them with the timestamp of the closest preceding structured line, if there is one.
//!
//! A line without a timestamp that continues the entry before it is not an entry of its own. It is
//! appended to that entry's [continuation](LogLine::continuation) instead. A line continues an entry
//! if it has the shape of a stack-trace line (see [`is_trace_line`]), or if it is the first line after
//! a structured exception entry, where the logger prints the exception's class and message.
//!
//! ## HAPI client log layout
//!
//! HAPI client lines use the same timestamp and marker prefix, followed by the suite name in single
//! quotes:
//!
//! ```text
//! 2024-03-01 10:15:30.123 SUITE_PASSED 'CryptoTransferSuite' all 12 specs passed
//! ```

use chrono::NaiveDateTime;

use super::markers::LogMarker;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Implemented by every entry type a [`LogReader`](super::LogReader) can be bound to.
pub trait LogLine: Clone {
    /// Parse one line of a log stream. Returns `None` for lines that carry no entry (blank lines).
    fn parse(line: &str) -> Option<Self>;

    fn marker(&self) -> LogMarker;

    fn timestamp(&self) -> Option<NaiveDateTime>;

    fn text(&self) -> &str;

    /// Stamp an entry that has no timestamp of its own (e.g. a stack-trace line) with the timestamp of
    /// the entry that preceded it in the stream.
    fn inherit_timestamp(&mut self, timestamp: NaiveDateTime);

    /// Lines folded into this entry, e.g. the stack trace of an exception.
    fn continuation(&self) -> &[String];

    fn push_continuation(&mut self, line: String);

    fn is_exception(&self) -> bool {
        self.marker().is_exception()
    }

    /// Whether `next`, read right after this entry, belongs to it rather than starting a new entry.
    ///
    /// Must be asked before this entry inherits a timestamp, so that only structured entries take the
    /// exception header that follows them.
    fn is_continued_by(&self, next: &Self) -> bool {
        if next.timestamp().is_some() {
            return false;
        }
        let exception_header =
            self.is_exception() && self.timestamp().is_some() && self.continuation().is_empty();
        exception_header || is_trace_line(next.text())
    }
}

/// Whether `line` has the shape of a stack-trace line: indented, or a `Caused by` / `... N more` line.
pub fn is_trace_line(line: &str) -> bool {
    line.starts_with(char::is_whitespace)
        || line.starts_with("Caused by")
        || line.trim_start().starts_with("...")
}

/// One entry of a platform log or of a node's stdout.
#[derive(Clone, Debug, PartialEq)]
pub struct LogEntry {
    timestamp: Option<NaiveDateTime>,
    marker: LogMarker,
    text: String,
    continuation: Vec<String>,
}

impl LogEntry {
    pub fn new(timestamp: Option<NaiveDateTime>, marker: LogMarker, text: impl Into<String>) -> Self {
        Self {
            timestamp,
            marker,
            text: text.into(),
            continuation: Vec::new(),
        }
    }

    /// The integer that ends this entry's message, e.g. the round number in
    /// `"Freeze state is about to be saved for round 19"`.
    pub fn trailing_number(&self) -> Option<u64> {
        trailing_number(&self.text)
    }
}

impl LogLine for LogEntry {
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end();
        if line.trim().is_empty() {
            return None;
        }

        if let Some((timestamp, marker, text)) = split_structured(line) {
            return Some(LogEntry::new(Some(timestamp), LogMarker::from_name(marker), text));
        }

        let marker = if line.contains("SocketException") {
            LogMarker::SocketException
        } else if line.contains("Exception") {
            LogMarker::Exception
        } else {
            LogMarker::Unstructured
        };
        Some(LogEntry::new(None, marker, line))
    }

    fn marker(&self) -> LogMarker {
        self.marker
    }

    fn timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamp
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn inherit_timestamp(&mut self, timestamp: NaiveDateTime) {
        self.timestamp.get_or_insert(timestamp);
    }

    fn continuation(&self) -> &[String] {
        &self.continuation
    }

    fn push_continuation(&mut self, line: String) {
        self.continuation.push(line)
    }
}

/// One entry of a HAPI client log.
#[derive(Clone, Debug, PartialEq)]
pub struct HapiClientEntry {
    timestamp: Option<NaiveDateTime>,
    marker: LogMarker,
    suite: Option<String>,
    text: String,
    continuation: Vec<String>,
}

impl HapiClientEntry {
    pub fn suite(&self) -> Option<&str> {
        self.suite.as_deref()
    }
}

impl LogLine for HapiClientEntry {
    fn parse(line: &str) -> Option<Self> {
        let entry = LogEntry::parse(line)?;
        let (suite, text) = match entry.text.strip_prefix('\'') {
            Some(rest) => match rest.split_once('\'') {
                Some((suite, text)) => (Some(suite.to_string()), text.trim().to_string()),
                None => (None, entry.text.clone()),
            },
            None => (None, entry.text.clone()),
        };

        Some(HapiClientEntry {
            timestamp: entry.timestamp,
            marker: entry.marker,
            suite,
            text,
            continuation: entry.continuation,
        })
    }

    fn marker(&self) -> LogMarker {
        self.marker
    }

    fn timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamp
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn inherit_timestamp(&mut self, timestamp: NaiveDateTime) {
        self.timestamp.get_or_insert(timestamp);
    }

    fn continuation(&self) -> &[String] {
        &self.continuation
    }

    fn push_continuation(&mut self, line: String) {
        self.continuation.push(line)
    }
}

/// Split a structured line into its timestamp, marker name, and message.
fn split_structured(line: &str) -> Option<(NaiveDateTime, &str, &str)> {
    let (date, rest) = next_token(line)?;
    let (time, rest) = next_token(rest)?;
    let (marker, rest) = next_token(rest)?;

    let timestamp =
        NaiveDateTime::parse_from_str(&format!("{} {}", date, time), TIMESTAMP_FORMAT).ok()?;
    if !marker.chars().all(|c| c.is_ascii_uppercase() || c == '_') {
        return None;
    }

    Some((timestamp, marker, rest.trim()))
}

fn next_token(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    let end = s.find(char::is_whitespace).unwrap_or(s.len());
    Some((&s[..end], &s[end..]))
}

fn trailing_number(text: &str) -> Option<u64> {
    let trimmed = text.trim_end_matches(|c: char| !c.is_ascii_digit());
    let digits_start = trimmed
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    trimmed[digits_start..].parse().ok()
}
