/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The forward-only cursor over one node's log stream.

use std::{
    fmt::{self, Debug, Formatter},
    fs::File,
    io::{self, BufRead, BufReader, Cursor, Lines},
    path::Path,
};

use chrono::NaiveDateTime;

use super::{entry::LogLine, markers::LogMarker, LogEntry};

/// Sequential, stateful cursor over the parsed entries of one log stream.
///
/// Every entry the cursor moves over, whether or not the caller asked for it, is inspected exactly once,
/// and is appended to the reader's exception list if its marker [denotes an exception](LogMarker::is_exception).
/// Continuation lines are folded into their entry before it is inspected, so a stack trace never counts
/// as exceptions of its own. The cursor never rewinds. Two readers over the same file never share
/// position.
pub struct LogReader<T: LogLine = LogEntry> {
    lines: Lines<Box<dyn BufRead + Send>>,
    // First entry after the one last returned, read while looking for continuation lines.
    pending: Option<T>,
    exceptions: Vec<T>,
    last_entry_read: Option<T>,
    last_timestamp: Option<NaiveDateTime>,
    entries_read: usize,
    exhausted: bool,
}

impl<T: LogLine> LogReader<T> {
    pub fn new<R: BufRead + Send + 'static>(reader: R) -> Self {
        Self {
            lines: (Box::new(reader) as Box<dyn BufRead + Send>).lines(),
            pending: None,
            exceptions: Vec::new(),
            last_entry_read: None,
            last_timestamp: None,
            entries_read: 0,
            exhausted: false,
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }

    /// Create a reader over an in-memory log.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(Cursor::new(text.into().into_bytes()))
    }

    /// Advance the cursor by one entry. Returns `None` once the stream is exhausted.
    pub fn next_entry(&mut self) -> io::Result<Option<T>> {
        if self.exhausted {
            return Ok(None);
        }

        let mut entry = match self.pending.take() {
            Some(entry) => entry,
            None => match self.parse_next_line()? {
                Some(entry) => entry,
                None => {
                    self.exhausted = true;
                    return Ok(None);
                }
            },
        };

        while let Some(next) = self.parse_next_line()? {
            if entry.is_continued_by(&next) {
                entry.push_continuation(next.text().to_string());
            } else {
                self.pending = Some(next);
                break;
            }
        }

        match (entry.timestamp(), self.last_timestamp) {
            (Some(timestamp), _) => self.last_timestamp = Some(timestamp),
            (None, Some(timestamp)) => entry.inherit_timestamp(timestamp),
            (None, None) => {}
        }
        self.inspect(&entry);
        Ok(Some(entry))
    }

    /// Parse the next non-blank line of the stream, without inspecting it.
    fn parse_next_line(&mut self) -> io::Result<Option<T>> {
        for line in self.lines.by_ref() {
            if let Some(entry) = T::parse(&line?) {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }

    /// Advance the cursor until an entry carrying any of `markers` is found, and return it. Entries in
    /// between are consumed (and inspected for exceptions). Returns `None` if the stream ends first.
    pub fn next_entry_containing(&mut self, markers: &[LogMarker]) -> io::Result<Option<T>> {
        while let Some(entry) = self.next_entry()? {
            if markers.contains(&entry.marker()) {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }

    /// Consume every remaining entry.
    pub fn read_fully(&mut self) -> io::Result<()> {
        while self.next_entry()?.is_some() {}
        Ok(())
    }

    /// The exceptions found in the part of the stream read so far, in stream order.
    pub fn exceptions(&self) -> &[T] {
        &self.exceptions
    }

    pub fn exception_count(&self) -> usize {
        self.exceptions.len()
    }

    pub fn last_entry_read(&self) -> Option<&T> {
        self.last_entry_read.as_ref()
    }

    /// Timestamp of the latest timestamped entry read so far, i.e. the end of the run once the reader
    /// is exhausted.
    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.last_timestamp
    }

    pub fn entries_read(&self) -> usize {
        self.entries_read
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    fn inspect(&mut self, entry: &T) {
        self.entries_read += 1;
        if entry.is_exception() {
            self.exceptions.push(entry.clone());
        }
        self.last_entry_read = Some(entry.clone());
    }
}

impl<T: LogLine> Debug for LogReader<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogReader")
            .field("entries_read", &self.entries_read)
            .field("exceptions", &self.exceptions.len())
            .field("exhausted", &self.exhausted)
            .finish()
    }
}
