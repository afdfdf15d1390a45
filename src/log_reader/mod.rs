/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Reading a node's logs as a sequence of marker-tagged entries.
//!
//! Each node of an experiment produces up to three log streams: the platform log, its stdout, and
//! (in services experiments) the HAPI client log. This module turns those streams into typed entries
//! ([`LogEntry`], [`HapiClientEntry`]) tagged with a [`LogMarker`], and exposes them through a
//! [`LogReader`] cursor.
//!
//! Validators consume a `LogReader` front to back. Because the reader collects exceptions as a side
//! effect of moving over entries, a validator that stops scanning early should call
//! [`LogReader::read_fully`] before looking at [`LogReader::exceptions`].

pub mod markers;
pub use markers::LogMarker;

mod entry;
pub use entry::{is_trace_line, HapiClientEntry, LogEntry, LogLine};

mod reader;
pub use reader::LogReader;
