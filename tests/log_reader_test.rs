use chrono::Duration;

use regression_validation::log_reader::{
    markers::{EXCEPTION, PTD_FINISH, RECONNECT_START, SOCKET_EXCEPTIONS, SUITE_PASSED, SUITE_START},
    is_trace_line, HapiClientEntry, LogEntry, LogLine, LogMarker, LogReader,
};

mod common;

use common::fixtures::{hapi_log, line, log, run_start};

/// Tests that a structured line is split into its timestamp, marker, and message.
#[test]
fn parse_structured_line_test() {
    let entry = LogEntry::parse(&line(12, RECONNECT_START, "Reconnect started with node 2")).unwrap();

    assert_eq!(entry.timestamp(), Some(run_start() + Duration::seconds(12)));
    assert_eq!(entry.marker(), LogMarker::ReconnectStart);
    assert_eq!(entry.text(), "Reconnect started with node 2");
}

/// Tests that lines without the structured layout are classified by their content.
#[test]
fn parse_unstructured_line_test() {
    let socket = LogEntry::parse("java.net.SocketException: Connection reset").unwrap();
    assert_eq!(socket.marker(), LogMarker::SocketException);
    assert_eq!(socket.timestamp(), None);

    let exception = LogEntry::parse("java.lang.IllegalStateException: bad state").unwrap();
    assert_eq!(exception.marker(), LogMarker::Exception);

    let plain = LogEntry::parse("    at com.swirlds.platform.Main.run(Main.java:12)").unwrap();
    assert_eq!(plain.marker(), LogMarker::Unstructured);

    assert!(LogEntry::parse("   ").is_none());
}

/// Tests that marker names outside the vocabulary still parse, as `Other`.
#[test]
fn parse_unknown_marker_test() {
    let entry = LogEntry::parse(&line(0, "SOME_NEW_MARKER", "hello")).unwrap();
    assert_eq!(entry.marker(), LogMarker::Other);
    assert!(!entry.is_exception());
}

/// Tests that the round number ending a message is extracted.
#[test]
fn trailing_number_test() {
    let entry = LogEntry::new(None, LogMarker::FreezeStateSaved, "state saved for round 19");
    assert_eq!(entry.trailing_number(), Some(19));

    let entry = LogEntry::new(None, LogMarker::LoadRestart, "loaded round 5.");
    assert_eq!(entry.trailing_number(), Some(5));

    let entry = LogEntry::new(None, LogMarker::LoadRestart, "no round here");
    assert_eq!(entry.trailing_number(), None);
}

/// Tests that searching for a marker consumes the entries in between, and that every exception passed
/// over is collected exactly once.
#[test]
fn next_entry_containing_collects_exceptions_test() {
    // 1. Build a log with exceptions on both sides of the searched-for marker.
    let mut reader = log(&[
        line(0, EXCEPTION, "first"),
        line(1, "STARTUP", "node started"),
        line(2, SOCKET_EXCEPTIONS, "second"),
        line(3, PTD_FINISH, "done"),
        line(4, EXCEPTION, "third"),
    ]);

    // 2. Search for the marker in the middle.
    let found = reader
        .next_entry_containing(&[LogMarker::PtdFinish])
        .unwrap()
        .unwrap();
    assert_eq!(found.text(), "done");
    assert_eq!(reader.exception_count(), 2);
    assert_eq!(reader.last_entry_read().map(LogLine::text), Some("done"));

    // 3. Searching again finds nothing, but drains the rest of the log.
    assert!(reader
        .next_entry_containing(&[LogMarker::PtdFinish])
        .unwrap()
        .is_none());
    assert!(reader.is_exhausted());
    assert_eq!(reader.exception_count(), 3);

    // 4. Reading an exhausted log changes nothing.
    reader.read_fully().unwrap();
    assert_eq!(reader.exception_count(), 3);
    assert_eq!(reader.entries_read(), 5);
    let texts: Vec<&str> = reader.exceptions().iter().map(LogLine::text).collect();
    assert_eq!(texts, vec!["first", "second", "third"]);
}

/// Tests that the stack trace of an exception is folded into it, so the exception is collected once.
#[test]
fn stack_trace_folding_test() {
    let mut reader: LogReader<LogEntry> = LogReader::from_text(format!(
        "{}\njava.net.SocketException: Broken pipe\n\tat java.net.Socket.write(Socket.java:1)\n{}",
        line(40, EXCEPTION, "Connection to node 1 lost"),
        line(41, PTD_FINISH, "done")
    ));

    let exception = reader.next_entry().unwrap().unwrap();
    assert_eq!(exception.marker(), LogMarker::Exception);
    assert_eq!(exception.text(), "Connection to node 1 lost");
    assert_eq!(
        exception.continuation(),
        [
            "java.net.SocketException: Broken pipe".to_string(),
            "\tat java.net.Socket.write(Socket.java:1)".to_string(),
        ]
    );

    reader.read_fully().unwrap();
    assert_eq!(reader.exception_count(), 1);
    assert_eq!(reader.entries_read(), 2);
    assert_eq!(reader.last_timestamp(), Some(run_start() + Duration::seconds(41)));

    assert!(is_trace_line("\tat java.net.Socket.write(Socket.java:1)"));
    assert!(is_trace_line("Caused by: java.io.EOFException"));
    assert!(is_trace_line("... 12 more"));
    assert!(!is_trace_line("java.net.SocketException: Broken pipe"));
}

/// Tests that an exception line after a structured line that is not an exception stands on its own, and
/// inherits the timestamp of that structured line.
#[test]
fn timestamp_inheritance_test() {
    let mut reader: LogReader<LogEntry> = LogReader::from_text(format!(
        "{}\njava.lang.IllegalStateException: bad state\n\tat com.swirlds.demo.Main.run(Main.java:40)",
        line(40, "STARTUP", "node started")
    ));
    reader.read_fully().unwrap();

    let exceptions = reader.exceptions();
    assert_eq!(exceptions.len(), 1);
    assert_eq!(exceptions[0].marker(), LogMarker::Exception);
    assert_eq!(exceptions[0].timestamp(), Some(run_start() + Duration::seconds(40)));
    assert_eq!(exceptions[0].continuation().len(), 1);
    assert_eq!(reader.entries_read(), 2);
}

/// Tests that in a stream without timestamps only trace lines are folded, so consecutive exceptions
/// are each collected.
#[test]
fn untimestamped_stream_test() {
    let mut reader: LogReader<LogEntry> = LogReader::from_text(
        "Starting node 0\n\
         java.lang.NullPointerException: state is null\n\
         \tat Main.run(Main.java:40)\n\
         java.lang.IllegalStateException: node halted\n\
         Node 0 stopped",
    );
    reader.read_fully().unwrap();

    assert_eq!(reader.entries_read(), 4);
    assert_eq!(reader.exception_count(), 2);
    assert_eq!(reader.exceptions()[0].continuation().len(), 1);
    assert!(reader.exceptions()[1].continuation().is_empty());
    assert_eq!(reader.last_entry_read().map(LogLine::text), Some("Node 0 stopped"));
    assert_eq!(reader.last_timestamp(), None);
}

/// Tests that HAPI client lines carry the name of their suite.
#[test]
fn hapi_client_entry_test() {
    let mut reader = hapi_log(&[
        line(0, SUITE_START, "'CryptoTransferSuite' starting"),
        line(5, SUITE_PASSED, "'CryptoTransferSuite' all 12 specs passed"),
        "free text without suite".to_string(),
    ]);

    let start: HapiClientEntry = reader.next_entry().unwrap().unwrap();
    assert_eq!(start.marker(), LogMarker::SuiteStart);
    assert_eq!(start.suite(), Some("CryptoTransferSuite"));
    assert_eq!(start.text(), "starting");

    let passed = reader.next_entry().unwrap().unwrap();
    assert_eq!(passed.marker(), LogMarker::SuitePassed);
    assert_eq!(passed.text(), "all 12 specs passed");

    let free = reader.next_entry().unwrap().unwrap();
    assert_eq!(free.suite(), None);
    assert!(reader.next_entry().unwrap().is_none());
}

/// Tests that every marker survives a round trip through its wire name.
#[test]
fn marker_names_test() {
    for marker in [
        LogMarker::Exception,
        LogMarker::SocketException,
        LogMarker::ReconnectFinished,
        LogMarker::ReceiveStateHashMismatch,
        LogMarker::SignedStateDeleteQueueTooBig,
        LogMarker::MigrationEndProcess,
        LogMarker::WrongStatus,
    ] {
        assert_eq!(LogMarker::from_name(marker.name()), marker);
    }
    assert!(LogMarker::ReceiveStateError.is_exception());
    assert!(!LogMarker::ReconnectStart.is_exception());
}
