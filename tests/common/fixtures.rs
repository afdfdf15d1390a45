use chrono::{Duration, NaiveDate, NaiveDateTime};

use regression_validation::{
    csv_reader::CsvReader,
    expected_map::{EntityKey, EntityType, ExpectedValue, Status, TransactionState, TransactionType},
    log_reader::{HapiClientEntry, LogEntry, LogReader},
    node_data::NodeData,
};

/// The instant every fixture log starts at.
pub(crate) fn run_start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap()
}

/// A structured platform log line logged `secs` seconds into the run.
pub(crate) fn line(secs: i64, marker: &str, message: &str) -> String {
    let at = run_start() + Duration::seconds(secs);
    format!("{} {} {}", at.format("%Y-%m-%d %H:%M:%S%.3f"), marker, message)
}

pub(crate) fn log(lines: &[String]) -> LogReader<LogEntry> {
    LogReader::from_text(lines.join("\n"))
}

pub(crate) fn hapi_log(lines: &[String]) -> LogReader<HapiClientEntry> {
    LogReader::from_text(lines.join("\n"))
}

/// A metrics CSV with one column per `(name, samples)` pair. Columns are padded with zeros to the
/// longest one.
pub(crate) fn csv(columns: &[(&str, &[f64])]) -> CsvReader {
    let rows = columns.iter().map(|(_, samples)| samples.len()).max().unwrap_or(0);
    let mut text = columns
        .iter()
        .map(|(name, _)| name.to_string())
        .collect::<Vec<_>>()
        .join(",");
    for row in 0..rows {
        text.push('\n');
        let cells = columns
            .iter()
            .map(|(_, samples)| samples.get(row).copied().unwrap_or(0.0).to_string())
            .collect::<Vec<_>>();
        text.push_str(&cells.join(","));
    }
    CsvReader::from_text(&text).unwrap()
}

/// Metrics of a node that stayed healthy for the whole run, ending at round `final_round`.
pub(crate) fn healthy_csv(final_round: f64) -> CsvReader {
    csv(&[
        ("secC2C", &[1.0, 1.2, 1.1, 1.3]),
        ("q2", &[10.0, 20.0, 15.0, 12.0]),
        ("rounds/sec", &[5.0, 6.0, 5.5, 6.0]),
        ("sigStateHashTime", &[0.01, 0.02, 0.015, 0.01]),
        ("memFree", &[4.0e9, 3.9e9, 3.8e9, 3.8e9]),
        ("memTotUsed", &[1.0e9, 1.1e9, 1.2e9, 1.2e9]),
        ("memMax", &[8.0e9, 8.0e9, 8.0e9, 8.0e9]),
        ("diskspaceFree", &[1.0e11, 1.0e11, 1.0e11, 1.0e11]),
        ("roundSup", &[final_round - 30.0, final_round - 20.0, final_round - 10.0, final_round]),
    ])
}

pub(crate) fn node(lines: &[String], csv: CsvReader) -> NodeData {
    NodeData::new(Some(log(lines)), Some(csv))
}

pub(crate) fn key(num: u64) -> EntityKey {
    EntityKey::new(0, 0, num)
}

/// An entity whose latest handled transaction was of type `transaction_type`.
pub(crate) fn handled(transaction_type: TransactionType) -> ExpectedValue {
    let mut value = ExpectedValue::new(EntityType::Crypto);
    value.latest_handled_status = Some(Status::new(TransactionState::Handled, transaction_type));
    value.history_handled_status = Some(Status::new(TransactionState::Handled, TransactionType::Create));
    value
}
