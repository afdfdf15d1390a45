use regression_validation::csv_reader::{self, CsvColumn, CsvReader};

mod common;

use common::fixtures::csv;

/// Tests the aggregates over a metric column.
#[test]
fn column_aggregates_test() {
    let reader = csv(&[(csv_reader::C2C, &[0.0, 2.0, 8.0, 4.0, 6.0])]);
    let c2c = reader.column(csv_reader::C2C).unwrap();

    assert_eq!(c2c.data_size(), 5);
    assert_eq!(c2c.max(), 8.0);
    // The leading 0 means "not measured yet", not a real minimum.
    assert_eq!(c2c.min_not_0(), 2.0);
    assert_eq!(c2c.average(), 4.0);
    assert_eq!(c2c.last_entry_as_double(), 6.0);
    assert_eq!(c2c.data_element(2), Some("8"));
    assert_eq!(c2c.data_element(5), None);
}

/// Tests reading a CSV with comments, padding, and unparsable cells.
#[test]
fn read_text_test() {
    let reader = CsvReader::from_text(
        "# platform statistics\n\
         trans/sec, q2 ,roundSup\n\
         100.5, 3, 10\n\
         n/a, 4, 11\n\
         120, , 12\n",
    )
    .unwrap();

    let throughput = reader.column(csv_reader::TRANSACTIONS_PER_SEC).unwrap();
    assert_eq!(throughput.values().collect::<Vec<_>>(), vec![100.5, 0.0, 120.0]);
    assert_eq!(reader.column(csv_reader::CONSENSUS_QUEUE_SIZE).unwrap().max(), 4.0);
    assert_eq!(
        reader
            .column(csv_reader::ROUND_SUPER_MAJORITY)
            .unwrap()
            .last_entry_as_double(),
        12.0
    );
    assert!(reader.column(csv_reader::FREE_MEMORY).is_none());
    assert_eq!(reader.columns().len(), 3);
}

/// Tests that an empty column aggregates to zero.
#[test]
fn empty_column_test() {
    let column = CsvColumn::new(csv_reader::FREE_MEMORY, Vec::new());
    assert_eq!(column.max(), 0.0);
    assert_eq!(column.min_not_0(), 0.0);
    assert_eq!(column.average(), 0.0);
    assert_eq!(column.last_entry_as_double(), 0.0);
    assert_eq!(CsvColumn::as_double("  7.25 "), 7.25);
    assert_eq!(CsvColumn::as_double("NaN"), 0.0);
}
