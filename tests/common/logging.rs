use log::LevelFilter;

// Set up a logger that prints validation events with level `level` and above onto stdout.
pub(crate) fn setup_logger(level: LevelFilter) {
    regression_validation::logging::setup_logger(level, None).unwrap()
}
