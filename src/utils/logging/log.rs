//! Logger setup and the messages shared by study file readers and writers

use std::path::Path;
use std::time::Duration;

use env_logger::Env;
use log::LevelFilter;

/// Initialise `env_logger` at `info` unless `RUST_LOG` says otherwise.
///
/// Parquet and Arrow internals are capped at `warn`. Repeated calls are ignored.
pub fn init_logging() {
    let _ = env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module("parquet", LevelFilter::Warn)
        .filter_module("arrow", LevelFilter::Warn)
        .parse_env(Env::default())
        .format_timestamp_millis()
        .try_init();
}

/// Logged before a codelist, patient or dataset file is touched
pub fn log_file_start(action: &str, path: &Path) {
    log::info!("{action} {}", path.display());
}

/// Logged once a file has been read or written, e.g. "Wrote 512 rows"
pub fn log_file_done(action: &str, count: usize, unit: &str, path: &Path, elapsed: Duration) {
    log::info!("{action} {count} {unit} ({}) in {elapsed:.2?}", path.display());
}
