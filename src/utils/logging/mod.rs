//! Logging, progress bars and console summaries

pub mod console;
pub mod log;
pub mod progress;

pub use console::{print_dataset_summary, print_sample_rows, print_schema_info, print_study_report};
pub use log::{init_logging, log_file_done, log_file_start};
pub use progress::{patient_bar, spinner};
