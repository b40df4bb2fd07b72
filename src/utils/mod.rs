//! Utility functions shared across the crate
//!
//! Logging setup, progress reporting and console summaries.

pub mod logging;

pub use logging::init_logging;
