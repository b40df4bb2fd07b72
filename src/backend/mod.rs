//! Patient record backends
//!
//! A backend supplies the patients a study is evaluated against. Backend failures
//! are fatal for the run and are not retried.

pub mod json;
pub mod memory;

use crate::error::Result;
use crate::models::Patient;

pub use json::JsonFileBackend;
pub use memory::InMemoryBackend;

/// Source of patient records
pub trait PatientBackend: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Fetch every patient record, in the order they should appear in the output
    fn fetch_patients(&self) -> Result<Vec<Patient>>;
}
