//! Backend reading patients from a JSON file holding an array of patient records

use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::backend::PatientBackend;
use crate::error::util::safe_open_file;
use crate::error::{CohortError, Result};
use crate::models::Patient;
use crate::utils::logging::{log_file_done, log_file_start};

/// Reads patients from a JSON array on every fetch
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write patients as a JSON array, e.g. to snapshot generated dummy data
    pub fn write(path: &Path, patients: &[Patient]) -> Result<()> {
        let file = crate::error::util::safe_create_file(path, "writing patient records")?;
        serde_json::to_writer(std::io::BufWriter::new(file), patients)?;
        Ok(())
    }
}

impl PatientBackend for JsonFileBackend {
    fn name(&self) -> &str {
        "json-file"
    }

    fn fetch_patients(&self) -> Result<Vec<Patient>> {
        let start = Instant::now();
        log_file_start("Reading patients from", &self.path);

        let file = safe_open_file(&self.path, "reading patient records")
            .map_err(|e| CohortError::Backend(e.to_string()))?;
        let patients: Vec<Patient> = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| CohortError::Backend(format!("{}: {e}", self.path.display())))?;

        log_file_done("Read", patients.len(), "patients", &self.path, start.elapsed());
        Ok(patients)
    }
}
