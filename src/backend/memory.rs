//! Backend over patients already held in memory

use crate::backend::PatientBackend;
use crate::error::Result;
use crate::models::Patient;

/// Serves a fixed list of patients
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    patients: Vec<Patient>,
}

impl InMemoryBackend {
    #[must_use]
    pub const fn new(patients: Vec<Patient>) -> Self {
        Self { patients }
    }

    #[must_use]
    pub fn with_patient(mut self, patient: Patient) -> Self {
        self.patients.push(patient);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.patients.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }
}

impl From<Vec<Patient>> for InMemoryBackend {
    fn from(patients: Vec<Patient>) -> Self {
        Self::new(patients)
    }
}

impl PatientBackend for InMemoryBackend {
    fn name(&self) -> &str {
        "in-memory"
    }

    fn fetch_patients(&self) -> Result<Vec<Patient>> {
        Ok(self.patients.clone())
    }
}
