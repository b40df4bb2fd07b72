//! Hospital admission records

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One hospital spell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admission {
    pub admission_date: NaiveDate,
    #[serde(default)]
    pub discharge_date: Option<NaiveDate>,
    /// ICD-10 primary diagnosis
    #[serde(default)]
    pub primary_diagnosis: Option<String>,
    /// ICD-10 secondary diagnoses
    #[serde(default)]
    pub diagnoses: Vec<String>,
    /// OPCS-4 procedures
    #[serde(default)]
    pub procedures: Vec<String>,
    /// Patient classification ("1" is an ordinary admission)
    #[serde(default)]
    pub patient_classification: Option<String>,
    /// Admission method ("2x" codes are emergencies)
    #[serde(default)]
    pub admission_method: Option<String>,
    #[serde(default)]
    pub days_in_critical_care: Option<u32>,
}

impl Admission {
    #[must_use]
    pub fn new(admission_date: NaiveDate) -> Self {
        Self {
            admission_date,
            discharge_date: None,
            primary_diagnosis: None,
            diagnoses: Vec::new(),
            procedures: Vec::new(),
            patient_classification: None,
            admission_method: None,
            days_in_critical_care: None,
        }
    }

    #[must_use]
    pub fn discharged(mut self, date: NaiveDate) -> Self {
        self.discharge_date = Some(date);
        self
    }

    #[must_use]
    pub fn with_primary_diagnosis(mut self, code: impl Into<String>) -> Self {
        self.primary_diagnosis = Some(code.into());
        self
    }

    #[must_use]
    pub fn with_diagnosis(mut self, code: impl Into<String>) -> Self {
        self.diagnoses.push(code.into());
        self
    }

    #[must_use]
    pub fn with_procedure(mut self, code: impl Into<String>) -> Self {
        self.procedures.push(code.into());
        self
    }

    /// Set patient classification and admission method
    #[must_use]
    pub fn classified(mut self, classification: impl Into<String>, method: impl Into<String>) -> Self {
        self.patient_classification = Some(classification.into());
        self.admission_method = Some(method.into());
        self
    }

    #[must_use]
    pub fn with_critical_care_days(mut self, days: u32) -> Self {
        self.days_in_critical_care = Some(days);
        self
    }

    /// All recorded diagnoses, primary first
    pub fn all_diagnoses(&self) -> impl Iterator<Item = &str> {
        self.primary_diagnosis
            .iter()
            .chain(self.diagnoses.iter())
            .map(String::as_str)
    }
}
