//! Primary care records: coded clinical events and medication issues

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::codelist::CodingSystem;

const fn snomed() -> CodingSystem {
    CodingSystem::Snomed
}

const fn dmd() -> CodingSystem {
    CodingSystem::Dmd
}

/// A coded event in the primary care record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalEvent {
    pub date: NaiveDate,
    #[serde(default = "snomed")]
    pub system: CodingSystem,
    pub code: String,
    /// Numeric value attached to the event (e.g. a weight in kg)
    #[serde(default)]
    pub numeric_value: Option<f64>,
}

impl ClinicalEvent {
    /// A SNOMED CT coded event
    pub fn new(date: NaiveDate, code: impl Into<String>) -> Self {
        Self {
            date,
            system: CodingSystem::Snomed,
            code: code.into(),
            numeric_value: None,
        }
    }

    #[must_use]
    pub fn with_value(mut self, value: f64) -> Self {
        self.numeric_value = Some(value);
        self
    }
}

/// A medication issued in primary care
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationIssue {
    pub date: NaiveDate,
    #[serde(default = "dmd")]
    pub system: CodingSystem,
    pub code: String,
}

impl MedicationIssue {
    /// A dm+d coded issue
    pub fn new(date: NaiveDate, code: impl Into<String>) -> Self {
        Self {
            date,
            system: CodingSystem::Dmd,
            code: code.into(),
        }
    }

    /// An issue recorded with a code from another system
    pub fn with_system(date: NaiveDate, system: CodingSystem, code: impl Into<String>) -> Self {
        Self {
            date,
            system,
            code: code.into(),
        }
    }
}
