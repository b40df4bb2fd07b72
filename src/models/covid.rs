//! COVID-19 specific records: test results, vaccinations and treatments

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Outcome of a laboratory test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestOutcome {
    Positive,
    Negative,
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Positive => f.write_str("positive"),
            Self::Negative => f.write_str("negative"),
        }
    }
}

/// A laboratory test result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub specimen_date: NaiveDate,
    pub pathogen: String,
    pub result: TestOutcome,
    /// Symptom status reported at testing ("Y", "N")
    #[serde(default)]
    pub symptomatic: Option<String>,
    /// S-gene target failure ("0", "1", "9")
    #[serde(default)]
    pub sgtf: Option<String>,
    /// Sequenced variant
    #[serde(default)]
    pub variant: Option<String>,
}

impl TestResult {
    pub fn new(specimen_date: NaiveDate, pathogen: impl Into<String>, result: TestOutcome) -> Self {
        Self {
            specimen_date,
            pathogen: pathogen.into(),
            result,
            symptomatic: None,
            sgtf: None,
            variant: None,
        }
    }

    /// A positive SARS-CoV-2 result
    #[must_use]
    pub fn covid_positive(specimen_date: NaiveDate) -> Self {
        Self::new(specimen_date, crate::models::SARS_COV_2, TestOutcome::Positive)
    }

    /// A negative SARS-CoV-2 result
    #[must_use]
    pub fn covid_negative(specimen_date: NaiveDate) -> Self {
        Self::new(specimen_date, crate::models::SARS_COV_2, TestOutcome::Negative)
    }

    #[must_use]
    pub fn with_symptomatic(mut self, symptomatic: impl Into<String>) -> Self {
        self.symptomatic = Some(symptomatic.into());
        self
    }

    #[must_use]
    pub fn with_sgtf(mut self, sgtf: impl Into<String>) -> Self {
        self.sgtf = Some(sgtf.into());
        self
    }

    #[must_use]
    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }
}

/// A vaccination record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vaccination {
    pub date: NaiveDate,
    pub target_disease: String,
    #[serde(default)]
    pub product_name: Option<String>,
}

impl Vaccination {
    pub fn new(date: NaiveDate, target_disease: impl Into<String>) -> Self {
        Self {
            date,
            target_disease: target_disease.into(),
            product_name: None,
        }
    }
}

/// A record from the COVID-19 therapeutics dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TherapeuticRecord {
    pub treatment_start_date: NaiveDate,
    /// Drug name, e.g. "Paxlovid"
    pub intervention: String,
    #[serde(default)]
    pub current_status: Option<String>,
    /// e.g. "non_hospitalised"
    #[serde(default)]
    pub indication: Option<String>,
    /// Comma-separated high-risk groups the patient was treated under
    #[serde(default)]
    pub risk_cohort: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

impl TherapeuticRecord {
    pub fn new(treatment_start_date: NaiveDate, intervention: impl Into<String>) -> Self {
        Self {
            treatment_start_date,
            intervention: intervention.into(),
            current_status: None,
            indication: None,
            risk_cohort: None,
            region: None,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.current_status = Some(status.into());
        self
    }

    #[must_use]
    pub fn with_indication(mut self, indication: impl Into<String>) -> Self {
        self.indication = Some(indication.into());
        self
    }

    #[must_use]
    pub fn with_risk_cohort(mut self, risk_cohort: impl Into<String>) -> Self {
        self.risk_cohort = Some(risk_cohort.into());
        self
    }

    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}
