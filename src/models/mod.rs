//! Patient record models
//!
//! These are the read-only records a backend supplies. Each event stream keeps the
//! order the backend delivered it in; that order breaks ties between same-day events.

pub mod covid;
pub mod demographics;
pub mod events;
pub mod hospital;
pub mod patient;

pub use covid::{TestOutcome, TestResult, TherapeuticRecord, Vaccination};
pub use demographics::{Address, DeathRecord, Registration, Sex};
pub use events::{ClinicalEvent, MedicationIssue};
pub use hospital::Admission;
pub use patient::Patient;

/// Pathogen name used for SARS-CoV-2 test results
pub const SARS_COV_2: &str = "SARS-CoV-2";

/// Vaccination target disease for COVID-19 vaccines
pub const SARS_2_CORONAVIRUS: &str = "SARS-2 CORONAVIRUS";
