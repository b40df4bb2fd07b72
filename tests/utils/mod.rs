use chrono::NaiveDate;

use cohort_def::codelist::{Codelist, CodelistRegistry, CodingSystem};
use cohort_def::models::{Address, Patient, Registration, Sex};
use cohort_def::{
    Dataset, EvaluationConfig, Evaluator, RuleSet, RuleSetBuilder, StudyConfig, Value,
};

/// Shorthand for a calendar date
#[must_use]
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Campaign start used by most tests
#[must_use]
pub fn index_date() -> NaiveDate {
    date(2021, 12, 16)
}

/// Sequential configuration at the campaign dates
#[must_use]
pub fn test_config() -> StudyConfig {
    StudyConfig::new(index_date(), date(2022, 12, 31))
        .unwrap()
        .with_evaluation(EvaluationConfig::sequential())
}

/// Small registry of hand-written codelists
#[must_use]
pub fn test_registry() -> CodelistRegistry {
    CodelistRegistry::new()
        .with(Codelist::new("covid_icd10", CodingSystem::Icd10, ["U07.1", "U07.2"]))
        .with(Codelist::new("asthma", CodingSystem::Snomed, ["195967001", "233678006"]))
        .with(Codelist::new("weight", CodingSystem::Snomed, ["27113001"]))
        .with(Codelist::with_categories(
            "ethnicity",
            CodingSystem::Snomed,
            [("976631000000101", "1"), ("92491000000104", "3")],
        ))
}

/// An adult registered since 2010, living at an address with a known IMD rank
#[must_use]
pub fn adult(patient_id: u64) -> Patient {
    Patient::new(patient_id)
        .with_sex(Sex::Female)
        .with_date_of_birth(date(1970, 6, 1))
        .with_registration(Registration::new(date(2010, 1, 1), None).with_stp("E54000008"))
        .with_address(Address::new(date(2010, 1, 1), None).with_imd_rank(15_432))
}

/// Build a rule set, panicking on definition errors
#[must_use]
pub fn build(builder: RuleSetBuilder) -> RuleSet {
    builder.build().expect("rule set should validate")
}

/// Evaluate every patient without applying the population predicate
#[must_use]
pub fn evaluate(rules: RuleSet, patients: &[Patient]) -> Dataset {
    Evaluator::new(rules, test_config())
        .evaluate_dataset(patients)
        .expect("evaluation should succeed")
}

/// Value of a column for a patient
#[must_use]
pub fn value<'a>(dataset: &'a Dataset, patient_id: u64, column: &str) -> &'a Value {
    dataset
        .value(patient_id, column)
        .unwrap_or_else(|| panic!("no value for patient {patient_id} column {column}"))
}
