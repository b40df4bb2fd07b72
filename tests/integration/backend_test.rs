//! Patient backends feeding the evaluator

use cohort_def::models::{Admission, DeathRecord, TestResult, TherapeuticRecord};
use cohort_def::studies::fragments::covid;
use cohort_def::{
    CohortError, DateExpr, Evaluator, Expr, InMemoryBackend, JsonFileBackend, PatientBackend,
    RuleSet,
};

use crate::utils::{adult, build, date, test_config};

#[test]
fn test_json_backend_roundtrip() {
    let patients = vec![
        adult(1)
            .with_test_result(
                TestResult::covid_positive(date(2022, 1, 5))
                    .with_symptomatic("Y")
                    .with_variant("BA.2"),
            )
            .with_therapeutic(TherapeuticRecord::new(date(2022, 1, 6), "Sotrovimab")),
        adult(2)
            .with_admission(
                Admission::new(date(2021, 11, 2))
                    .discharged(date(2021, 11, 9))
                    .with_primary_diagnosis("U071"),
            )
            .with_death(DeathRecord::new(date(2022, 2, 1), ["U071"])),
    ];

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("patients.json");
    JsonFileBackend::write(&path, &patients).unwrap();

    let backend = JsonFileBackend::new(&path);
    assert_eq!(backend.fetch_patients().unwrap(), patients);
}

#[test]
fn test_json_backend_failure_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let missing = JsonFileBackend::new(dir.path().join("absent.json"));
    assert!(matches!(missing.fetch_patients(), Err(CohortError::Backend(_))));

    let malformed = dir.path().join("bad.json");
    std::fs::write(&malformed, "{\"patient_id\": 1").unwrap();
    let err = JsonFileBackend::new(&malformed).fetch_patients().unwrap_err();
    assert!(matches!(err, CohortError::Backend(ref msg) if msg.contains("bad.json")));
}

#[test]
fn test_extract_from_backend() {
    let rules: RuleSet = build(
        RuleSet::builder()
            .extend(covid::positive_test(&DateExpr::index(), None))
            .population(Expr::var("covid_test_positive")),
    );
    let backend = InMemoryBackend::default()
        .with_patient(adult(1))
        .with_patient(adult(2).with_test_result(TestResult::covid_positive(date(2022, 2, 2))))
        .with_patient(adult(3).with_test_result(TestResult::covid_negative(date(2022, 2, 2))));
    assert_eq!(backend.len(), 3);

    let cohort = Evaluator::new(rules, test_config()).extract_from(&backend).unwrap();
    assert_eq!(cohort.len(), 1);
    assert_eq!(cohort.rows()[0].patient_id, 2);
}
