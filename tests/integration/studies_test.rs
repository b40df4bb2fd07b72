//! Building and running the bundled study definitions

use cohort_def::models::TestResult;
use cohort_def::studies::{flowchart_ba2, treatment};
use cohort_def::{
    CodelistRegistry, CohortError, DummyConfig, DummyDataGenerator, Study, Value, dummy_registry,
};

use crate::utils::{adult, date, test_config};

#[test]
fn test_every_study_builds() {
    let registry = dummy_registry().unwrap();
    for name in Study::names() {
        let study = Study::by_name(name, &registry, test_config()).unwrap();
        assert_eq!(study.name, name);
        assert!(!study.rules.is_empty());
        for step in study.flowchart.steps() {
            for reference in step.criterion.required_variables() {
                assert!(
                    study.rules.shape(reference).is_some(),
                    "{name}: step '{}' uses undeclared '{reference}'",
                    step.label
                );
            }
        }
    }
}

#[test]
fn test_unknown_study_name() {
    let registry = dummy_registry().unwrap();
    let err = Study::by_name("vaccine_uptake", &registry, test_config()).unwrap_err();
    assert!(matches!(err, CohortError::Config(ref msg) if msg.contains("treatment")));
}

#[test]
fn test_missing_codelist_is_a_definition_error() {
    let err = treatment::rules(&CodelistRegistry::new()).unwrap_err();
    assert!(matches!(err, CohortError::UnknownCodelist(_)));
    assert!(err.is_definition_error());
}

#[test]
fn test_treatment_study_includes_eligible_adult() {
    let registry = dummy_registry().unwrap();
    let study = treatment::study(&registry, test_config()).unwrap();

    let eligible = adult(1).with_test_result(TestResult::covid_positive(date(2022, 1, 5)));
    let untested = adult(2);
    let run = study.run(&[eligible, untested]).unwrap();

    assert_eq!(run.cohort.len(), 1);
    assert_eq!(run.cohort.value(1, "start_date"), Some(&Value::Date(date(2022, 1, 5))));
    assert_eq!(run.cohort.value(1, "imd"), Some(&Value::from("3")));
    assert_eq!(run.cohort.value(1, "age"), Some(&Value::Int(51)));
    assert_eq!(run.report.total, 2);
    assert_eq!(run.report.included(), 1);
}

#[test]
fn test_flowchart_counts_are_consistent() {
    let registry = dummy_registry().unwrap();
    let config = test_config();
    let study = flowchart_ba2::study(&registry, config.clone()).unwrap();
    let patients = DummyDataGenerator::new(&registry, &config, DummyConfig::default()).generate(200, false);

    let run = study.run(&patients).unwrap();
    let report = &run.report;

    assert_eq!(report.total, patients.len());
    assert_eq!(report.counts.len(), study.flowchart.steps().len());
    let mut remaining = report.total;
    for count in &report.counts {
        assert_eq!(count.remaining + count.excluded, remaining, "step '{}'", count.label);
        remaining = count.remaining;
    }
    assert_eq!(report.included(), run.cohort.len());
}

#[test]
fn test_parallel_and_sequential_runs_agree() {
    let registry = dummy_registry().unwrap();
    let sequential = test_config();
    let mut parallel = sequential.clone();
    parallel.evaluation.parallel = true;
    parallel.evaluation.num_threads = Some(4);

    let patients = DummyDataGenerator::new(&registry, &sequential, DummyConfig::default()).generate(100, false);
    let a = Study::by_name(treatment::NAME, &registry, sequential).unwrap().run(&patients).unwrap();
    let b = Study::by_name(treatment::NAME, &registry, parallel).unwrap().run(&patients).unwrap();

    assert_eq!(a.cohort.rows(), b.cohort.rows());
    assert_eq!(a.report, b.report);
}
