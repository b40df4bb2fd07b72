//! Tests for codelist composition and loading

use std::collections::BTreeSet;
use std::fs;

use cohort_def::codelist::{
    ClinicalCode, Codelist, CodelistRegistry, CodelistSpec, CodingSystem,
};
use cohort_def::CohortError;

#[test]
fn test_combine_is_exact_union() {
    let cases: [(&[&str], &[&str]); 3] = [
        (&["1", "2", "3"], &["3", "4"]),
        (&["10"], &[]),
        (&["5", "6"], &["6", "5"]),
    ];

    for (a_codes, b_codes) in cases {
        let a = Codelist::new("a", CodingSystem::Snomed, a_codes.iter().copied());
        let b = Codelist::new("b", CodingSystem::Snomed, b_codes.iter().copied());
        let combined = Codelist::combine("ab", &[&a, &b]);

        let expected: BTreeSet<ClinicalCode> = a.codes().chain(b.codes()).cloned().collect();
        let actual: BTreeSet<ClinicalCode> = combined.codes().cloned().collect();
        assert_eq!(actual, expected);
        assert_eq!(combined.len(), expected.len(), "no duplicates after combine");
    }
}

#[test]
fn test_combine_across_systems() {
    let dmd = Codelist::new("dmd", CodingSystem::Dmd, ["10514511000001106"]);
    let snomed = Codelist::new("snomed", CodingSystem::Snomed, ["10514511000001106"]);
    let combined = Codelist::combine("drugs", &[&dmd, &snomed]);

    // The same digits in two systems are two distinct codes
    assert_eq!(combined.len(), 2);
    assert!(combined.matches(CodingSystem::Dmd, "10514511000001106"));
    assert!(combined.matches(CodingSystem::Snomed, "10514511000001106"));
}

#[test]
fn test_load_catalog_from_directory() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("covid.csv"), "icd10_code,term\nU071,Confirmed\nU072,Suspected\n").unwrap();
    fs::write(
        dir.path().join("ethnicity.csv"),
        "code,term,grouping_6_id\n976631000000101,White,1\n92491000000104,Asian,3\n",
    )
    .unwrap();

    let specs = [
        CodelistSpec::new("covid_icd10", "covid.csv", CodingSystem::Icd10, "icd10_code", None),
        CodelistSpec::new("ethnicity", "ethnicity.csv", CodingSystem::Snomed, "code", Some("grouping_6_id")),
    ];
    let registry = CodelistRegistry::load_catalog(dir.path(), &specs).unwrap();

    assert!(registry.get("covid_icd10").unwrap().matches(CodingSystem::Icd10, "U07.1"));
    let ethnicity = registry.get("ethnicity").unwrap();
    assert_eq!(ethnicity.lookup(CodingSystem::Snomed, "92491000000104"), Some(Some("3")));
    // Literal lists are always present
    assert!(registry.contains("mabs_procedure"));
}

#[test]
fn test_missing_codelist_file_fails_before_evaluation() {
    let dir = tempfile::tempdir().unwrap();
    let specs = [CodelistSpec::new("covid_icd10", "absent.csv", CodingSystem::Icd10, "code", None)];
    let err = CodelistRegistry::load_catalog(dir.path(), &specs).unwrap_err();
    assert!(matches!(err, CohortError::Io { .. }));
    assert!(err.to_string().contains("absent.csv"));
}

#[test]
fn test_filter_by_category_through_registry() {
    let registry = CodelistRegistry::new().with(Codelist::with_categories(
        "ethnicity",
        CodingSystem::Snomed,
        [("1", "1"), ("2", "2"), ("3", "1")],
    ));
    let white = registry.filter_by_category("ethnicity", "white", &["1"]).unwrap();
    assert_eq!(white.len(), 2);
    assert!(!white.matches(CodingSystem::Snomed, "2"));
}
