//! Per-patient evaluation semantics

use cohort_def::models::{Address, Admission, ClinicalEvent, Patient, TestResult};
use cohort_def::rules::{
    AdmissionFilter, Categories, CategorySource, Returning, TestFilter, TestResultFilter,
};
use cohort_def::{DateExpr, Expr, Rule, RuleSet, SourceRule, Value, Variable};

use crate::utils::{adult, build, date, evaluate, test_registry, value};

fn positive_test() -> SourceRule {
    SourceRule::test_results(TestFilter::sars_cov_2(TestResultFilter::Positive))
}

#[test]
fn test_no_matching_records() {
    let registry = test_registry();
    let asthma = registry.get("asthma").unwrap();
    let rules = build(
        RuleSet::builder()
            .variable("has_asthma", SourceRule::clinical_events(asthma.clone()))
            .variable("asthma_date", SourceRule::clinical_events(asthma.clone()).returning_date())
            .variable("asthma_count", SourceRule::clinical_events(asthma).returning_count())
            .variable("asthma_when", Rule::date_of("has_asthma")),
    );

    let dataset = evaluate(rules, &[adult(1)]);
    assert_eq!(value(&dataset, 1, "has_asthma"), &Value::Bool(false));
    assert_eq!(value(&dataset, 1, "asthma_date"), &Value::Null);
    assert_eq!(value(&dataset, 1, "asthma_count"), &Value::Int(0));
    assert_eq!(value(&dataset, 1, "asthma_when"), &Value::Null);
}

#[test]
fn test_first_and_last_match() {
    let registry = test_registry();
    let asthma = registry.get("asthma").unwrap();
    let rules = build(
        RuleSet::builder()
            .variable("first", SourceRule::clinical_events(asthma.clone()).find_first().returning_date())
            .variable("last", SourceRule::clinical_events(asthma.clone()).find_last().returning_date())
            .variable("count", SourceRule::clinical_events(asthma).returning_count()),
    );

    let several = adult(1)
        .with_clinical_event(ClinicalEvent::new(date(2019, 3, 2), "233678006"))
        .with_clinical_event(ClinicalEvent::new(date(2015, 7, 9), "195967001"))
        .with_clinical_event(ClinicalEvent::new(date(2020, 1, 20), "195967001"))
        .with_clinical_event(ClinicalEvent::new(date(2021, 1, 1), "1234"));
    let single = adult(2).with_clinical_event(ClinicalEvent::new(date(2018, 5, 5), "195967001"));

    let dataset = evaluate(rules, &[several, single]);
    assert_eq!(value(&dataset, 1, "first"), &Value::Date(date(2015, 7, 9)));
    assert_eq!(value(&dataset, 1, "last"), &Value::Date(date(2020, 1, 20)));
    assert_eq!(value(&dataset, 1, "count"), &Value::Int(3));
    assert_eq!(value(&dataset, 2, "first"), value(&dataset, 2, "last"));
    assert_eq!(value(&dataset, 2, "first"), &Value::Date(date(2018, 5, 5)));
}

#[test]
fn test_window_bounds_are_inclusive() {
    let registry = test_registry();
    let rules = build(RuleSet::builder().variable(
        "asthma_recent",
        SourceRule::clinical_events(registry.get("asthma").unwrap()).between(
            DateExpr::parse("index_date - 30 days").unwrap(),
            DateExpr::index(),
        ),
    ));

    let on_start = adult(1).with_clinical_event(ClinicalEvent::new(date(2021, 11, 16), "195967001"));
    let on_end = adult(2).with_clinical_event(ClinicalEvent::new(date(2021, 12, 16), "195967001"));
    let before = adult(3).with_clinical_event(ClinicalEvent::new(date(2021, 11, 15), "195967001"));
    let after = adult(4).with_clinical_event(ClinicalEvent::new(date(2021, 12, 17), "195967001"));

    let dataset = evaluate(rules, &[on_start, on_end, before, after]);
    assert_eq!(value(&dataset, 1, "asthma_recent"), &Value::Bool(true));
    assert_eq!(value(&dataset, 2, "asthma_recent"), &Value::Bool(true));
    assert_eq!(value(&dataset, 3, "asthma_recent"), &Value::Bool(false));
    assert_eq!(value(&dataset, 4, "asthma_recent"), &Value::Bool(false));
}

#[test]
fn test_null_window_bound_matches_nothing() {
    let registry = test_registry();
    let rules = build(
        RuleSet::builder()
            .variable("tested", positive_test().on_or_after(DateExpr::index()).returning_date())
            .variable(
                "asthma_before_test",
                SourceRule::clinical_events(registry.get("asthma").unwrap())
                    .on_or_before(DateExpr::var("tested")),
            )
            .variable(
                "asthma_count",
                SourceRule::clinical_events(registry.get("asthma").unwrap())
                    .on_or_before(DateExpr::var("tested"))
                    .returning_count(),
            ),
    );

    // Asthma is recorded but there is no test to anchor the window on
    let asthma = ClinicalEvent::new(date(2015, 1, 1), "195967001");
    let untested = adult(1).with_clinical_event(asthma.clone());
    let tested = adult(2)
        .with_clinical_event(asthma)
        .with_test_result(TestResult::covid_positive(date(2022, 1, 5)));

    let dataset = evaluate(rules, &[untested, tested]);
    assert_eq!(value(&dataset, 1, "tested"), &Value::Null);
    assert_eq!(value(&dataset, 1, "asthma_before_test"), &Value::Bool(false));
    assert_eq!(value(&dataset, 1, "asthma_count"), &Value::Int(0));
    assert_eq!(value(&dataset, 2, "asthma_before_test"), &Value::Bool(true));
    assert_eq!(value(&dataset, 2, "asthma_count"), &Value::Int(1));
}

#[test]
fn test_minimum_and_maximum_skip_nulls() {
    let rules = build(
        RuleSet::builder()
            .variable("a", positive_test().on_or_after(DateExpr::index()).find_first().returning_date())
            .variable("b", SourceRule::died_from_any_cause().returning_date())
            .variable("earliest", Rule::minimum_of(["a", "b"]))
            .variable("latest", Rule::maximum_of(["a", "b"])),
    );

    let tested_only = adult(1).with_test_result(TestResult::covid_positive(date(2022, 2, 1)));
    let neither = adult(2);

    let dataset = evaluate(rules, &[tested_only, neither]);
    assert_eq!(value(&dataset, 1, "earliest"), &Value::Date(date(2022, 2, 1)));
    assert_eq!(value(&dataset, 1, "latest"), &Value::Date(date(2022, 2, 1)));
    assert_eq!(value(&dataset, 2, "earliest"), &Value::Null);
    assert_eq!(value(&dataset, 2, "latest"), &Value::Null);
}

#[test]
fn test_hospital_codes_match_by_prefix() {
    let registry = test_registry();
    let covid = registry.get("covid_icd10").unwrap();
    let rules = build(
        RuleSet::builder()
            .variable(
                "covid_admission",
                SourceRule::admissions(AdmissionFilter::default().with_diagnoses(covid.clone()))
                    .returning_date(),
            )
            .variable(
                "covid_discharge",
                SourceRule::admissions(AdmissionFilter::default().with_primary_diagnoses(covid))
                    .returning(Returning::DateDischarged),
            ),
    );

    let detailed = adult(1).with_admission(
        Admission::new(date(2022, 1, 10))
            .discharged(date(2022, 1, 14))
            .with_primary_diagnosis("U07.19"),
    );
    let unrelated = adult(2).with_admission(Admission::new(date(2022, 1, 10)).with_primary_diagnosis("U08"));

    let dataset = evaluate(rules, &[detailed, unrelated]);
    assert_eq!(value(&dataset, 1, "covid_admission"), &Value::Date(date(2022, 1, 10)));
    assert_eq!(value(&dataset, 1, "covid_discharge"), &Value::Date(date(2022, 1, 14)));
    assert_eq!(value(&dataset, 2, "covid_admission"), &Value::Null);
}

#[test]
fn test_same_day_records_keep_delivery_order() {
    let registry = test_registry();
    let rules = build(RuleSet::builder().variable(
        "ethnicity",
        SourceRule::clinical_events(registry.get("ethnicity").unwrap())
            .find_last()
            .returning_category(CategorySource::Codelist),
    ));

    let same_day = adult(1)
        .with_clinical_event(ClinicalEvent::new(date(2012, 4, 4), "92491000000104"))
        .with_clinical_event(ClinicalEvent::new(date(2012, 4, 4), "976631000000101"));

    let dataset = evaluate(rules, &[same_day]);
    assert_eq!(value(&dataset, 1, "ethnicity"), &Value::from("3"));
}

#[test]
fn test_latest_numeric_value() {
    let registry = test_registry();
    let rules = build(RuleSet::builder().variable(
        "weight",
        SourceRule::clinical_events(registry.get("weight").unwrap())
            .on_or_before(DateExpr::index())
            .find_last()
            .returning(Returning::NumericValue),
    ));

    let patient = adult(1)
        .with_clinical_event(ClinicalEvent::new(date(2020, 1, 1), "27113001").with_value(71.5))
        .with_clinical_event(ClinicalEvent::new(date(2021, 6, 1), "27113001").with_value(68.0))
        .with_clinical_event(ClinicalEvent::new(date(2022, 6, 1), "27113001").with_value(90.0));

    let dataset = evaluate(rules, &[patient]);
    assert_eq!(value(&dataset, 1, "weight"), &Value::Float(68.0));
}

#[test]
fn test_imd_rounding_and_missing_rank() {
    let rules = build(
        RuleSet::builder()
            .variable("imd", Rule::imd_as_of(DateExpr::index(), None))
            .variable("imd_100", Rule::imd_as_of(DateExpr::index(), Some(100)))
            .variable("imd_1000", Rule::imd_as_of(DateExpr::index(), Some(1000))),
    );

    let no_rank = Patient::new(2).with_address(Address::new(date(2010, 1, 1), None));
    let dataset = evaluate(rules, &[adult(1), no_rank, Patient::new(3)]);

    assert_eq!(value(&dataset, 1, "imd"), &Value::Int(15_432));
    assert_eq!(value(&dataset, 1, "imd_100"), &Value::Int(15_400));
    assert_eq!(value(&dataset, 1, "imd_1000"), &Value::Int(15_000));
    for id in [2, 3] {
        assert_eq!(value(&dataset, id, "imd_100"), &Value::Int(-1));
    }
}

#[test]
fn test_demographics_as_of_index() {
    let rules = build(
        RuleSet::builder()
            .variable("age", Rule::age_as_of(DateExpr::index()))
            .variable("sex", Rule::sex())
            .variable("registered", Rule::registered_as_of(DateExpr::index()))
            .variable("stp", Rule::stp_as_of(DateExpr::index())),
    );

    let dataset = evaluate(rules, &[adult(1), Patient::new(2)]);
    assert_eq!(value(&dataset, 1, "age"), &Value::Int(51));
    assert_eq!(value(&dataset, 1, "sex"), &Value::from("F"));
    assert_eq!(value(&dataset, 1, "registered"), &Value::Bool(true));
    assert_eq!(value(&dataset, 1, "stp"), &Value::from("E54000008"));

    assert_eq!(value(&dataset, 2, "age"), &Value::Null);
    assert_eq!(value(&dataset, 2, "sex"), &Value::Null);
    assert_eq!(value(&dataset, 2, "registered"), &Value::Bool(false));
    assert_eq!(value(&dataset, 2, "stp"), &Value::Null);
}

#[test]
fn test_locals_feed_categories() {
    let rules = build(
        RuleSet::builder()
            .variable("age", Rule::age_as_of(DateExpr::index()))
            .variable(
                "imd_quintile",
                Rule::categorised_as_with(
                    Categories::new("0")
                        .category("1", Expr::all([Expr::ge("imd_rank", 1), Expr::lt("imd_rank", 6_569)]))
                        .category("3", Expr::all([Expr::ge("imd_rank", 13_138), Expr::lt("imd_rank", 19_707)]))
                        .category("5", Expr::ge("imd_rank", 26_276)),
                    vec![Variable::new("imd_rank", Rule::imd_as_of(DateExpr::index(), Some(100)))],
                ),
            )
            .variable(
                "older_adult",
                Rule::satisfying_with(
                    Expr::all([Expr::var("is_adult"), Expr::ge("age", 50)]),
                    vec![Variable::new("is_adult", Rule::satisfying(Expr::ge("age", 18)))],
                ),
            ),
    );

    let dataset = evaluate(rules, &[adult(1), Patient::new(2)]);
    assert_eq!(value(&dataset, 1, "imd_quintile"), &Value::from("3"));
    assert_eq!(value(&dataset, 1, "older_adult"), &Value::Bool(true));
    // Missing rank is -1, which no category accepts
    assert_eq!(value(&dataset, 2, "imd_quintile"), &Value::from("0"));
    assert_eq!(value(&dataset, 2, "older_adult"), &Value::Bool(false));

    let columns: Vec<_> = dataset.columns().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(columns, ["age", "imd_quintile", "older_adult"]);
}
