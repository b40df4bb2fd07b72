//! End-to-end definitions evaluated against hand-built patients

use chrono::NaiveDate;

use cohort_def::models::{TestResult, TherapeuticRecord};
use cohort_def::rules::Categories;
use cohort_def::studies::fragments::{covid, therapeutics};
use cohort_def::{DateExpr, Evaluator, Expr, Rule, RuleSet, Value};

use crate::utils::{adult, build, date, evaluate, test_config, value};

fn first_positive_test_rules() -> RuleSet {
    build(
        RuleSet::builder()
            .extend(covid::positive_test(&DateExpr::index(), None))
            .extend([covid::positive_prev_90_days("covid_test_positive_date")])
            .population(Expr::all([
                Expr::var("covid_test_positive"),
                !Expr::var("covid_positive_prev_90_days"),
            ])),
    )
}

#[test]
fn test_first_positive_test_defines_the_cohort() {
    let evaluator = Evaluator::new(first_positive_test_rules(), test_config());

    let first_infection = adult(1).with_test_result(TestResult::covid_positive(date(2022, 1, 5)));
    let row = evaluator.evaluate(&first_infection);
    assert!(row.included);
    assert_eq!(
        row.row.values,
        vec![
            Value::Bool(true),
            Value::Date(date(2022, 1, 5)),
            Value::Bool(false)
        ]
    );

    let reinfection = adult(2)
        .with_test_result(TestResult::covid_positive(date(2021, 11, 20)))
        .with_test_result(TestResult::covid_positive(date(2022, 1, 5)));
    let row = evaluator.evaluate(&reinfection);
    assert!(!row.included);
    assert_eq!(row.row.values[1], Value::Date(date(2022, 1, 5)));
    assert_eq!(row.row.values[2], Value::Bool(true));

    let before_campaign = adult(3).with_test_result(TestResult::covid_positive(date(2021, 12, 1)));
    let row = evaluator.evaluate(&before_campaign);
    assert!(!row.included);
    assert_eq!(row.row.values[0], Value::Bool(false));
}

#[test]
fn test_extract_keeps_only_the_population() {
    let evaluator = Evaluator::new(first_positive_test_rules(), test_config());
    let patients = vec![
        adult(1).with_test_result(TestResult::covid_positive(date(2022, 1, 5))),
        adult(2),
        adult(3).with_test_result(TestResult::covid_positive(date(2022, 3, 1))),
    ];

    let cohort = evaluator.extract(&patients).unwrap();
    let ids: Vec<u64> = cohort.rows().iter().map(|r| r.patient_id).collect();
    assert_eq!(ids, [1, 3]);
    assert_eq!(cohort.columns().len(), 3);
}

#[test]
fn test_treatment_before_the_test_counts_as_prior() {
    let tested = DateExpr::var("covid_test_positive_date");
    let rules = build(
        RuleSet::builder()
            .extend(covid::positive_test(&DateExpr::index(), None))
            .extend(therapeutics::prior_treatment(&tested.clone().minus_days(1)))
            .extend(therapeutics::treatment_dates(&DateExpr::index())),
    );

    let paxlovid = |on: NaiveDate| {
        TherapeuticRecord::new(on, "Paxlovid").with_indication(therapeutics::NON_HOSPITALISED)
    };
    let treated_after = adult(1)
        .with_test_result(TestResult::covid_positive(date(2022, 1, 5)))
        .with_therapeutic(paxlovid(date(2022, 1, 6)));
    let treated_before = adult(2)
        .with_test_result(TestResult::covid_positive(date(2022, 1, 5)))
        .with_therapeutic(paxlovid(date(2021, 12, 26)));
    let in_hospital = adult(3)
        .with_test_result(TestResult::covid_positive(date(2022, 1, 5)))
        .with_therapeutic(
            TherapeuticRecord::new(date(2021, 12, 26), "Paxlovid").with_indication("hospital_onset"),
        );

    let dataset = evaluate(rules, &[treated_after, treated_before, in_hospital]);

    assert_eq!(value(&dataset, 1, "paxlovid_covid_prev"), &Value::Bool(false));
    assert_eq!(value(&dataset, 1, "prev_treated"), &Value::Bool(false));
    assert_eq!(value(&dataset, 1, "date_treated"), &Value::Date(date(2022, 1, 6)));

    assert_eq!(value(&dataset, 2, "paxlovid_covid_prev"), &Value::Bool(true));
    assert_eq!(value(&dataset, 2, "prev_treated"), &Value::Bool(true));
    assert_eq!(value(&dataset, 2, "date_treated"), &Value::Date(date(2021, 12, 26)));

    // Only community treatments are counted
    assert_eq!(value(&dataset, 3, "prev_treated"), &Value::Bool(false));
    assert_eq!(value(&dataset, 3, "date_treated"), &Value::Null);
}

#[test]
fn test_first_matching_category_wins() {
    let rules = build(
        RuleSet::builder()
            .variable("age", Rule::age_as_of(DateExpr::index()))
            .variable(
                "age_band",
                Rule::categorised_as(
                    Categories::new("unknown")
                        .category("adult", Expr::ge("age", 18))
                        .category("over_50", Expr::ge("age", 50))
                        .category("child", Expr::lt("age", 18)),
                ),
            ),
    );

    let child = adult(2).with_date_of_birth(date(2015, 1, 1));
    let unknown = cohort_def::Patient::new(3);
    let dataset = evaluate(rules, &[adult(1), child, unknown]);

    // Aged 51, but "adult" is listed before "over_50"
    assert_eq!(value(&dataset, 1, "age_band"), &Value::from("adult"));
    assert_eq!(value(&dataset, 2, "age_band"), &Value::from("child"));
    assert_eq!(value(&dataset, 3, "age_band"), &Value::from("unknown"));
}
