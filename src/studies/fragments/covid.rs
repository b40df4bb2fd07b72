//! COVID-19 testing, hospitalisation and outcome variables

use crate::codelist::CodelistRegistry;
use crate::error::Result;
use crate::rules::{
    AdmissionFilter, CategorySource, DateExpr, Expr, Operand, Returning, Rule, SourceRule,
    TestFilter, TestResultFilter, Variable,
};

use super::{EMERGENCY_ADMISSION_METHODS, ORDINARY_ADMISSION, anchor, var};

fn positive_tests() -> SourceRule {
    SourceRule::test_results(TestFilter::sars_cov_2(TestResultFilter::Positive))
}

/// Ordinary emergency admissions narrowed by `filter`
fn emergency(filter: AdmissionFilter) -> AdmissionFilter {
    filter
        .with_patient_classification([ORDINARY_ADMISSION])
        .with_admission_method(EMERGENCY_ADMISSION_METHODS)
}

/// `covid_test_positive` and `covid_test_positive_date`: the first positive test in
/// `[from, to]`, or on or after `from` when `to` is open
#[must_use]
pub fn positive_test(from: &DateExpr, to: Option<&DateExpr>) -> Vec<Variable> {
    let windowed = |rule: SourceRule| match to {
        Some(to) => rule.between(from.clone(), to.clone()),
        None => rule.on_or_after(from.clone()),
    };
    vec![
        var("covid_test_positive", windowed(positive_tests()).find_first()),
        var(
            "covid_test_positive_date",
            windowed(positive_tests()).find_first().returning_date(),
        ),
    ]
}

/// Any positive test in the 90 days before an anchor, excluding the anchor day
#[must_use]
pub fn positive_prev_90_days(anchor_name: &str) -> Variable {
    var(
        "covid_positive_prev_90_days",
        positive_tests()
            .between(
                anchor(anchor_name).minus_days(91),
                anchor(anchor_name).minus_days(1),
            )
            .find_last(),
    )
}

/// Emergency COVID-19 admission in the 90 days before an anchor.
/// `primary_only` restricts the match to the primary diagnosis.
pub fn hospitalised_prev_90_days(
    registry: &CodelistRegistry,
    anchor_name: &str,
    primary_only: bool,
) -> Result<Variable> {
    let covid = registry.get("covid_icd10")?;
    let (name, filter) = if primary_only {
        (
            "prim_covid_hosp_prev_90_days",
            AdmissionFilter::default().with_primary_diagnoses(covid),
        )
    } else {
        (
            "any_covid_hosp_prev_90_days",
            AdmissionFilter::default().with_diagnoses(covid),
        )
    };
    Ok(var(
        name,
        SourceRule::admissions(emergency(filter)).between(
            anchor(anchor_name).minus_days(91),
            anchor(anchor_name).minus_days(1),
        ),
    ))
}

/// Whether the patient was still an emergency inpatient when tested positive
#[must_use]
pub fn in_hospital_when_tested() -> Variable {
    let tested = anchor("covid_test_positive_date");
    let discharged = var(
        "discharged_date",
        SourceRule::admissions(emergency(AdmissionFilter::default()))
            .on_or_before(tested)
            .find_last()
            .returning(Returning::DateDischarged),
    );
    var(
        "in_hospital_when_tested",
        Rule::satisfying_with(
            Expr::gt(
                "discharged_date",
                Operand::var("covid_test_positive_date"),
            ),
            vec![discharged],
        ),
    )
}

/// Second positive test, symptoms and variant information for the index test
pub fn test_details(registry: &CodelistRegistry, from: &DateExpr) -> Result<Vec<Variable>> {
    let tested = anchor("covid_test_positive_date");
    let same_day = |rule: SourceRule| rule.between(tested.clone(), tested.clone()).find_first();

    Ok(vec![
        var(
            "covid_test_positive_date2",
            positive_tests()
                .on_or_after(tested.clone().plus_days(30))
                .find_first()
                .returning_date(),
        ),
        var(
            "symptomatic_covid_test",
            SourceRule::test_results(TestFilter::sars_cov_2(TestResultFilter::Any))
                .on_or_after(from.clone())
                .find_first()
                .returning_category(CategorySource::Symptomatic),
        ),
        var(
            "covid_symptoms_snomed",
            SourceRule::clinical_events(registry.get("covid_symptoms_snomed")?)
                .on_or_after(from.clone())
                .find_first()
                .returning_date(),
        ),
        var(
            "sgtf",
            same_day(positive_tests()).returning_category(CategorySource::SGeneTargetFailure),
        ),
        var(
            "variant",
            same_day(positive_tests()).returning_category(CategorySource::Variant),
        ),
    ])
}

/// Outcomes in the 90 days after `start_date`
pub fn outcomes(registry: &CodelistRegistry) -> Result<Vec<Variable>> {
    let start = anchor("start_date");
    let covid = registry.get("covid_icd10")?;
    let outcome_date = anchor("covid_hospitalisation_outcome_date");
    let death_date = anchor("death_date");

    let prior_positive = var(
        "positive_covid_test_prior_28_days",
        positive_tests().between(death_date.clone().minus_days(28), death_date),
    );

    Ok(vec![
        var(
            "covid_positive_test_30_days_post_elig_or_treat",
            positive_tests()
                .between(start.clone().plus_days(30), start.clone().plus_days(90))
                .find_first()
                .returning_date(),
        ),
        var(
            "covid_hospitalisation_outcome_date",
            SourceRule::admissions(emergency(
                AdmissionFilter::default().with_primary_diagnoses(covid.clone()),
            ))
            .between(start.clone().plus_days(1), start.clone().plus_days(90))
            .find_first()
            .returning_date(),
        ),
        var(
            "covid_hospitalisation_critical_care",
            SourceRule::admissions(AdmissionFilter::default().with_diagnoses(covid.clone()))
                .between(outcome_date.clone(), outcome_date.plus_days(90))
                .find_first()
                .returning(Returning::DaysInCriticalCare),
        ),
        var(
            "death_with_covid_on_the_death_certificate_date",
            SourceRule::death_certificate(covid)
                .between(start.clone().plus_days(1), start.plus_days(90))
                .returning_date(),
        ),
        var(
            "death_with_28_days_of_covid_positive_test",
            Rule::satisfying_with(
                Expr::all([Expr::var("death_date"), Expr::var("positive_covid_test_prior_28_days")]),
                vec![prior_positive],
            ),
        ),
    ])
}
