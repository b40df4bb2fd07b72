//! Community treatment study
//!
//! Adults with a first positive SARS-CoV-2 test on or after the start of the treatment
//! campaign, excluding recent reinfections and recent COVID-19 admissions. Windows are
//! anchored on `start_date`, the date of that positive test.

use crate::codelist::CodelistRegistry;
use crate::config::StudyConfig;
use crate::error::Result;
use crate::population::Flowchart;
use crate::rules::{DateExpr, Expr, Rule, RuleSet, Variable};

use super::Study;
use super::fragments::{Evidence, clinical, covid, demographics, high_risk, therapeutics};

pub const NAME: &str = "treatment";

/// Inclusion criteria, in the order they are reported
#[must_use]
pub fn flowchart() -> Flowchart {
    Flowchart::new()
        .step("Positive SARS-CoV-2 test", Expr::var("covid_test_positive"))
        .step("Registered when tested", Expr::var("registered_eligible"))
        .step(
            "Aged 18 to 109",
            Expr::all([Expr::ge("age", 18), Expr::lt("age", 110)]),
        )
        .step("Alive at index", !Expr::var("has_died"))
        .step("Known deprivation", !Expr::eq("imd", "0"))
        .step(
            "No positive test in prior 90 days",
            !Expr::var("covid_positive_prev_90_days"),
        )
        .step(
            "No COVID-19 admission in prior 90 days",
            !Expr::var("any_covid_hosp_prev_90_days"),
        )
}

/// Every variable of the treatment study in declaration order
///
/// # Errors
/// Returns `UnknownCodelist` when the registry lacks a codelist the study uses
pub fn variables(registry: &CodelistRegistry) -> Result<Vec<Variable>> {
    let index = DateExpr::index();
    let start = DateExpr::var("start_date");

    let mut vars = therapeutics::treatment_dates(&index);
    vars.extend(covid::positive_test(&index, None));
    vars.extend(covid::test_details(registry, &index)?);
    vars.push(covid::positive_prev_90_days("covid_test_positive_date"));
    vars.push(Variable::new(
        "start_date",
        Rule::minimum_of(["covid_test_positive_date"]),
    ));
    vars.push(covid::hospitalised_prev_90_days(registry, "start_date", true)?);
    vars.push(covid::hospitalised_prev_90_days(registry, "start_date", false)?);

    vars.extend(clinical::pregnancy_and_weight(registry)?);

    vars.extend(demographics::death(&start, &index.clone().minus_days(1)));
    vars.push(demographics::deregistration(&start));
    vars.push(demographics::registered(
        "registered_eligible",
        DateExpr::var("covid_test_positive_date"),
    ));
    vars.push(demographics::registered(
        "registered_treated",
        DateExpr::var("date_treated"),
    ));

    vars.push(therapeutics::high_risk_cohort(&index));
    vars.extend(
        high_risk::HighRiskConditions::new(registry, "start_date", Evidence::Dates).variables()?,
    );

    vars.push(demographics::age(start.clone().minus_days(1)));
    vars.push(demographics::sex());
    vars.push(demographics::ethnicity(registry, &start)?);
    vars.push(demographics::imd_quintile(start.clone()));
    vars.extend(demographics::geography(&start));
    vars.push(therapeutics::treatment_region(&start));

    vars.extend(clinical::clinical_groups(registry)?);
    vars.extend(clinical::shielding(registry)?);
    vars.push(clinical::vaccination_status(registry)?);

    vars.extend(covid::outcomes(registry)?);
    Ok(vars)
}

/// Validated rule set with the flowchart conjunction as population
///
/// # Errors
/// Unknown codelists and any rule-set validation failure
pub fn rules(registry: &CodelistRegistry) -> Result<RuleSet> {
    RuleSet::builder()
        .extend(variables(registry)?)
        .population(flowchart().population())
        .build()
}

/// The treatment study at its campaign dates
///
/// # Errors
/// See [`rules`]
pub fn study(registry: &CodelistRegistry, config: StudyConfig) -> Result<Study> {
    Ok(Study {
        name: NAME.to_string(),
        rules: rules(registry)?,
        config,
        flowchart: flowchart(),
    })
}
