//! Eligibility flowchart for the Omicron BA.2 period
//!
//! Patients testing positive within the study period are followed through the
//! eligibility criteria for community treatment. Windows are anchored on the date of
//! that positive test; condition evidence is returned as flags.

use chrono::NaiveDate;

use crate::codelist::CodelistRegistry;
use crate::config::StudyConfig;
use crate::error::Result;
use crate::population::Flowchart;
use crate::rules::{DateExpr, Expr, Rule, RuleSet, Variable};

use super::Study;
use super::fragments::{Evidence, covid, demographics, high_risk, therapeutics};

pub const NAME: &str = "flowchart_ba2";

const TESTED: &str = "covid_test_positive_date";

#[must_use]
pub fn flowchart() -> Flowchart {
    Flowchart::new()
        .step("Positive SARS-CoV-2 test in period", Expr::var("covid_test_positive"))
        .step("Registered when tested", Expr::var("registered_eligible"))
        .step(
            "Aged 18 to 109",
            Expr::all([Expr::ge("age", 18), Expr::lt("age", 110)]),
        )
        .step("Alive when tested", !Expr::var("has_died"))
        .step("Sex recorded", Expr::is_in("sex", ["M", "F"]))
        .step("Practice STP known", Expr::is_present("stp"))
        .step("Deprivation known", Expr::ne("imd", -1))
        .step("In a high-risk group", Expr::var("high_risk_group"))
}

/// Every variable of the flowchart study in declaration order
///
/// # Errors
/// Returns `UnknownCodelist` when the registry lacks a codelist the study uses
pub fn variables(registry: &CodelistRegistry, end_date: NaiveDate) -> Result<Vec<Variable>> {
    let tested = DateExpr::var(TESTED);
    let day_before_test = tested.clone().minus_days(1);

    let mut vars = covid::positive_test(&DateExpr::index(), Some(&DateExpr::fixed(end_date)));

    vars.push(demographics::age(tested.clone()));
    vars.push(demographics::has_died(&day_before_test));
    vars.push(demographics::sex());
    vars.push(Variable::new("stp", Rule::stp_as_of(tested.clone())));
    vars.push(demographics::imd_rank("imd", tested.clone()));
    vars.push(demographics::registered("registered_eligible", tested.clone()));

    vars.extend(therapeutics::prior_treatment(&day_before_test));
    vars.push(covid::positive_prev_90_days(TESTED));
    vars.push(covid::hospitalised_prev_90_days(registry, TESTED, false)?);
    vars.push(covid::in_hospital_when_tested());
    vars.push(therapeutics::high_risk_cohort(&tested));

    vars.extend(high_risk::HighRiskConditions::new(registry, TESTED, Evidence::Flags).variables()?);
    vars.push(high_risk::high_risk_group());
    Ok(vars)
}

/// Validated rule set with the flowchart conjunction as population
///
/// # Errors
/// Unknown codelists and any rule-set validation failure
pub fn rules(registry: &CodelistRegistry, config: &StudyConfig) -> Result<RuleSet> {
    RuleSet::builder()
        .extend(variables(registry, config.end_date)?)
        .population(flowchart().population())
        .build()
}

/// The flowchart study over the period in `config`
///
/// # Errors
/// See [`rules`]
pub fn study(registry: &CodelistRegistry, config: StudyConfig) -> Result<Study> {
    Ok(Study {
        name: NAME.to_string(),
        rules: rules(registry, &config)?,
        config,
        flowchart: flowchart(),
    })
}
