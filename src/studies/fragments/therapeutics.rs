//! Community COVID-19 treatments
//!
//! Treatments come from the therapeutics dataset. Only records with a
//! non-hospitalised indication are counted.

use crate::rules::{CategorySource, DateExpr, Expr, Rule, SourceRule, TherapeuticFilter, Variable};

use super::var;

/// Indication of treatments given in the community
pub const NON_HOSPITALISED: &str = "non_hospitalised";

/// Variable prefix and dataset name of each treatment
pub const THERAPEUTICS: [(&str, &str); 5] = [
    ("paxlovid", "Paxlovid"),
    ("sotrovimab", "Sotrovimab"),
    ("remdesivir", "Remdesivir"),
    ("molnupiravir", "Molnupiravir"),
    ("casirivimab", "Casirivimab and imdevimab"),
];

fn community(names: impl IntoIterator<Item = &'static str>) -> SourceRule {
    SourceRule::therapeutics(
        TherapeuticFilter::therapeutics(names).with_indication(NON_HOSPITALISED),
    )
}

fn all_therapeutics() -> impl Iterator<Item = &'static str> {
    THERAPEUTICS.iter().map(|(_, name)| *name)
}

/// First treatment date per drug from `from`, and the earliest of them as `date_treated`
#[must_use]
pub fn treatment_dates(from: &DateExpr) -> Vec<Variable> {
    let mut vars: Vec<Variable> = THERAPEUTICS
        .iter()
        .map(|(prefix, name)| {
            var(
                &format!("{prefix}_covid_therapeutics"),
                community([*name])
                    .on_or_after(from.clone())
                    .find_first()
                    .returning_date(),
            )
        })
        .collect();

    vars.push(var(
        "date_treated",
        Rule::minimum_of(THERAPEUTICS.iter().map(|(prefix, _)| format!("{prefix}_covid_therapeutics"))),
    ));
    vars
}

/// Whether each drug was given on or before `until`, and whether any was (`prev_treated`)
#[must_use]
pub fn prior_treatment(until: &DateExpr) -> Vec<Variable> {
    let names: Vec<String> = THERAPEUTICS
        .iter()
        .map(|(prefix, _)| format!("{prefix}_covid_prev"))
        .collect();

    let mut vars: Vec<Variable> = THERAPEUTICS
        .iter()
        .zip(&names)
        .map(|((_, drug), name)| var(name, community([*drug]).on_or_before(until.clone())))
        .collect();
    vars.push(var("prev_treated", Rule::satisfying(Expr::any_of(names))));
    vars
}

/// Risk cohort recorded with the first community treatment on or after `from`
#[must_use]
pub fn high_risk_cohort(from: &DateExpr) -> Variable {
    var(
        "high_risk_cohort_covid_therapeutics",
        community(all_therapeutics())
            .on_or_after(from.clone())
            .find_first()
            .returning_category(CategorySource::RiskGroup),
    )
}

/// Region recorded with the first community treatment of any kind on or after `from`
#[must_use]
pub fn treatment_region(from: &DateExpr) -> Variable {
    var(
        "region_covid_therapeutics",
        community([])
            .on_or_after(from.clone())
            .find_first()
            .returning_category(CategorySource::Region),
    )
}
