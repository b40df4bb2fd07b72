//! Demographic, registration and censoring variables

use crate::codelist::CodelistRegistry;
use crate::error::Result;
use crate::rules::{Categories, CategorySource, DateExpr, Expr, Rule, SourceRule, Variable};

use super::var;

/// IMD rank boundaries of the five quintiles (ranks rounded to the nearest 100)
pub const IMD_QUINTILE_BOUNDS: [f64; 4] = [6568.8, 13137.6, 19706.4, 26275.2];

#[must_use]
pub fn age(date: DateExpr) -> Variable {
    var("age", Rule::age_as_of(date))
}

#[must_use]
pub fn sex() -> Variable {
    var("sex", Rule::sex())
}

/// `death_date` from `from` onwards and `has_died` on or before `until`
#[must_use]
pub fn death(from: &DateExpr, until: &DateExpr) -> Vec<Variable> {
    vec![
        var(
            "death_date",
            SourceRule::died_from_any_cause()
                .on_or_after(from.clone())
                .returning_date(),
        ),
        has_died(until),
    ]
}

#[must_use]
pub fn has_died(until: &DateExpr) -> Variable {
    var(
        "has_died",
        SourceRule::died_from_any_cause().on_or_before(until.clone()),
    )
}

#[must_use]
pub fn deregistration(from: &DateExpr) -> Variable {
    var(
        "dereg_date",
        SourceRule::deregistration()
            .on_or_after(from.clone())
            .returning_date(),
    )
}

#[must_use]
pub fn registered(name: &str, date: DateExpr) -> Variable {
    var(name, Rule::registered_as_of(date))
}

/// First PRIMIS ethnicity group recorded on or before `until`
pub fn ethnicity(registry: &CodelistRegistry, until: &DateExpr) -> Result<Variable> {
    Ok(var(
        "ethnicity_primis",
        SourceRule::clinical_events(registry.get("ethnicity_primis_snomed")?)
            .on_or_before(until.clone())
            .find_first()
            .returning_category(CategorySource::Codelist),
    ))
}

/// IMD rank rounded to the nearest 100; -1 when the address or rank is unknown
#[must_use]
pub fn imd_rank(name: &str, date: DateExpr) -> Variable {
    var(name, Rule::imd_as_of(date, Some(100)))
}

/// IMD quintile, "1" most deprived to "5" least deprived, "0" when unknown
#[must_use]
pub fn imd_quintile(date: DateExpr) -> Variable {
    let rank = "index_of_multiple_deprivation";
    let [q1, q2, q3, q4] = IMD_QUINTILE_BOUNDS;
    let categories = Categories::new("0")
        .category("1", Expr::all([Expr::ge(rank, 1), Expr::lt(rank, q1)]))
        .category("2", Expr::all([Expr::ge(rank, q1), Expr::lt(rank, q2)]))
        .category("3", Expr::all([Expr::ge(rank, q2), Expr::lt(rank, q3)]))
        .category("4", Expr::all([Expr::ge(rank, q3), Expr::lt(rank, q4)]))
        .category("5", Expr::ge(rank, q4));
    var(
        "imd",
        Rule::categorised_as_with(categories, vec![imd_rank(rank, date)]),
    )
}

/// Practice region, STP and area classification on `date`
#[must_use]
pub fn geography(date: &DateExpr) -> Vec<Variable> {
    vec![
        var("region_nhs", Rule::region_as_of(date.clone())),
        var("stp", Rule::stp_as_of(date.clone())),
        var("rural_urban", Rule::rural_urban_as_of(date.clone())),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imd_quintile_carries_rank_local() {
        let imd = imd_quintile(DateExpr::var("start_date"));
        let locals = imd.rule.locals();
        assert_eq!(locals.len(), 1);
        assert_eq!(locals[0].name, "index_of_multiple_deprivation");
        let Rule::CategorisedAs { categories, .. } = &imd.rule else {
            panic!("expected categories");
        };
        assert_eq!(categories.default_label(), "0");
        let labels: Vec<_> = categories.conditions().map(|(label, _)| label).collect();
        assert_eq!(labels, ["1", "2", "3", "4", "5"]);
    }
}
