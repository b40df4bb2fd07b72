//! Demographic lookups and rules derived from other variables

use std::cmp::Ordering;

use crate::evaluate::scope::Scope;
use crate::evaluate::source::Outcome;
use crate::models::Patient;
use crate::rules::{
    AddressAttribute, Categories, DateExpr, Expr, PracticeAttribute, Shape, Value,
};

/// Recorded sex as its single-letter category
#[must_use]
pub fn sex(patient: &Patient) -> Value {
    patient.sex.map(|s| s.code()).into()
}

/// Age in completed years, null without a birth date or an evaluable date
#[must_use]
pub fn age_as_of(patient: &Patient, date: &DateExpr, scope: &Scope<'_>) -> Value {
    scope
        .resolve(date)
        .and_then(|on| patient.age_on(on))
        .into()
}

#[must_use]
pub fn registered_as_of(patient: &Patient, date: &DateExpr, scope: &Scope<'_>) -> Value {
    Value::Bool(scope.resolve(date).is_some_and(|on| patient.is_registered_on(on)))
}

#[must_use]
pub fn practice_as_of(
    patient: &Patient,
    date: &DateExpr,
    attribute: PracticeAttribute,
    scope: &Scope<'_>,
) -> Value {
    let Some(registration) = scope.resolve(date).and_then(|on| patient.registration_on(on)) else {
        return Value::Null;
    };
    let field = match attribute {
        PracticeAttribute::StpCode => registration.stp_code.as_deref(),
        PracticeAttribute::Region => registration.region.as_deref(),
    };
    field.filter(|s| !s.is_empty()).into()
}

/// Area attributes of the address in force.
///
/// An unknown IMD rank is reported as -1 so that it sorts below every real rank.
#[must_use]
pub fn address_as_of(
    patient: &Patient,
    date: &DateExpr,
    attribute: AddressAttribute,
    scope: &Scope<'_>,
) -> Value {
    let address = scope.resolve(date).and_then(|on| patient.address_on(on));
    match attribute {
        AddressAttribute::ImdRank { round_to_nearest } => {
            let rank = address.and_then(|a| a.imd_rank).map(i64::from);
            Value::Int(match (rank, round_to_nearest) {
                (None, _) => -1,
                (Some(rank), Some(n)) if n > 0 => round_rank(rank, i64::from(n)),
                (Some(rank), _) => rank,
            })
        }
        AddressAttribute::RuralUrban => address
            .and_then(|a| a.rural_urban)
            .map(i64::from)
            .into(),
    }
}

fn round_rank(rank: i64, nearest: i64) -> i64 {
    ((rank + nearest / 2) / nearest) * nearest
}

/// Smallest or largest non-null operand; null when every operand is null.
///
/// Integer operands are widened when the result is float-shaped.
#[must_use]
pub fn extreme_of(names: &[String], want: Ordering, shape: Shape, scope: &Scope<'_>) -> Value {
    let mut best: Option<&Value> = None;
    for name in names {
        let value = scope.get(name);
        if value.is_null() {
            continue;
        }
        match best {
            Some(current) if value.compare(current) != Some(want) => {}
            _ => best = Some(value),
        }
    }
    match (best, shape) {
        (Some(value @ Value::Int(_)), Shape::Float) => {
            value.as_f64().map_or(Value::Null, Value::Float)
        }
        (Some(value), _) => value.clone(),
        (None, _) => Value::Null,
    }
}

#[must_use]
pub fn satisfying(expr: &Expr, scope: &Scope<'_>) -> Value {
    Value::Bool(expr.evaluate(scope))
}

/// Label of the first category whose condition holds, else the default label
#[must_use]
pub fn categorised_as(categories: &Categories, scope: &Scope<'_>) -> Value {
    let label = categories
        .conditions()
        .find(|(_, condition)| condition.evaluate(scope))
        .map_or(categories.default_label(), |(label, _)| label);
    Value::from(label)
}

/// Date of the record the named source rule selected
#[must_use]
pub fn date_of(name: &str, scope: &Scope<'_>) -> Outcome {
    let matched = scope.matched_date(name);
    Outcome {
        value: matched.into(),
        matched,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::models::{Address, Registration, Sex};
    use crate::rules::{Rule, RuleSet};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn rules() -> RuleSet {
        RuleSet::builder()
            .variable("a", Rule::sex())
            .variable("b", Rule::sex())
            .variable("c", Rule::sex())
            .build()
            .unwrap()
    }

    #[test]
    fn imd_rounds_to_nearest() {
        assert_eq!(round_rank(32844, 100), 32800);
        assert_eq!(round_rank(150, 100), 200);
        assert_eq!(round_rank(149, 100), 100);
    }

    #[test]
    fn imd_unknown_is_minus_one() {
        let rules = rules();
        let scope = Scope::new(&rules, date(2022, 1, 1));
        let attr = AddressAttribute::ImdRank { round_to_nearest: Some(100) };
        let homeless = Patient::new(1);
        assert_eq!(address_as_of(&homeless, &DateExpr::index(), attr, &scope), Value::Int(-1));

        let housed = Patient::new(2).with_address(Address::new(date(2000, 1, 1), None).with_imd_rank(1234));
        assert_eq!(address_as_of(&housed, &DateExpr::index(), attr, &scope), Value::Int(1200));
    }

    #[test]
    fn practice_attributes_follow_registration() {
        let rules = rules();
        let scope = Scope::new(&rules, date(2022, 1, 1));
        let patient = Patient::new(1)
            .with_sex(Sex::Female)
            .with_registration(Registration::new(date(2015, 1, 1), None).with_stp("E54000005"));
        assert_eq!(
            practice_as_of(&patient, &DateExpr::index(), PracticeAttribute::StpCode, &scope),
            Value::from("E54000005")
        );
        assert_eq!(
            practice_as_of(&patient, &DateExpr::index(), PracticeAttribute::Region, &scope),
            Value::Null
        );
        assert_eq!(sex(&patient), Value::from("F"));
        assert_eq!(
            registered_as_of(&patient, &DateExpr::fixed(date(2014, 12, 31)), &scope),
            Value::Bool(false)
        );
    }

    #[test]
    fn minimum_skips_nulls() {
        let rules = rules();
        let mut scope = Scope::new(&rules, date(2022, 1, 1));
        let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(extreme_of(&names, Ordering::Less, Shape::Date, &scope), Value::Null);

        scope.set("b", Value::Date(date(2022, 3, 1)), None);
        scope.set("c", Value::Date(date(2022, 2, 1)), None);
        assert_eq!(
            extreme_of(&names, Ordering::Less, Shape::Date, &scope),
            Value::Date(date(2022, 2, 1))
        );
        assert_eq!(
            extreme_of(&names, Ordering::Greater, Shape::Date, &scope),
            Value::Date(date(2022, 3, 1))
        );
    }

    #[test]
    fn mixed_numbers_widen_to_float() {
        let rules = rules();
        let mut scope = Scope::new(&rules, date(2022, 1, 1));
        scope.set("a", Value::Int(3), None);
        scope.set("b", Value::Float(2.5), None);
        let names = vec!["a".to_string(), "b".to_string()];
        assert_eq!(extreme_of(&names, Ordering::Greater, Shape::Float, &scope), Value::Float(3.0));
    }
}
