//! Typed date arithmetic
//!
//! Window bounds and "as of" dates are [`DateExpr`] values: an anchor (the index date,
//! a literal date or another variable) followed by zero or more day/month/year offsets.
//! The legacy string form `"covid_test_positive_date - 91 days"` parses into the same
//! tree, so references are checked when the rule set is built, not per patient.

use std::fmt;
use std::str::FromStr;

use chrono::{Months, NaiveDate, TimeDelta};
use smallvec::SmallVec;

use crate::error::{CohortError, Result};

/// Name that refers to the study index date in date expressions
pub const INDEX_DATE: &str = "index_date";

/// What a date expression starts from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DateAnchor {
    /// The study index date
    Index,
    /// A literal date
    Fixed(NaiveDate),
    /// The value of another date-shaped variable
    Var(String),
}

/// A signed calendar offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Offset {
    Days(i64),
    Months(i32),
    Years(i32),
}

impl Offset {
    fn apply(self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::Days(days) => date.checked_add_signed(TimeDelta::try_days(days)?),
            Self::Months(months) => add_months(date, months),
            Self::Years(years) => add_months(date, years.checked_mul(12)?),
        }
    }
}

fn add_months(date: NaiveDate, months: i32) -> Option<NaiveDate> {
    let magnitude = Months::new(months.unsigned_abs());
    if months >= 0 {
        date.checked_add_months(magnitude)
    } else {
        date.checked_sub_months(magnitude)
    }
}

/// A date computed per patient from an anchor and offsets
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DateExpr {
    anchor: DateAnchor,
    offsets: SmallVec<[Offset; 2]>,
}

impl DateExpr {
    /// The study index date
    #[must_use]
    pub fn index() -> Self {
        Self::anchored(DateAnchor::Index)
    }

    /// A literal date
    #[must_use]
    pub fn fixed(date: NaiveDate) -> Self {
        Self::anchored(DateAnchor::Fixed(date))
    }

    /// The value of another variable
    pub fn var(name: impl Into<String>) -> Self {
        Self::anchored(DateAnchor::Var(name.into()))
    }

    /// Parse the `"<anchor> [+|-] N days|months|years ..."` string form
    ///
    /// # Errors
    /// Returns `InvalidDateExpression` for anything that does not follow that form
    pub fn parse(s: &str) -> Result<Self> {
        s.parse()
    }

    fn anchored(anchor: DateAnchor) -> Self {
        Self {
            anchor,
            offsets: SmallVec::new(),
        }
    }

    #[must_use]
    pub fn offset(mut self, offset: Offset) -> Self {
        self.offsets.push(offset);
        self
    }

    #[must_use]
    pub fn plus_days(self, days: i64) -> Self {
        self.offset(Offset::Days(days))
    }

    #[must_use]
    pub fn minus_days(self, days: i64) -> Self {
        self.offset(Offset::Days(-days))
    }

    #[must_use]
    pub fn plus_months(self, months: i32) -> Self {
        self.offset(Offset::Months(months))
    }

    #[must_use]
    pub fn minus_months(self, months: i32) -> Self {
        self.offset(Offset::Months(-months))
    }

    #[must_use]
    pub fn minus_years(self, years: i32) -> Self {
        self.offset(Offset::Years(-years))
    }

    #[must_use]
    pub const fn anchor(&self) -> &DateAnchor {
        &self.anchor
    }

    /// Variable this expression depends on, if any
    #[must_use]
    pub fn variable(&self) -> Option<&str> {
        match &self.anchor {
            DateAnchor::Var(name) => Some(name),
            DateAnchor::Index | DateAnchor::Fixed(_) => None,
        }
    }

    /// Evaluate for one patient.
    ///
    /// `lookup` returns the current value of a date variable. A null anchor, or an
    /// offset that leaves the representable range, yields `None`.
    pub fn resolve<F>(&self, index_date: NaiveDate, lookup: F) -> Option<NaiveDate>
    where
        F: FnOnce(&str) -> Option<NaiveDate>,
    {
        let base = match &self.anchor {
            DateAnchor::Index => index_date,
            DateAnchor::Fixed(date) => *date,
            DateAnchor::Var(name) => lookup(name)?,
        };
        self.offsets
            .iter()
            .try_fold(base, |date, offset| offset.apply(date))
    }
}

impl From<NaiveDate> for DateExpr {
    fn from(date: NaiveDate) -> Self {
        Self::fixed(date)
    }
}

impl FromStr for DateExpr {
    type Err = CohortError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || CohortError::InvalidDateExpression(s.to_string());
        let mut tokens = s.split_whitespace();

        let anchor = match tokens.next().ok_or_else(invalid)? {
            INDEX_DATE => DateAnchor::Index,
            token => {
                if let Ok(date) = NaiveDate::parse_from_str(token, "%Y-%m-%d") {
                    DateAnchor::Fixed(date)
                } else if is_identifier(token) {
                    DateAnchor::Var(token.to_string())
                } else {
                    return Err(invalid());
                }
            }
        };

        let mut expr = Self::anchored(anchor);
        while let Some(sign) = tokens.next() {
            let negative = match sign {
                "+" => false,
                "-" => true,
                _ => return Err(invalid()),
            };
            let amount = tokens
                .next()
                .filter(|n| n.bytes().all(|b| b.is_ascii_digit()))
                .and_then(|n| n.parse::<u32>().ok())
                .and_then(|n| i32::try_from(n).ok())
                .ok_or_else(invalid)?;
            let amount = if negative { -amount } else { amount };
            let offset = match tokens.next().ok_or_else(invalid)? {
                "day" | "days" => Offset::Days(i64::from(amount)),
                "month" | "months" => Offset::Months(amount),
                "year" | "years" => Offset::Years(amount),
                _ => return Err(invalid()),
            };
            expr = expr.offset(offset);
        }
        Ok(expr)
    }
}

fn is_identifier(token: &str) -> bool {
    let mut chars = token.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl fmt::Display for DateExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.anchor {
            DateAnchor::Index => f.write_str(INDEX_DATE)?,
            DateAnchor::Fixed(date) => write!(f, "{}", date.format("%Y-%m-%d"))?,
            DateAnchor::Var(name) => f.write_str(name)?,
        }
        for offset in &self.offsets {
            let (amount, unit) = match *offset {
                Offset::Days(n) => (n, "days"),
                Offset::Months(n) => (i64::from(n), "months"),
                Offset::Years(n) => (i64::from(n), "years"),
            };
            let sign = if amount < 0 { '-' } else { '+' };
            write!(f, " {sign} {} {unit}", amount.unsigned_abs())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_offset_from_variable() {
        let expr: DateExpr = "covid_test_positive_date - 91 days".parse().unwrap();
        assert_eq!(expr, DateExpr::var("covid_test_positive_date").minus_days(91));
        assert_eq!(expr.variable(), Some("covid_test_positive_date"));
        assert_eq!(expr.to_string(), "covid_test_positive_date - 91 days");
    }

    #[test]
    fn parses_index_and_literal_anchors() {
        assert_eq!(DateExpr::parse("index_date").unwrap(), DateExpr::index());
        assert_eq!(
            DateExpr::parse("2021-02-15").unwrap(),
            DateExpr::fixed(date(2021, 2, 15))
        );
        assert_eq!(
            DateExpr::parse("start_date - 1 day").unwrap(),
            DateExpr::var("start_date").minus_days(1)
        );
    }

    #[test]
    fn rejects_malformed_strings() {
        for bad in [
            "",
            "x -",
            "x - 3",
            "x * 3 days",
            "x - 3 weeks",
            "9x",
            "x + -3 days",
            "x - +3 days",
            "x - -2147483648 days",
            "x + 2147483648 days",
        ] {
            assert!(
                matches!(DateExpr::parse(bad), Err(CohortError::InvalidDateExpression(_))),
                "{bad:?} should not parse"
            );
        }
    }

    #[test]
    fn largest_offset_keeps_its_sign() {
        let expr = DateExpr::parse("x - 2147483647 days").unwrap();
        assert_eq!(expr, DateExpr::var("x").minus_days(2_147_483_647));
    }

    #[test]
    fn resolves_month_offsets_against_calendar() {
        let expr = DateExpr::var("start").minus_months(6);
        let resolved = expr.resolve(date(2022, 1, 1), |_| Some(date(2022, 8, 31)));
        assert_eq!(resolved, Some(date(2022, 2, 28)));
    }

    #[test]
    fn null_anchor_resolves_to_none() {
        let expr = DateExpr::var("missing").plus_days(30);
        assert_eq!(expr.resolve(date(2022, 1, 1), |_| None), None);
        assert_eq!(
            DateExpr::index().minus_days(1).resolve(date(2022, 1, 1), |_| None),
            Some(date(2021, 12, 31))
        );
    }
}
