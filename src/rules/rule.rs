//! Variable definitions
//!
//! A [`Variable`] names a [`Rule`]. Rules are either source rules over a record
//! stream, demographic lookups, or derived rules that combine other variables.
//! Derived rules may carry nested local variables that are visible only inside them.

use crate::rules::date_expr::DateExpr;
use crate::rules::expr::Expr;
use crate::rules::source::SourceRule;
use crate::rules::value::Shape;

/// Practice attributes available from the registration in force
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PracticeAttribute {
    StpCode,
    Region,
}

/// Area attributes available from the address in force
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressAttribute {
    /// Index of multiple deprivation rank, optionally rounded; -1 when unknown
    ImdRank { round_to_nearest: Option<u32> },
    /// Rural/urban classification
    RuralUrban,
}

/// Ordered category conditions with a fallback label
#[derive(Debug, Clone, PartialEq)]
pub struct Categories {
    default: String,
    conditions: Vec<(String, Expr)>,
}

impl Categories {
    /// Start with the label used when no condition holds
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            default: default.into(),
            conditions: Vec::new(),
        }
    }

    /// Append a category; earlier categories win when several hold
    #[must_use]
    pub fn category(mut self, label: impl Into<String>, condition: Expr) -> Self {
        self.conditions.push((label.into(), condition));
        self
    }

    #[must_use]
    pub fn default_label(&self) -> &str {
        &self.default
    }

    /// Conditions in declaration order
    pub fn conditions(&self) -> impl Iterator<Item = (&str, &Expr)> {
        self.conditions.iter().map(|(label, expr)| (label.as_str(), expr))
    }
}

/// How a variable is computed
#[derive(Debug, Clone)]
pub enum Rule {
    /// Computed from a record stream
    Source(SourceRule),
    /// Recorded sex as a category
    Sex,
    /// Age in completed years on a date
    AgeAsOf(DateExpr),
    /// Whether a practice registration covers a date
    RegisteredAsOf(DateExpr),
    /// Attribute of the practice registered with on a date
    PracticeAsOf {
        date: DateExpr,
        attribute: PracticeAttribute,
    },
    /// Attribute of the address lived at on a date
    AddressAsOf {
        date: DateExpr,
        attribute: AddressAttribute,
    },
    /// Smallest non-null value among variables
    MinimumOf(Vec<String>),
    /// Largest non-null value among variables
    MaximumOf(Vec<String>),
    /// Flag from a predicate
    Satisfying { expr: Expr, locals: Vec<Variable> },
    /// First category whose condition holds
    CategorisedAs {
        categories: Categories,
        locals: Vec<Variable>,
    },
    /// Date of the record matched by a source rule
    DateOf(String),
}

impl Rule {
    #[must_use]
    pub const fn sex() -> Self {
        Self::Sex
    }

    #[must_use]
    pub const fn age_as_of(date: DateExpr) -> Self {
        Self::AgeAsOf(date)
    }

    #[must_use]
    pub const fn registered_as_of(date: DateExpr) -> Self {
        Self::RegisteredAsOf(date)
    }

    #[must_use]
    pub const fn stp_as_of(date: DateExpr) -> Self {
        Self::PracticeAsOf {
            date,
            attribute: PracticeAttribute::StpCode,
        }
    }

    #[must_use]
    pub const fn region_as_of(date: DateExpr) -> Self {
        Self::PracticeAsOf {
            date,
            attribute: PracticeAttribute::Region,
        }
    }

    #[must_use]
    pub const fn imd_as_of(date: DateExpr, round_to_nearest: Option<u32>) -> Self {
        Self::AddressAsOf {
            date,
            attribute: AddressAttribute::ImdRank { round_to_nearest },
        }
    }

    #[must_use]
    pub const fn rural_urban_as_of(date: DateExpr) -> Self {
        Self::AddressAsOf {
            date,
            attribute: AddressAttribute::RuralUrban,
        }
    }

    pub fn minimum_of<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::MinimumOf(names.into_iter().map(Into::into).collect())
    }

    pub fn maximum_of<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::MaximumOf(names.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub const fn satisfying(expr: Expr) -> Self {
        Self::Satisfying {
            expr,
            locals: Vec::new(),
        }
    }

    #[must_use]
    pub const fn satisfying_with(expr: Expr, locals: Vec<Variable>) -> Self {
        Self::Satisfying { expr, locals }
    }

    #[must_use]
    pub const fn categorised_as(categories: Categories) -> Self {
        Self::CategorisedAs {
            categories,
            locals: Vec::new(),
        }
    }

    #[must_use]
    pub const fn categorised_as_with(categories: Categories, locals: Vec<Variable>) -> Self {
        Self::CategorisedAs { categories, locals }
    }

    pub fn date_of(name: impl Into<String>) -> Self {
        Self::DateOf(name.into())
    }

    /// Nested variables scoped to this rule
    #[must_use]
    pub fn locals(&self) -> &[Variable] {
        match self {
            Self::Satisfying { locals, .. } | Self::CategorisedAs { locals, .. } => locals,
            _ => &[],
        }
    }

    /// Date expressions this rule resolves per patient
    #[must_use]
    pub fn date_exprs(&self) -> Vec<&DateExpr> {
        match self {
            Self::Source(source) => source.window.bounds().collect(),
            Self::AgeAsOf(date)
            | Self::RegisteredAsOf(date)
            | Self::PracticeAsOf { date, .. }
            | Self::AddressAsOf { date, .. } => vec![date],
            _ => Vec::new(),
        }
    }

    /// Variables this rule reads directly, excluding those read by its locals
    #[must_use]
    pub fn references(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.date_exprs().into_iter().filter_map(DateExpr::variable).collect();
        match self {
            Self::MinimumOf(operands) | Self::MaximumOf(operands) => {
                names.extend(operands.iter().map(String::as_str));
            }
            Self::Satisfying { expr, .. } => names.extend(expr.required_variables()),
            Self::CategorisedAs { categories, .. } => {
                for (_, condition) in categories.conditions() {
                    names.extend(condition.required_variables());
                }
            }
            Self::DateOf(name) => names.push(name),
            _ => {}
        }
        names
    }

    /// Shape that does not depend on other variables; `None` for `minimum_of` and
    /// `maximum_of`, whose shape follows their operands
    #[must_use]
    pub const fn intrinsic_shape(&self) -> Option<Shape> {
        match self {
            Self::Source(source) => Some(source.shape()),
            Self::Sex | Self::PracticeAsOf { .. } | Self::CategorisedAs { .. } => {
                Some(Shape::Category)
            }
            Self::AgeAsOf(_) | Self::AddressAsOf { .. } => Some(Shape::Integer),
            Self::RegisteredAsOf(_) | Self::Satisfying { .. } => Some(Shape::Flag),
            Self::DateOf(_) => Some(Shape::Date),
            Self::MinimumOf(_) | Self::MaximumOf(_) => None,
        }
    }
}

impl From<SourceRule> for Rule {
    fn from(source: SourceRule) -> Self {
        Self::Source(source)
    }
}

/// A named rule
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub rule: Rule,
}

impl Variable {
    pub fn new(name: impl Into<String>, rule: impl Into<Rule>) -> Self {
        Self {
            name: name.into(),
            rule: rule.into(),
        }
    }
}
