//! Boolean expressions over computed variables
//!
//! [`Expr`] replaces string predicates such as `"age >= 18 AND age < 110"` with a
//! typed tree. Null handling is two-valued: a comparison involving null is false,
//! `NOT` negates that result, and [`Expr::IsNull`] tests for absence explicitly.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::rules::value::Value;

/// Read access to the variables computed so far for one patient
pub trait Bindings {
    /// Current value of a variable. Unknown names read as null.
    fn value(&self, name: &str) -> Option<&Value>;
}

/// Right-hand side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Another variable
    Var(String),
    /// A literal value
    Literal(Value),
}

impl Operand {
    pub fn var(name: impl Into<String>) -> Self {
        Self::Var(name.into())
    }

    fn resolve<'a, B: Bindings + ?Sized>(&'a self, bindings: &'a B) -> &'a Value {
        match self {
            Self::Var(name) => bindings.value(name).unwrap_or(&Value::Null),
            Self::Literal(value) => value,
        }
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Self::Literal(value)
    }
}

impl From<bool> for Operand {
    fn from(b: bool) -> Self {
        Self::Literal(Value::Bool(b))
    }
}

impl From<i64> for Operand {
    fn from(i: i64) -> Self {
        Self::Literal(Value::Int(i))
    }
}

impl From<i32> for Operand {
    fn from(i: i32) -> Self {
        Self::Literal(Value::from(i))
    }
}

impl From<f64> for Operand {
    fn from(x: f64) -> Self {
        Self::Literal(Value::Float(x))
    }
}

impl From<NaiveDate> for Operand {
    fn from(d: NaiveDate) -> Self {
        Self::Literal(Value::Date(d))
    }
}

/// String literals compare against categories
impl From<&str> for Operand {
    fn from(s: &str) -> Self {
        Self::Literal(Value::from(s))
    }
}

/// Represents a predicate over a patient's variables
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Truth value of a variable
    Var(String),

    /// Variable equals an operand
    Eq(String, Operand),

    /// Variable does not equal an operand
    NotEq(String, Operand),

    /// Variable is greater than an operand
    Gt(String, Operand),

    /// Variable is greater than or equal to an operand
    GtEq(String, Operand),

    /// Variable is less than an operand
    Lt(String, Operand),

    /// Variable is less than or equal to an operand
    LtEq(String, Operand),

    /// Variable equals one of a set of literals
    In(String, Vec<Value>),

    /// Variable is null
    IsNull(String),

    /// Variable is not null
    IsNotNull(String),

    /// Logical AND of expressions
    And(Vec<Expr>),

    /// Logical OR of expressions
    Or(Vec<Expr>),

    /// Logical NOT of an expression
    Not(Box<Expr>),

    /// Always evaluates to true
    AlwaysTrue,

    /// Always evaluates to false
    AlwaysFalse,
}

impl Expr {
    pub fn var(name: impl Into<String>) -> Self {
        Self::Var(name.into())
    }

    pub fn eq(name: impl Into<String>, operand: impl Into<Operand>) -> Self {
        Self::Eq(name.into(), operand.into())
    }

    pub fn ne(name: impl Into<String>, operand: impl Into<Operand>) -> Self {
        Self::NotEq(name.into(), operand.into())
    }

    pub fn gt(name: impl Into<String>, operand: impl Into<Operand>) -> Self {
        Self::Gt(name.into(), operand.into())
    }

    pub fn ge(name: impl Into<String>, operand: impl Into<Operand>) -> Self {
        Self::GtEq(name.into(), operand.into())
    }

    pub fn lt(name: impl Into<String>, operand: impl Into<Operand>) -> Self {
        Self::Lt(name.into(), operand.into())
    }

    pub fn le(name: impl Into<String>, operand: impl Into<Operand>) -> Self {
        Self::LtEq(name.into(), operand.into())
    }

    pub fn is_in<I, V>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::In(name.into(), values.into_iter().map(Into::into).collect())
    }

    pub fn is_missing(name: impl Into<String>) -> Self {
        Self::IsNull(name.into())
    }

    pub fn is_present(name: impl Into<String>) -> Self {
        Self::IsNotNull(name.into())
    }

    /// Conjunction of `exprs`; empty is true
    pub fn all(exprs: impl IntoIterator<Item = Self>) -> Self {
        Self::And(exprs.into_iter().collect())
    }

    /// Disjunction of `exprs`; empty is false
    pub fn any(exprs: impl IntoIterator<Item = Self>) -> Self {
        Self::Or(exprs.into_iter().collect())
    }

    /// Disjunction of the truth values of `names`
    pub fn any_of<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::any(names.into_iter().map(Self::var))
    }

    /// Evaluate against one patient's variables, short-circuiting left to right
    pub fn evaluate<B: Bindings + ?Sized>(&self, bindings: &B) -> bool {
        let lookup = |name: &str| bindings.value(name).unwrap_or(&Value::Null);
        match self {
            Self::Var(name) => lookup(name).is_truthy(),
            Self::Eq(name, rhs) => {
                compare(lookup(name), rhs.resolve(bindings)) == Some(Ordering::Equal)
            }
            Self::NotEq(name, rhs) => compare(lookup(name), rhs.resolve(bindings))
                .is_some_and(|ord| ord != Ordering::Equal),
            Self::Gt(name, rhs) => {
                compare(lookup(name), rhs.resolve(bindings)) == Some(Ordering::Greater)
            }
            Self::GtEq(name, rhs) => compare(lookup(name), rhs.resolve(bindings))
                .is_some_and(|ord| ord != Ordering::Less),
            Self::Lt(name, rhs) => {
                compare(lookup(name), rhs.resolve(bindings)) == Some(Ordering::Less)
            }
            Self::LtEq(name, rhs) => compare(lookup(name), rhs.resolve(bindings))
                .is_some_and(|ord| ord != Ordering::Greater),
            Self::In(name, values) => {
                let value = lookup(name);
                values
                    .iter()
                    .any(|candidate| compare(value, candidate) == Some(Ordering::Equal))
            }
            Self::IsNull(name) => lookup(name).is_null(),
            Self::IsNotNull(name) => !lookup(name).is_null(),
            Self::And(exprs) => exprs.iter().all(|e| e.evaluate(bindings)),
            Self::Or(exprs) => exprs.iter().any(|e| e.evaluate(bindings)),
            Self::Not(expr) => !expr.evaluate(bindings),
            Self::AlwaysTrue => true,
            Self::AlwaysFalse => false,
        }
    }

    /// Names of all variables this expression reads, in sorted order
    #[must_use]
    pub fn required_variables(&self) -> BTreeSet<&str> {
        let mut names = BTreeSet::new();
        self.collect_required_variables(&mut names);
        names
    }

    fn collect_required_variables<'a>(&'a self, names: &mut BTreeSet<&'a str>) {
        match self {
            Self::Var(name) | Self::In(name, _) | Self::IsNull(name) | Self::IsNotNull(name) => {
                names.insert(name);
            }
            Self::Eq(name, rhs)
            | Self::NotEq(name, rhs)
            | Self::Gt(name, rhs)
            | Self::GtEq(name, rhs)
            | Self::Lt(name, rhs)
            | Self::LtEq(name, rhs) => {
                names.insert(name);
                if let Operand::Var(other) = rhs {
                    names.insert(other);
                }
            }
            Self::And(exprs) | Self::Or(exprs) => {
                for expr in exprs {
                    expr.collect_required_variables(names);
                }
            }
            Self::Not(expr) => expr.collect_required_variables(names),
            Self::AlwaysTrue | Self::AlwaysFalse => {}
        }
    }

    /// Every comparison in the tree as `(variable, operand)`, for shape checking
    #[must_use]
    pub fn comparisons(&self) -> Vec<(&str, &Operand)> {
        let mut out = Vec::new();
        self.collect_comparisons(&mut out);
        out
    }

    fn collect_comparisons<'a>(&'a self, out: &mut Vec<(&'a str, &'a Operand)>) {
        match self {
            Self::Eq(name, rhs)
            | Self::NotEq(name, rhs)
            | Self::Gt(name, rhs)
            | Self::GtEq(name, rhs)
            | Self::Lt(name, rhs)
            | Self::LtEq(name, rhs) => out.push((name, rhs)),
            Self::And(exprs) | Self::Or(exprs) => {
                for expr in exprs {
                    expr.collect_comparisons(out);
                }
            }
            Self::Not(expr) => expr.collect_comparisons(out),
            Self::Var(_)
            | Self::In(..)
            | Self::IsNull(_)
            | Self::IsNotNull(_)
            | Self::AlwaysTrue
            | Self::AlwaysFalse => {}
        }
    }

    /// Every membership test in the tree as `(variable, candidate values)`
    #[must_use]
    pub fn memberships(&self) -> Vec<(&str, &[Value])> {
        let mut out = Vec::new();
        self.collect_memberships(&mut out);
        out
    }

    fn collect_memberships<'a>(&'a self, out: &mut Vec<(&'a str, &'a [Value])>) {
        match self {
            Self::In(name, values) => out.push((name, values)),
            Self::And(exprs) | Self::Or(exprs) => {
                for expr in exprs {
                    expr.collect_memberships(out);
                }
            }
            Self::Not(expr) => expr.collect_memberships(out),
            _ => {}
        }
    }
}

impl std::ops::Not for Expr {
    type Output = Self;

    fn not(self) -> Self {
        Self::Not(Box::new(self))
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    left.compare(right)
}
