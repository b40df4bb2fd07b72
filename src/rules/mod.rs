//! Variable definitions and their validation
//!
//! Rules are built through constructor functions into typed trees ([`Rule`], [`Expr`],
//! [`DateExpr`]) and validated as a whole by [`RuleSetBuilder::build`].

pub mod date_expr;
pub mod expr;
pub mod rule;
pub mod rule_set;
pub mod source;
pub mod value;

pub use date_expr::{DateAnchor, DateExpr, INDEX_DATE, Offset};
pub use expr::{Bindings, Expr, Operand};
pub use rule::{AddressAttribute, Categories, PracticeAttribute, Rule, Variable};
pub use rule_set::{RuleSet, RuleSetBuilder};
pub use source::{
    AdmissionFilter, CategorySource, Matching, Query, Returning, SourceRule, TestFilter,
    TestResultFilter, TherapeuticFilter, Window,
};
pub use value::{Shape, Value};
