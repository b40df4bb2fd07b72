//! Shared rule fragments
//!
//! Both study definitions are assembled from these builders. Each fragment takes the
//! name of the variable that anchors its windows (the treatment study anchors on
//! `start_date`, the flowchart on `covid_test_positive_date`) and returns the
//! variables it declares, in declaration order.

pub mod clinical;
pub mod covid;
pub mod demographics;
pub mod high_risk;
pub mod therapeutics;

use crate::rules::{DateExpr, Rule, Variable};

/// Hospital admission methods counted as emergencies
pub const EMERGENCY_ADMISSION_METHODS: [&str; 10] =
    ["21", "22", "23", "24", "25", "2A", "2B", "2C", "2D", "28"];

/// Patient classification of ordinary admissions (no day cases or regular attenders)
pub const ORDINARY_ADMISSION: &str = "1";

/// How condition evidence is returned by the high-risk fragments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Evidence {
    /// Date of the latest record; groups take the earliest of their sources
    #[default]
    Dates,
    /// Presence of any record; groups are the disjunction of their sources
    Flags,
}

pub(crate) fn var(name: &str, rule: impl Into<Rule>) -> Variable {
    Variable::new(name, rule)
}

pub(crate) fn anchor(name: &str) -> DateExpr {
    DateExpr::var(name)
}
