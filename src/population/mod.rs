//! Cohort membership
//!
//! The population predicate is an [`Expr`] over top-level variables, evaluated after
//! every variable for a patient is known. Flowcharts break the predicate into labelled
//! steps and count how many patients each step removes.

pub mod flowchart;
pub mod statistics;

use crate::rules::{Bindings, Expr};

pub use flowchart::{Flowchart, FlowchartCount, FlowchartReport, FlowchartStep};
pub use statistics::{PopulationStatistics, PopulationStats, VariableSummary};

/// Whether a patient's values satisfy a population predicate.
///
/// `AND` and `OR` short-circuit left to right. A comparison involving a null value
/// is false, so `NOT` over such a comparison is true.
#[must_use]
pub fn matches<B: Bindings + ?Sized>(predicate: &Expr, values: &B) -> bool {
    predicate.evaluate(values)
}
