//! Sequential inclusion criteria with per-step counts

use std::fmt;

use crate::output::Dataset;
use crate::rules::Expr;

/// One labelled inclusion criterion
#[derive(Debug, Clone)]
pub struct FlowchartStep {
    pub label: String,
    pub criterion: Expr,
}

/// Ordered inclusion criteria. Their conjunction is the population predicate.
#[derive(Debug, Clone, Default)]
pub struct Flowchart {
    steps: Vec<FlowchartStep>,
}

impl Flowchart {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a criterion applied after all earlier ones
    #[must_use]
    pub fn step(mut self, label: impl Into<String>, criterion: Expr) -> Self {
        self.steps.push(FlowchartStep {
            label: label.into(),
            criterion,
        });
        self
    }

    #[must_use]
    pub fn steps(&self) -> &[FlowchartStep] {
        &self.steps
    }

    /// Conjunction of every step, for use as the population predicate
    #[must_use]
    pub fn population(&self) -> Expr {
        Expr::all(self.steps.iter().map(|s| s.criterion.clone()))
    }

    /// Apply the steps in order to an unfiltered dataset
    #[must_use]
    pub fn count(&self, dataset: &Dataset) -> FlowchartReport {
        let mut remaining: Vec<_> = dataset.views().collect();
        let total = remaining.len();
        let mut counts = Vec::with_capacity(self.steps.len());

        for step in &self.steps {
            let before = remaining.len();
            remaining.retain(|view| super::matches(&step.criterion, view));
            log::debug!(
                "Flowchart step '{}': {} remaining, {} excluded",
                step.label,
                remaining.len(),
                before - remaining.len()
            );
            counts.push(FlowchartCount {
                label: step.label.clone(),
                remaining: remaining.len(),
                excluded: before - remaining.len(),
            });
        }

        FlowchartReport { total, counts }
    }
}

/// Patients left after one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowchartCount {
    pub label: String,
    pub remaining: usize,
    pub excluded: usize,
}

/// Counts for every flowchart step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowchartReport {
    pub total: usize,
    pub counts: Vec<FlowchartCount>,
}

impl FlowchartReport {
    /// Patients meeting every criterion
    #[must_use]
    pub fn included(&self) -> usize {
        self.counts.last().map_or(self.total, |c| c.remaining)
    }
}

impl fmt::Display for FlowchartReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .counts
            .iter()
            .map(|c| c.label.len())
            .max()
            .unwrap_or(0)
            .max("All patients".len());
        writeln!(f, "{:<width$}  {:>10}  {:>10}", "All patients", self.total, "")?;
        for count in &self.counts {
            writeln!(
                f,
                "{:<width$}  {:>10}  {:>10}",
                count.label, count.remaining, count.excluded
            )?;
        }
        Ok(())
    }
}
