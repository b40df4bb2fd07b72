//! Summary statistics over an extracted dataset

use std::fmt::Write as _;

use crate::output::Dataset;
use crate::rules::{Shape, Value};

/// Functions for dataset statistics and summaries
pub struct PopulationStatistics;

impl PopulationStatistics {
    /// Per-variable counts over every row
    #[must_use]
    pub fn calculate(dataset: &Dataset) -> PopulationStats {
        let variables = dataset
            .columns()
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                let mut summary = VariableSummary {
                    name: column.name.clone(),
                    shape: column.shape,
                    missing: 0,
                    truthy: 0,
                };
                for row in dataset.rows() {
                    let value = row.values.get(idx).unwrap_or(&Value::Null);
                    if value.is_null() {
                        summary.missing += 1;
                    } else if value.is_truthy() {
                        summary.truthy += 1;
                    }
                }
                summary
            })
            .collect();

        PopulationStats {
            patient_count: dataset.len(),
            variables,
        }
    }

    /// Human-readable summary of the dataset
    #[must_use]
    pub fn generate_summary(stats: &PopulationStats) -> String {
        let mut summary = String::new();
        let _ = writeln!(summary, "Study Population Summary:");
        let _ = writeln!(summary, "  Patients: {}", stats.patient_count);
        let _ = writeln!(summary, "  Variables: {}", stats.variables.len());

        let flags: Vec<_> = stats.variables.iter().filter(|v| v.shape == Shape::Flag).collect();
        if !flags.is_empty() {
            let _ = writeln!(summary, "\nFlags (true):");
            for flag in flags {
                let _ = writeln!(
                    summary,
                    "  {}: {} ({:.1}%)",
                    flag.name,
                    flag.truthy,
                    percentage(flag.truthy, stats.patient_count)
                );
            }
        }

        let others: Vec<_> = stats
            .variables
            .iter()
            .filter(|v| v.shape != Shape::Flag && v.missing > 0)
            .collect();
        if !others.is_empty() {
            let _ = writeln!(summary, "\nMissing values:");
            for variable in others {
                let _ = writeln!(
                    summary,
                    "  {} ({}): {} ({:.1}%)",
                    variable.name,
                    variable.shape,
                    variable.missing,
                    percentage(variable.missing, stats.patient_count)
                );
            }
        }

        summary
    }
}

#[allow(clippy::cast_precision_loss)]
fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// Counts for one variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableSummary {
    pub name: String,
    pub shape: Shape,
    /// Rows where the value is null
    pub missing: usize,
    /// Rows where the value is truthy
    pub truthy: usize,
}

/// Structure containing dataset statistics
#[derive(Debug, Clone)]
pub struct PopulationStats {
    /// Number of rows in the dataset
    pub patient_count: usize,
    /// One entry per variable column
    pub variables: Vec<VariableSummary>,
}
