//! Console output utilities
//!
//! This module provides formatted console summaries of study runs.

use std::time::Duration;

use crate::output::Dataset;
use crate::population::{FlowchartReport, PopulationStatistics};

/// Print summary information about an extracted dataset
pub fn print_dataset_summary(dataset: &Dataset, elapsed: Duration) {
    println!("Extracted {} patients in {:?}", dataset.len(), elapsed);
    println!("Columns: {}", dataset.columns().len() + 1);
}

/// Print the columns of a dataset with their shapes
pub fn print_schema_info(dataset: &Dataset) {
    println!("Schema:");
    println!("  - patient_id (integer)");
    for column in dataset.columns() {
        println!("  - {} ({})", column.name, column.shape);
    }
}

/// Print sample rows from a dataset
pub fn print_sample_rows(dataset: &Dataset, num_rows: usize) {
    println!("First {num_rows} rows:");
    for row in dataset.rows().iter().take(num_rows) {
        let values: Vec<String> = dataset
            .columns()
            .iter()
            .zip(&row.values)
            .map(|(column, value)| {
                if value.is_null() {
                    format!("{}: NULL", column.name)
                } else {
                    format!("{}: {value}", column.name)
                }
            })
            .collect();
        println!("Patient {}: [{}]", row.patient_id, values.join(", "));
    }
}

/// Print flowchart counts followed by per-variable completeness
pub fn print_study_report(report: &FlowchartReport, cohort: &Dataset) {
    print!("{report}");
    let stats = PopulationStatistics::calculate(cohort);
    println!("{}", PopulationStatistics::generate_summary(&stats));
}
