//! Study definitions
//!
//! A [`Study`] bundles a validated rule set with its configuration and the labelled
//! inclusion criteria its population predicate is made of.

pub mod flowchart_ba2;
pub mod fragments;
pub mod treatment;

use std::time::Instant;

use log::info;

use crate::codelist::CodelistRegistry;
use crate::config::StudyConfig;
use crate::error::{CohortError, Result};
use crate::evaluate::Evaluator;
use crate::models::Patient;
use crate::output::{Dataset, Row};
use crate::population::{Flowchart, FlowchartReport};
use crate::rules::RuleSet;

/// A named, validated study definition
#[derive(Debug, Clone)]
pub struct Study {
    pub name: String,
    pub rules: RuleSet,
    pub config: StudyConfig,
    pub flowchart: Flowchart,
}

/// Result of running a study over a set of patients
#[derive(Debug, Clone)]
pub struct StudyRun {
    /// Patients meeting every inclusion criterion
    pub cohort: Dataset,
    /// Counts after each inclusion criterion
    pub report: FlowchartReport,
}

impl Study {
    /// Build a study by name
    ///
    /// # Errors
    /// `Config` for an unknown name, otherwise see the study's own constructor
    pub fn by_name(name: &str, registry: &CodelistRegistry, config: StudyConfig) -> Result<Self> {
        match name {
            treatment::NAME => treatment::study(registry, config),
            flowchart_ba2::NAME => flowchart_ba2::study(registry, config),
            other => Err(CohortError::Config(format!(
                "Unknown study '{other}', expected one of: {}",
                Self::names().join(", ")
            ))),
        }
    }

    #[must_use]
    pub fn names() -> Vec<&'static str> {
        vec![treatment::NAME, flowchart_ba2::NAME]
    }

    #[must_use]
    pub fn evaluator(&self) -> Evaluator {
        Evaluator::new(self.rules.clone(), self.config.clone())
    }

    /// Evaluate every patient, count the flowchart and keep the included rows
    ///
    /// # Errors
    /// Fails only when the evaluation pool cannot be created
    pub fn run(&self, patients: &[Patient]) -> Result<StudyRun> {
        let start = Instant::now();
        let evaluated = self.evaluator().evaluate_all(patients)?;

        let mut all_rows = Vec::with_capacity(evaluated.len());
        let mut included: Vec<Row> = Vec::new();
        for row in evaluated {
            if row.included {
                included.push(row.row.clone());
            }
            all_rows.push(row.row);
        }

        let everyone = Dataset::new(self.rules.columns(), all_rows);
        let report = self.flowchart.count(&everyone);
        info!(
            "Study '{}': {} of {} patients included in {:?}",
            self.name,
            included.len(),
            patients.len(),
            start.elapsed()
        );

        Ok(StudyRun {
            cohort: Dataset::new(self.rules.columns(), included),
            report,
        })
    }
}
