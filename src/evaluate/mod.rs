//! Per-patient evaluation of a validated rule set
//!
//! Every top-level variable is computed exactly once per patient, in the order fixed
//! when the rule set was built. Nested locals are computed just before the rule that
//! declares them. Missing clinical data never fails evaluation; it yields null or false.
//! Patients are independent, so a batch is evaluated on a rayon pool and the rows come
//! back in input order.

pub mod derived;
pub mod scope;
pub mod source;

use std::cmp::Ordering;
use std::time::Instant;

use anyhow::Context;
use indicatif::{ParallelProgressIterator, ProgressIterator};
use log::{debug, info};
use rayon::prelude::*;

use crate::backend::PatientBackend;
use crate::config::StudyConfig;
use crate::error::Result;
use crate::models::Patient;
use crate::output::{Dataset, Row};
use crate::population;
use crate::rules::{Rule, RuleSet, Shape, Variable};
use crate::utils::logging::patient_bar;

pub use scope::Scope;
pub use source::{Outcome, evaluate_source};

/// One patient's values and whether the population predicate held
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatedRow {
    pub row: Row,
    pub included: bool,
}

/// Evaluates a rule set against patient records
#[derive(Debug, Clone)]
pub struct Evaluator {
    rules: RuleSet,
    config: StudyConfig,
}

impl Evaluator {
    #[must_use]
    pub const fn new(rules: RuleSet, config: StudyConfig) -> Self {
        Self { rules, config }
    }

    #[must_use]
    pub const fn rules(&self) -> &RuleSet {
        &self.rules
    }

    #[must_use]
    pub const fn config(&self) -> &StudyConfig {
        &self.config
    }

    /// Compute every variable for one patient and apply the population predicate
    #[must_use]
    pub fn evaluate(&self, patient: &Patient) -> EvaluatedRow {
        let mut scope = Scope::new(&self.rules, self.config.index_date);
        for variable in self.rules.evaluation_order() {
            self.evaluate_variable(variable, patient, &mut scope);
        }

        let included = population::matches(self.rules.population(), &scope);
        let values = scope.take_values(self.rules.variables().iter().map(|v| v.name.as_str()));

        EvaluatedRow {
            row: Row {
                patient_id: patient.patient_id,
                values,
            },
            included,
        }
    }

    fn evaluate_variable(&self, variable: &Variable, patient: &Patient, scope: &mut Scope<'_>) {
        for local in variable.rule.locals() {
            self.evaluate_variable(local, patient, scope);
        }

        let shape = self.rules.shape(&variable.name).unwrap_or(Shape::Flag);
        let outcome = match &variable.rule {
            Rule::Source(rule) => evaluate_source(rule, patient, scope),
            Rule::Sex => Outcome::value(derived::sex(patient)),
            Rule::AgeAsOf(date) => Outcome::value(derived::age_as_of(patient, date, scope)),
            Rule::RegisteredAsOf(date) => {
                Outcome::value(derived::registered_as_of(patient, date, scope))
            }
            Rule::PracticeAsOf { date, attribute } => {
                Outcome::value(derived::practice_as_of(patient, date, *attribute, scope))
            }
            Rule::AddressAsOf { date, attribute } => {
                Outcome::value(derived::address_as_of(patient, date, *attribute, scope))
            }
            Rule::MinimumOf(names) => {
                Outcome::value(derived::extreme_of(names, Ordering::Less, shape, scope))
            }
            Rule::MaximumOf(names) => {
                Outcome::value(derived::extreme_of(names, Ordering::Greater, shape, scope))
            }
            Rule::Satisfying { expr, .. } => Outcome::value(derived::satisfying(expr, scope)),
            Rule::CategorisedAs { categories, .. } => {
                Outcome::value(derived::categorised_as(categories, scope))
            }
            Rule::DateOf(name) => derived::date_of(name, scope),
        };

        scope.set(&variable.name, outcome.value, outcome.matched);
    }

    /// Evaluate a batch of patients, keeping input order
    ///
    /// # Errors
    /// Fails only if the worker pool cannot be started
    pub fn evaluate_all(&self, patients: &[Patient]) -> Result<Vec<EvaluatedRow>> {
        let start = Instant::now();
        let settings = &self.config.evaluation;
        info!(
            "Evaluating {} variables for {} patients",
            self.rules.len(),
            patients.len()
        );

        let pb = patient_bar(patients.len(), "Evaluating", settings.show_progress);

        let rows: Vec<EvaluatedRow> = if settings.parallel && patients.len() > 1 {
            let workers = settings.worker_count();
            debug!("Using a pool of {workers} evaluation threads");
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .build()
                .context("Failed to start the evaluation thread pool")?;
            pool.install(|| {
                patients
                    .par_iter()
                    .progress_with(pb.clone())
                    .map(|patient| self.evaluate(patient))
                    .collect()
            })
        } else {
            patients
                .iter()
                .progress_with(pb.clone())
                .map(|patient| self.evaluate(patient))
                .collect()
        };
        pb.finish_with_message("done");

        info!(
            "Evaluated {} patients in {:?}",
            rows.len(),
            start.elapsed()
        );
        Ok(rows)
    }

    /// Rows for every patient, whether or not they meet the population predicate
    ///
    /// # Errors
    /// See [`Evaluator::evaluate_all`]
    pub fn evaluate_dataset(&self, patients: &[Patient]) -> Result<Dataset> {
        let rows = self
            .evaluate_all(patients)?
            .into_iter()
            .map(|evaluated| evaluated.row)
            .collect();
        Ok(Dataset::new(self.rules.columns(), rows))
    }

    /// Rows for the patients who meet the population predicate
    ///
    /// # Errors
    /// See [`Evaluator::evaluate_all`]
    pub fn extract(&self, patients: &[Patient]) -> Result<Dataset> {
        let rows: Vec<Row> = self
            .evaluate_all(patients)?
            .into_iter()
            .filter(|evaluated| evaluated.included)
            .map(|evaluated| evaluated.row)
            .collect();
        info!(
            "{} of {} patients meet the population definition",
            rows.len(),
            patients.len()
        );
        Ok(Dataset::new(self.rules.columns(), rows))
    }

    /// Fetch patients from a backend and extract the cohort
    ///
    /// # Errors
    /// Backend errors are returned unchanged and end the run
    pub fn extract_from<B: PatientBackend + ?Sized>(&self, backend: &B) -> Result<Dataset> {
        let patients = backend.fetch_patients()?;
        self.extract(&patients)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::config::EvaluationConfig;
    use crate::rules::{Categories, DateExpr, Expr, Value};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn evaluator(rules: RuleSet) -> Evaluator {
        let config = StudyConfig::new(date(2021, 12, 16), date(2022, 12, 31))
            .unwrap()
            .with_evaluation(EvaluationConfig::sequential());
        Evaluator::new(rules, config)
    }

    #[test]
    fn locals_feed_their_parent_only() {
        let rules = RuleSet::builder()
            .variable("age", Rule::age_as_of(DateExpr::index()))
            .variable(
                "band",
                Rule::categorised_as_with(
                    Categories::new("unknown")
                        .category("adult", Expr::var("is_adult"))
                        .category("child", Expr::is_present("age")),
                    vec![Variable::new("is_adult", Rule::satisfying(Expr::ge("age", 18)))],
                ),
            )
            .build()
            .unwrap();
        let eval = evaluator(rules);

        let adult = Patient::new(1).with_date_of_birth(date(1980, 1, 1));
        let child = Patient::new(2).with_date_of_birth(date(2015, 1, 1));
        let unknown = Patient::new(3);

        assert_eq!(eval.evaluate(&adult).row.values, vec![Value::Int(41), Value::from("adult")]);
        assert_eq!(eval.evaluate(&child).row.values[1], Value::from("child"));
        assert_eq!(eval.evaluate(&unknown).row.values, vec![Value::Null, Value::from("unknown")]);
    }

    #[test]
    fn parallel_keeps_input_order() {
        let rules = RuleSet::builder()
            .variable("age", Rule::age_as_of(DateExpr::index()))
            .population(Expr::ge("age", 50))
            .build()
            .unwrap();
        let config = StudyConfig::default().with_evaluation(EvaluationConfig {
            parallel: true,
            num_threads: Some(4),
            show_progress: false,
        });
        let eval = Evaluator::new(rules, config);
        let patients: Vec<Patient> = (0..200)
            .map(|i| Patient::new(i).with_date_of_birth(date(1920 + (i % 80) as i32, 1, 1)))
            .collect();

        let rows = eval.evaluate_all(&patients).unwrap();
        let ids: Vec<u64> = rows.iter().map(|r| r.row.patient_id).collect();
        assert_eq!(ids, (0..200).collect::<Vec<_>>());

        let dataset = eval.extract(&patients).unwrap();
        assert!(dataset.rows().iter().all(|row| matches!(row.values[0], Value::Int(age) if age >= 50)));
    }
}
