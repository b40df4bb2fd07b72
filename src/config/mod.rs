//! Study-wide configuration.
//!
//! A study is anchored on an index date and an end date. These come either from
//! literal constants or from a small JSON design file of the form
//! `{"start_date": "2022-02-11", "end_date": "2022-05-31"}`.

use std::fmt;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::util::safe_open_file;
use crate::error::{CohortError, Result};

/// Dates read from a study design file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyDates {
    /// First day of the study period; used as the index date
    pub start_date: NaiveDate,
    /// Last day of the study period
    pub end_date: NaiveDate,
}

impl StudyDates {
    /// Load study dates from a JSON design file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = safe_open_file(path, "reading study dates")?;
        let dates: Self = serde_json::from_reader(std::io::BufReader::new(file))?;
        dates.validate()?;
        log::debug!(
            "Loaded study dates {} to {} from {}",
            dates.start_date,
            dates.end_date,
            path.display()
        );
        Ok(dates)
    }

    /// Parse study dates from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let dates: Self = serde_json::from_str(json)?;
        dates.validate()?;
        Ok(dates)
    }

    fn validate(&self) -> Result<()> {
        if self.end_date < self.start_date {
            return Err(CohortError::Config(format!(
                "end_date {} is before start_date {}",
                self.end_date, self.start_date
            )));
        }
        Ok(())
    }
}

/// How patients are evaluated
#[derive(Debug, Clone)]
pub struct EvaluationConfig {
    /// Evaluate patients on a rayon thread pool
    pub parallel: bool,
    /// Number of worker threads (defaults to the number of CPUs)
    pub num_threads: Option<usize>,
    /// Show a progress bar while evaluating
    pub show_progress: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            num_threads: None,
            show_progress: false,
        }
    }
}

impl EvaluationConfig {
    /// Sequential evaluation without progress output, mostly for tests
    #[must_use]
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            num_threads: Some(1),
            show_progress: false,
        }
    }

    /// Worker count to use for parallel evaluation
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.num_threads.unwrap_or_else(num_cpus::get).max(1)
    }
}

/// Configuration for a study run
#[derive(Debug, Clone)]
pub struct StudyConfig {
    /// Reference date that relative windows are anchored on (`index_date`)
    pub index_date: NaiveDate,
    /// Last date of follow-up
    pub end_date: NaiveDate,
    /// Evaluation settings
    pub evaluation: EvaluationConfig,
}

impl StudyConfig {
    /// Create a configuration from explicit dates
    pub fn new(index_date: NaiveDate, end_date: NaiveDate) -> Result<Self> {
        StudyDates {
            start_date: index_date,
            end_date,
        }
        .validate()?;
        Ok(Self {
            index_date,
            end_date,
            evaluation: EvaluationConfig::default(),
        })
    }

    /// Create a configuration from a study design file
    pub fn from_dates_file(path: &Path) -> Result<Self> {
        let dates = StudyDates::from_json_file(path)?;
        Ok(Self::from(dates))
    }

    /// Replace the evaluation settings
    #[must_use]
    pub fn with_evaluation(mut self, evaluation: EvaluationConfig) -> Self {
        self.evaluation = evaluation;
        self
    }
}

impl From<StudyDates> for StudyConfig {
    fn from(dates: StudyDates) -> Self {
        Self {
            index_date: dates.start_date,
            end_date: dates.end_date,
            evaluation: EvaluationConfig::default(),
        }
    }
}

impl Default for StudyConfig {
    fn default() -> Self {
        // Start of the community treatment campaign
        Self {
            index_date: NaiveDate::from_ymd_opt(2021, 12, 16).unwrap_or(NaiveDate::MIN),
            end_date: NaiveDate::from_ymd_opt(2022, 12, 31).unwrap_or(NaiveDate::MAX),
            evaluation: EvaluationConfig::default(),
        }
    }
}

impl fmt::Display for StudyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Study Configuration:")?;
        writeln!(f, "  Index Date: {}", self.index_date)?;
        writeln!(f, "  End Date: {}", self.end_date)?;
        writeln!(f, "  Parallel: {}", self.evaluation.parallel)?;
        if self.evaluation.parallel {
            writeln!(f, "  Worker Threads: {}", self.evaluation.worker_count())?;
        }
        Ok(())
    }
}
