//! A Rust library for declaring study variables over patient records and extracting
//! cohort datasets, with rule validation, parallel evaluation and CSV/Parquet output.

pub mod backend;
pub mod codelist;
pub mod config;
pub mod dummy;
pub mod error;
pub mod evaluate;
pub mod models;
pub mod output;
pub mod population;
pub mod rules;
pub mod studies;
pub mod utils;

// Re-export the most common types for easier use
// Core types
pub use config::{EvaluationConfig, StudyConfig, StudyDates};
pub use error::{CohortError, Result};
pub use evaluate::{EvaluatedRow, Evaluator};
pub use models::Patient;
pub use output::{Column, Dataset, Row};

// Definitions
pub use codelist::{Codelist, CodelistRegistry, CodingSystem};
pub use rules::{DateExpr, Expr, Rule, RuleSet, RuleSetBuilder, Shape, SourceRule, Value, Variable};
pub use studies::{Study, StudyRun};

// Data sources
pub use backend::{InMemoryBackend, JsonFileBackend, PatientBackend};
pub use dummy::{DummyConfig, DummyDataGenerator, dummy_registry};
