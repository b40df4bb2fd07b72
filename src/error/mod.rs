//! Error handling for cohort definitions and extraction.
//!
//! Definition-time problems (bad references, cycles, missing codelist files) and
//! backend failures are both fatal and surface as [`CohortError`]. Per-patient data
//! gaps never do: they resolve to null or false inside the evaluator.

pub mod util;

use std::io;
use std::path::{Path, PathBuf};

use arrow::error::ArrowError;
use parquet::errors::ParquetError;

/// Specialized error type for cohort definition and extraction
#[derive(Debug, thiserror::Error)]
pub enum CohortError {
    /// Error opening, reading or writing a file
    #[error("IO error: {message}{}", path_suffix(.path.as_deref()))]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<io::Error>,
    },

    /// Malformed CSV input or failure writing CSV output
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Malformed JSON input
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Arrow error while building the output dataset
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Parquet error while writing the output dataset
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    /// A codelist file does not carry a column the definition refers to
    #[error("Codelist file {} has no column '{column}'", .path.display())]
    MissingColumn { path: PathBuf, column: String },

    /// A rule refers to a codelist the registry does not hold
    #[error("Unknown codelist '{0}'")]
    UnknownCodelist(String),

    /// A rule refers to a variable that is not declared in scope
    #[error("Variable '{variable}' references unknown variable '{reference}'")]
    UnknownVariable { variable: String, reference: String },

    /// Two variables share a name
    #[error("Variable '{0}' is declared more than once")]
    DuplicateVariable(String),

    /// The reference graph contains a cycle
    #[error("Cyclic dependency between variables: {}", .0.join(" -> "))]
    CyclicDependency(Vec<String>),

    /// A variable's return shape does not fit how it is consumed
    #[error("Shape mismatch in variable '{variable}': {detail}")]
    ShapeMismatch { variable: String, detail: String },

    /// A rule is structurally invalid (e.g. an attribute its table does not have)
    #[error("Invalid rule for variable '{variable}': {detail}")]
    InvalidRule { variable: String, detail: String },

    /// A date expression string could not be parsed
    #[error("Invalid date expression '{0}'")]
    InvalidDateExpression(String),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// The patient backend could not supply records; aborts the run
    #[error("Backend error: {0}")]
    Backend(String),

    /// Any other error with context
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn path_suffix(path: Option<&Path>) -> String {
    path.map(|p| format!(" ({})", p.display()))
        .unwrap_or_default()
}

impl CohortError {
    /// Create an IO error without an underlying source
    pub fn io_error(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            path: None,
            source: None,
        }
    }

    /// Create an IO error wrapping an `io::Error`
    pub fn io_error_with_source(message: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            message: message.into(),
            path: None,
            source: Some(source),
        }
    }

    /// Attach a path to an IO error. Other variants are returned unchanged.
    #[must_use]
    pub fn with_path(self, path: &Path) -> Self {
        match self {
            Self::Io {
                message, source, ..
            } => Self::Io {
                message,
                path: Some(path.to_path_buf()),
                source,
            },
            other => other,
        }
    }

    /// Create an invalid-rule error for a variable
    pub fn invalid_rule(variable: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::InvalidRule {
            variable: variable.into(),
            detail: detail.into(),
        }
    }

    /// Create a shape-mismatch error for a variable
    pub fn shape_mismatch(variable: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            variable: variable.into(),
            detail: detail.into(),
        }
    }

    /// Whether this error was raised while validating definitions, before any patient
    /// data was touched
    #[must_use]
    pub const fn is_definition_error(&self) -> bool {
        matches!(
            self,
            Self::MissingColumn { .. }
                | Self::UnknownCodelist(_)
                | Self::UnknownVariable { .. }
                | Self::DuplicateVariable(_)
                | Self::CyclicDependency(_)
                | Self::ShapeMismatch { .. }
                | Self::InvalidRule { .. }
                | Self::InvalidDateExpression(_)
        )
    }
}

impl From<io::Error> for CohortError {
    fn from(error: io::Error) -> Self {
        Self::io_error_with_source(error.to_string(), error)
    }
}

/// Result type for cohort operations
pub type Result<T> = std::result::Result<T, CohortError>;
