//! Extracted datasets
//!
//! A [`Dataset`] holds one [`Row`] per patient: the patient identifier followed by one
//! value per top-level variable, in declaration order. It can be written as CSV or
//! Parquet.

pub mod csv_writer;
pub mod parquet_writer;

use std::path::Path;

use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::rules::{Bindings, Shape, Value};

pub use csv_writer::write_csv;
pub use parquet_writer::{to_record_batch, write_parquet};

/// A named, typed output column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub shape: Shape,
}

impl Column {
    pub fn new(name: impl Into<String>, shape: Shape) -> Self {
        Self {
            name: name.into(),
            shape,
        }
    }
}

/// One patient's output values
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    pub patient_id: u64,
    pub values: Vec<Value>,
}

/// Rows sharing a column layout
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    columns: Vec<Column>,
    index: FxHashMap<String, usize>,
    rows: Vec<Row>,
}

impl Dataset {
    #[must_use]
    pub fn new(columns: Vec<Column>, rows: Vec<Row>) -> Self {
        let index = columns
            .iter()
            .enumerate()
            .map(|(idx, column)| (column.name.clone(), idx))
            .collect();
        Self {
            columns,
            index,
            rows,
        }
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    #[must_use]
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column among the variable columns
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Row for a patient
    #[must_use]
    pub fn row(&self, patient_id: u64) -> Option<&Row> {
        self.rows.iter().find(|row| row.patient_id == patient_id)
    }

    /// A value by patient and column; `None` if either is absent
    #[must_use]
    pub fn value(&self, patient_id: u64, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.row(patient_id)?.values.get(idx)
    }

    /// View a row by column name, e.g. to evaluate expressions over it
    #[must_use]
    pub fn view<'a>(&'a self, row: &'a Row) -> RowView<'a> {
        RowView {
            index: &self.index,
            row,
        }
    }

    /// Named views over every row
    pub fn views(&self) -> impl Iterator<Item = RowView<'_>> {
        self.rows.iter().map(|row| self.view(row))
    }

    /// Write the dataset as CSV
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        write_csv(self, path)
    }

    /// Write the dataset as Parquet
    pub fn write_parquet(&self, path: &Path) -> Result<()> {
        write_parquet(self, path)
    }
}

/// A row whose values are addressed by column name
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    index: &'a FxHashMap<String, usize>,
    row: &'a Row,
}

impl RowView<'_> {
    #[must_use]
    pub const fn patient_id(&self) -> u64 {
        self.row.patient_id
    }
}

impl Bindings for RowView<'_> {
    fn value(&self, name: &str) -> Option<&Value> {
        self.index.get(name).and_then(|&idx| self.row.values.get(idx))
    }
}
