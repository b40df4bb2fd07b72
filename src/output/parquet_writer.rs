//! Parquet output
//!
//! Column types follow variable shapes: flags are booleans, dates are `Date32`,
//! categories are UTF-8 strings, counts and ranks are `Int64` and measurements are
//! `Float64`. Every variable column is nullable.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use arrow::array::{
    ArrayRef, BooleanBuilder, Date32Builder, Float64Builder, Int64Builder, StringBuilder,
    UInt64Array,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use chrono::Datelike;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::error::Result;
use crate::error::util::safe_create_file;
use crate::output::{Column, Dataset, Row};
use crate::rules::{Shape, Value};
use crate::utils::logging::{log_file_done, log_file_start};

/// Days from 0001-01-01 to 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

const fn data_type(shape: Shape) -> DataType {
    match shape {
        Shape::Flag => DataType::Boolean,
        Shape::Date => DataType::Date32,
        Shape::Category => DataType::Utf8,
        Shape::Integer => DataType::Int64,
        Shape::Float => DataType::Float64,
    }
}

/// Arrow schema for a dataset's columns
#[must_use]
pub fn schema(columns: &[Column]) -> SchemaRef {
    let mut fields = Vec::with_capacity(columns.len() + 1);
    fields.push(Field::new("patient_id", DataType::UInt64, false));
    fields.extend(
        columns
            .iter()
            .map(|c| Field::new(c.name.as_str(), data_type(c.shape), true)),
    );
    Arc::new(Schema::new(fields))
}

fn build_column(rows: &[Row], idx: usize, shape: Shape) -> ArrayRef {
    let values = rows.iter().map(|row| row.values.get(idx).unwrap_or(&Value::Null));
    match shape {
        Shape::Flag => {
            let mut builder = BooleanBuilder::with_capacity(rows.len());
            for value in values {
                match value {
                    Value::Bool(b) => builder.append_value(*b),
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        Shape::Date => {
            let mut builder = Date32Builder::with_capacity(rows.len());
            for value in values {
                builder.append_option(
                    value
                        .as_date()
                        .map(|d| d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE),
                );
            }
            Arc::new(builder.finish())
        }
        Shape::Category => {
            let mut builder = StringBuilder::with_capacity(rows.len(), rows.len() * 8);
            for value in values {
                builder.append_option(value.as_str());
            }
            Arc::new(builder.finish())
        }
        Shape::Integer => {
            let mut builder = Int64Builder::with_capacity(rows.len());
            for value in values {
                match value {
                    Value::Int(i) => builder.append_value(*i),
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        Shape::Float => {
            let mut builder = Float64Builder::with_capacity(rows.len());
            for value in values {
                builder.append_option(value.as_f64());
            }
            Arc::new(builder.finish())
        }
    }
}

/// Convert a dataset into a single Arrow record batch
pub fn to_record_batch(dataset: &Dataset) -> Result<RecordBatch> {
    let rows = dataset.rows();
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(dataset.columns().len() + 1);
    arrays.push(Arc::new(UInt64Array::from_iter_values(
        rows.iter().map(|r| r.patient_id),
    )));
    arrays.extend(
        dataset
            .columns()
            .iter()
            .enumerate()
            .map(|(idx, column)| build_column(rows, idx, column.shape)),
    );
    Ok(RecordBatch::try_new(schema(dataset.columns()), arrays)?)
}

/// Write a dataset as a Snappy-compressed Parquet file
pub fn write_parquet(dataset: &Dataset, path: &Path) -> Result<()> {
    let start = Instant::now();
    log_file_start("Writing Parquet dataset to", path);

    let batch = to_record_batch(dataset)?;
    let file = safe_create_file(path, "writing Parquet dataset")?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    log_file_done("Wrote", dataset.len(), "rows", path, start.elapsed());
    Ok(())
}
