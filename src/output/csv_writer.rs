//! CSV output: `patient_id` then one column per variable, nulls left empty

use std::path::Path;
use std::time::Instant;

use crate::error::Result;
use crate::error::util::safe_create_file;
use crate::output::Dataset;
use crate::utils::logging::{log_file_done, log_file_start};

/// Write a dataset as CSV.
///
/// Dates are written as `YYYY-MM-DD` and flags as `0`/`1`.
pub fn write_csv(dataset: &Dataset, path: &Path) -> Result<()> {
    let start = Instant::now();
    log_file_start("Writing CSV dataset to", path);

    let file = safe_create_file(path, "writing CSV dataset")?;
    let mut writer = csv::Writer::from_writer(file);

    let mut header = Vec::with_capacity(dataset.columns().len() + 1);
    header.push("patient_id");
    header.extend(dataset.columns().iter().map(|c| c.name.as_str()));
    writer.write_record(&header)?;

    let mut record: Vec<String> = Vec::with_capacity(header.len());
    for row in dataset.rows() {
        record.clear();
        record.push(row.patient_id.to_string());
        record.extend(row.values.iter().map(ToString::to_string));
        writer.write_record(&record)?;
    }
    writer.flush()?;

    log_file_done("Wrote", dataset.len(), "rows", path, start.elapsed());
    Ok(())
}
