//! Loading codelists from CSV files
//!
//! Codelist files are tabular with a header row, one code per row and optionally a
//! category column. Column names are resolved once, so a definition that refers to
//! a column the file does not have fails at load time rather than per patient.

use std::collections::BTreeMap;
use std::path::Path;

use crate::codelist::{ClinicalCode, Codelist, CodingSystem};
use crate::error::util::safe_open_file;
use crate::error::{CohortError, Result};

/// Load a codelist from a CSV file
///
/// # Arguments
/// * `path` - Path to the CSV file
/// * `name` - Name given to the loaded codelist
/// * `system` - Coding system of the codes in `code_column`
/// * `code_column` - Header of the column holding codes
/// * `category_column` - Optional header of the column holding categories
///
/// # Errors
/// Returns an error if the file is missing, is not valid CSV, or lacks a named column
pub fn load_codelist(
    path: &Path,
    name: &str,
    system: CodingSystem,
    code_column: &str,
    category_column: Option<&str>,
) -> Result<Codelist> {
    let file = safe_open_file(path, &format!("loading codelist '{name}'"))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(file);

    let headers = reader.headers()?.clone();
    let column_index = |column: &str| {
        headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| CohortError::MissingColumn {
                path: path.to_path_buf(),
                column: column.to_string(),
            })
    };

    let code_idx = column_index(code_column)?;
    let category_idx = category_column.map(column_index).transpose()?;

    let mut entries: BTreeMap<ClinicalCode, Option<String>> = BTreeMap::new();
    for record in reader.records() {
        let record = record?;
        let Some(raw) = record.get(code_idx).filter(|c| !c.is_empty()) else {
            continue;
        };
        let category = category_idx
            .and_then(|idx| record.get(idx))
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        entries
            .entry(ClinicalCode::new(system, raw))
            .or_insert(category);
    }

    log::debug!(
        "Loaded codelist '{}' with {} {} codes from {}",
        name,
        entries.len(),
        system,
        path.display()
    );

    Ok(Codelist::from_entries(name, entries))
}
