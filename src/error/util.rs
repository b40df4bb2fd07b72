//! Utility functions for error handling
//!
//! This module provides file-access helpers that fail with path-carrying errors, so a
//! missing codelist or patient file is reported before any patient is processed.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{CohortError, Result};

/// Safely open a file with rich error information
///
/// # Arguments
/// * `path` - The path to the file to open
/// * `purpose` - Why the file is being opened (for error context)
pub fn safe_open_file(path: &Path, purpose: &str) -> Result<fs::File> {
    if !path.exists() {
        return Err(
            CohortError::io_error(format!("File not found, needed for: {purpose}")).with_path(path),
        );
    }

    if !path.is_file() {
        return Err(
            CohortError::io_error(format!("Path is not a file, expected a file for: {purpose}"))
                .with_path(path),
        );
    }

    fs::File::open(path).map_err(|e| {
        let context = match e.kind() {
            io::ErrorKind::PermissionDenied => "Permission denied - check file permissions".to_string(),
            _ => format!("Failed to open file for: {purpose}"),
        };
        CohortError::io_error_with_source(context, e).with_path(path)
    })
}

/// Check if a directory exists and is readable, with rich error information
pub fn validate_directory(path: &Path, purpose: &str) -> Result<()> {
    if !path.exists() {
        return Err(
            CohortError::io_error(format!("Directory not found, needed for: {purpose}"))
                .with_path(path),
        );
    }

    if !path.is_dir() {
        return Err(CohortError::io_error(format!(
            "Path is not a directory, expected a directory for: {purpose}"
        ))
        .with_path(path));
    }

    fs::read_dir(path).map(|_| ()).map_err(|e| {
        let context = match e.kind() {
            io::ErrorKind::PermissionDenied => {
                "Permission denied - check directory permissions".to_string()
            }
            _ => format!("Failed to access directory for: {purpose}"),
        };
        CohortError::io_error_with_source(context, e).with_path(path)
    })
}

/// Create a file for writing, creating missing parent directories first
pub fn safe_create_file(path: &Path, purpose: &str) -> Result<fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            CohortError::io_error_with_source(
                format!("Failed to create output directory for: {purpose}"),
                e,
            )
            .with_path(parent)
        })?;
    }

    fs::File::create(path).map_err(|e| {
        CohortError::io_error_with_source(format!("Failed to create file for: {purpose}"), e)
            .with_path(path)
    })
}
