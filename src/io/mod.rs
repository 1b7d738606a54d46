//! # Table I/O
//!
//! Reading feature tables from delimited text or JSON records, and exporting
//! them as CSV. The core transforms never touch files; this layer sits in front
//! of them.
//!
//! ## Supported inputs
//!
//! | Extension        | Layout                          |
//! |------------------|---------------------------------|
//! | `.csv`           | comma-separated, header row     |
//! | `.tsv`, `.txt`   | tab-separated, header row       |
//! | `.json`          | array of flat objects           |
//!
//! Empty cells become null. Delimited cells stay text; numeric meaning comes
//! from parsing at the point of use.

mod reader;
mod writer;


use std::fmt;
use std::path::Path;

use crate::error::CoreError;

pub use reader::{read_delimited, read_json, read_table};
pub use writer::{write_csv, write_delimited};

/// Errors from reading or writing tables.
#[derive(Debug, thiserror::Error)]
pub enum TableIoError {
    /// I/O error on the underlying file
    #[error("Failed to access file: {0}")]
    IoError(#[from] std::io::Error),

    /// CSV/TSV parsing or writing error
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Input parsed but holds no data rows
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// Unsupported or malformed input layout
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Parsed data violates a table invariant
    #[error(transparent)]
    Table(#[from] CoreError),
}

/// On-disk table layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    /// Comma-separated values
    Csv,
    /// Tab-separated values
    Tsv,
    /// JSON array of records
    Json,
}

impl TableFormat {
    /// Detect the layout from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self, TableIoError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(TableFormat::Csv),
            "tsv" | "txt" | "tab" => Ok(TableFormat::Tsv),
            "json" => Ok(TableFormat::Json),
            _ => Err(TableIoError::InvalidFormat(format!(
                "Unsupported table extension '{}' for {}",
                ext,
                path.display()
            ))),
        }
    }

    /// Field delimiter for delimited layouts.
    pub fn delimiter(&self) -> Option<u8> {
        match self {
            TableFormat::Csv => Some(b','),
            TableFormat::Tsv => Some(b'\t'),
            TableFormat::Json => None,
        }
    }
}

impl fmt::Display for TableFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableFormat::Csv => write!(f, "CSV"),
            TableFormat::Tsv => write!(f, "TSV"),
            TableFormat::Json => write!(f, "JSON"),
        }
    }
}
