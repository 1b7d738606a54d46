//! # Feature Table
//!
//! The in-memory value every transform consumes and produces: an ordered list
//! of unique headers plus an ordered list of rows.
//!
//! Tables are never mutated by the transforms. Each stage builds a new value,
//! so keeping a reference to the previous table is all undo needs.
//!
//! ```rust
//! use metannot::table::{Row, Table};
//!
//! let table = Table::from_rows(vec![
//!     Row::new().with("ID", "1").with("MZ", 100.1234),
//!     Row::new().with("ID", "2"),
//! ]);
//! assert_eq!(table.headers(), ["ID", "MZ"]);
//! assert!(table.rows()[1].get("MZ").is_empty());
//! ```

mod row;
mod value;


use serde::Serialize;
use std::collections::HashSet;

use crate::error::{CoreError, Result};

pub use row::Row;
pub use value::CellValue;

/// Ordered headers plus ordered rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Create a table, rejecting duplicate header names.
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(headers.len());
        for header in &headers {
            if !seen.insert(header.as_str()) {
                return Err(CoreError::DuplicateHeader(header.clone()));
            }
        }
        Ok(Self { headers, rows })
    }

    /// Build a table whose headers are the row columns in first-seen order.
    ///
    /// Columns inside a single row are unordered, so the order within the
    /// first row that introduces several new columns is sorted by name.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let mut headers: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for row in &rows {
            let mut fresh: Vec<&str> = row.columns().filter(|c| !seen.contains(*c)).collect();
            fresh.sort_unstable();
            for column in fresh {
                seen.insert(column.to_string());
                headers.push(column.to_string());
            }
        }
        Self { headers, rows }
    }

    /// Assemble a table whose headers are already known to be unique.
    pub(crate) fn from_parts(headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self { headers, rows }
    }

    /// Column names in order.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Rows in order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether `name` is one of the headers.
    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    /// Every name from `required` that is not a header, in the given order.
    pub fn missing_columns<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required
            .iter()
            .copied()
            .filter(|name| !self.has_column(name))
            .collect()
    }

    /// Fail with every missing name when any of `required` is absent.
    pub fn require_columns(&self, context: &str, required: &[&str]) -> Result<()> {
        let missing = self.missing_columns(required);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CoreError::missing_columns(context, missing))
        }
    }

    /// Headers accepted by `predicate`, in table order.
    pub fn headers_where<F>(&self, mut predicate: F) -> Vec<String>
    where
        F: FnMut(&str) -> bool,
    {
        self.headers
            .iter()
            .filter(|h| predicate(h.as_str()))
            .cloned()
            .collect()
    }

    /// Same headers, new rows.
    pub fn with_rows(&self, rows: Vec<Row>) -> Table {
        Table {
            headers: self.headers.clone(),
            rows,
        }
    }

    /// Same rows, with `extra` headers appended when not already present.
    pub fn with_headers<I, S>(&self, extra: I) -> Table
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut headers = self.headers.clone();
        append_headers(&mut headers, extra);
        Table {
            headers,
            rows: self.rows.clone(),
        }
    }

    /// Set `column` on every row from `value`, appending the header if new.
    pub fn with_column<F>(&self, column: &str, mut value: F) -> Table
    where
        F: FnMut(&Row) -> CellValue,
    {
        let mut headers = self.headers.clone();
        append_headers(&mut headers, [column]);
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let cell = value(row);
                row.clone().with(column, cell)
            })
            .collect();
        Table { headers, rows }
    }

    /// Drop `columns` from both the headers and every row.
    pub fn without_columns(&self, columns: &[&str]) -> Table {
        let headers = self
            .headers
            .iter()
            .filter(|h| !columns.contains(&h.as_str()))
            .cloned()
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut row = row.clone();
                for column in columns {
                    row.remove(column);
                }
                row
            })
            .collect();
        Table { headers, rows }
    }

    /// Keep the rows accepted by `predicate`, preserving order.
    pub fn filter_rows<F>(&self, mut predicate: F) -> Table
    where
        F: FnMut(&Row) -> bool,
    {
        self.with_rows(self.rows.iter().filter(|r| predicate(r)).cloned().collect())
    }

    /// Rows projected onto the headers, in header order.
    ///
    /// This is the view handed to exporters.
    pub fn projected_rows(&self) -> impl Iterator<Item = Vec<&CellValue>> + '_ {
        self.rows
            .iter()
            .map(move |row| self.headers.iter().map(|h| row.get(h)).collect())
    }

    /// All values of one column, `Null` where a row lacks it.
    pub fn column_values<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a CellValue> + 'a {
        self.rows.iter().map(move |row| row.get(column))
    }
}

/// Append headers that are not yet present, keeping existing order.
pub(crate) fn append_headers<I, S>(headers: &mut Vec<String>, extra: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for name in extra {
        let name = name.as_ref();
        if !headers.iter().any(|h| h == name) {
            headers.push(name.to_string());
        }
    }
}
