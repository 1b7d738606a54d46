use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::CellValue;

static NULL: CellValue = CellValue::Null;

/// One feature row: header name to cell value.
///
/// Headers absent from the map read as [`CellValue::Null`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    cells: HashMap<String, CellValue>,
}

impl Row {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Value under `column`, `Null` when absent.
    pub fn get(&self, column: &str) -> &CellValue {
        self.cells.get(column).unwrap_or(&NULL)
    }

    /// Whether the row holds an entry (possibly `Null`) for `column`.
    pub fn contains(&self, column: &str) -> bool {
        self.cells.contains_key(column)
    }

    /// Trimmed non-empty key under `column`.
    pub fn key(&self, column: &str) -> Option<String> {
        self.get(column).as_key()
    }

    /// Finite number under `column`.
    pub fn number(&self, column: &str) -> Option<f64> {
        self.get(column).as_number()
    }

    /// Trimmed text of `column`, or an empty string.
    pub fn trimmed(&self, column: &str) -> String {
        self.key(column).unwrap_or_default()
    }

    /// Store a value, replacing any previous one.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<CellValue>) {
        self.cells.insert(column.into(), value.into());
    }

    /// Builder form of [`Row::set`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.set(column, value);
        self
    }

    /// Drop an entry.
    pub fn remove(&mut self, column: &str) -> Option<CellValue> {
        self.cells.remove(column)
    }

    /// Column names present in this row (unordered).
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }
}

impl<K, V> FromIterator<(K, V)> for Row
where
    K: Into<String>,
    V: Into<CellValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            cells: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
