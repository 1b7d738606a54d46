//! # Contaminant Filtering
//!
//! Drops features whose resolved annotation is on an exclusion list, such as
//! plasticisers, column bleed or solvent clusters.
//!
//! Rows without an annotation cannot be judged and are always kept. The
//! filter returns a new table; keeping the input around is the undo.

use std::collections::HashSet;

use crate::columns;
use crate::table::Table;

/// Removes rows whose annotation is an excluded name.
#[derive(Debug, Clone)]
pub struct ContaminantFilter {
    excluded: HashSet<String>,
    annotation_column: String,
}

impl ContaminantFilter {
    /// Filter on the default annotation column. Names are trimmed.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            excluded: names
                .into_iter()
                .map(|n| n.as_ref().trim().to_string())
                .filter(|n| !n.is_empty())
                .collect(),
            annotation_column: columns::RESOLVED_ANNOTATION.to_string(),
        }
    }

    /// Parse a newline-separated name list; see [`parse_name_list`].
    pub fn from_lines(text: &str) -> Self {
        Self::new(parse_name_list(text))
    }

    /// Read annotations from another column.
    pub fn with_annotation_column(mut self, column: impl Into<String>) -> Self {
        self.annotation_column = column.into();
        self
    }

    /// Number of excluded names.
    pub fn len(&self) -> usize {
        self.excluded.len()
    }

    /// True when nothing is excluded.
    pub fn is_empty(&self) -> bool {
        self.excluded.is_empty()
    }

    /// Whether `name` (trimmed) is excluded.
    pub fn excludes(&self, name: &str) -> bool {
        self.excluded.contains(name.trim())
    }

    /// Keep every row whose annotation is empty or not excluded.
    pub fn apply(&self, table: &Table) -> Table {
        let filtered = table.filter_rows(|row| match row.key(&self.annotation_column) {
            Some(annotation) => !self.excluded.contains(&annotation),
            None => true,
        });
        log::info!(
            "Contaminant filter removed {} of {} row(s)",
            removed_count(table, &filtered),
            table.len()
        );
        filtered
    }
}

/// Names from a newline-separated list, in file order.
///
/// Lines are trimmed; blank lines and `#` comments are skipped.
pub fn parse_name_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Rows dropped between two snapshots of the same table.
pub fn removed_count(before: &Table, after: &Table) -> usize {
    before.len().saturating_sub(after.len())
}
