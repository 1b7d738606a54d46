//! # Table Merging
//!
//! Joins an incoming annotation table onto the base feature table, one call
//! per upstream source, copying a chosen set of columns across.
//!
//! Two key flavours are supported:
//!
//! - **Exact**: trimmed string equality, typically on the feature `ID`.
//! - **Tolerance**: numeric equality after rounding both sides to a fixed
//!   number of decimals, typically base `MZ` against a library ion mass.
//!
//! Unmatched keys never fail a merge. They are returned alongside the merged
//! table so the caller can surface them.
//!
//! ```rust
//! use metannot::merge::TableMerger;
//! use metannot::table::{Row, Table};
//!
//! let base = Table::from_rows(vec![Row::new().with("ID", "1"), Row::new().with("ID", "2")]);
//! let fbmn = Table::from_rows(vec![Row::new().with("ID", "2").with("Compound_Name", "X")]);
//!
//! let outcome = TableMerger::new(["Compound_Name"]).merge_exact(&base, &fbmn, "ID")?;
//! assert_eq!(outcome.table.rows()[1].get("Compound_Name").to_string(), "X");
//! assert!(outcome.unmatched_keys.is_empty());
//! # Ok::<(), metannot::error::CoreError>(())
//! ```

mod key;


use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};

use crate::contracts;
use crate::error::{CoreError, Result};
use crate::table::{append_headers, Row, Table};

pub use key::{DuplicateKeyPolicy, MatchKey, DEFAULT_PRECISION};

/// Largest supported rounding precision for tolerance joins.
pub const MAX_PRECISION: u32 = 12;

/// Result of one merge call.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// Base rows with the append columns filled in
    pub table: Table,
    /// Incoming keys that no base row carries, deduplicated, in incoming order
    pub unmatched_keys: Vec<String>,
    /// Base keys that found no incoming row, deduplicated, in base order
    pub unmatched_base_keys: Vec<String>,
    /// Number of base rows that received values
    pub matched_rows: usize,
}

/// Joins tables and appends designated columns.
#[derive(Debug, Clone)]
pub struct TableMerger {
    append_columns: Vec<String>,
    duplicate_policy: DuplicateKeyPolicy,
    precision: u32,
}

impl TableMerger {
    /// Create a merger copying `append_columns` from matched incoming rows.
    pub fn new<I, S>(append_columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            append_columns: append_columns.into_iter().map(Into::into).collect(),
            duplicate_policy: DuplicateKeyPolicy::default(),
            precision: DEFAULT_PRECISION,
        }
    }

    /// Choose how duplicate incoming keys are resolved.
    pub fn with_duplicate_policy(mut self, policy: DuplicateKeyPolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    /// Set the decimals kept by tolerance joins.
    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self
    }

    /// Columns copied on a match.
    pub fn append_columns(&self) -> &[String] {
        &self.append_columns
    }

    /// Join on the trimmed string value of `key_column`.
    ///
    /// Both tables must carry `key_column`.
    pub fn merge_exact(&self, base: &Table, incoming: &Table, key_column: &str) -> Result<MergeOutcome> {
        contracts::require_id_join(base, incoming, key_column)?;
        self.warn_missing_append_columns(incoming);

        Ok(self.merge_by(
            base,
            incoming,
            |row| MatchKey::exact(row, key_column),
            |row| MatchKey::exact(row, key_column),
        ))
    }

    /// Join on numeric keys rounded to the configured precision.
    pub fn merge_tolerance(
        &self,
        base: &Table,
        incoming: &Table,
        base_key_column: &str,
        incoming_key_column: &str,
    ) -> Result<MergeOutcome> {
        if self.precision > MAX_PRECISION {
            return Err(CoreError::InvalidParameter(format!(
                "Tolerance precision must be at most {} decimals, got {}",
                MAX_PRECISION, self.precision
            )));
        }
        contracts::require_tolerance_join(base, incoming, base_key_column, incoming_key_column)?;
        self.warn_missing_append_columns(incoming);

        let precision = self.precision;
        Ok(self.merge_by(
            base,
            incoming,
            |row| MatchKey::rounded(row, base_key_column, precision),
            |row| MatchKey::rounded(row, incoming_key_column, precision),
        ))
    }

    fn merge_by<B, I>(&self, base: &Table, incoming: &Table, base_key: B, incoming_key: I) -> MergeOutcome
    where
        B: Fn(&Row) -> Option<MatchKey>,
        I: Fn(&Row) -> Option<MatchKey>,
    {
        let (lookup, incoming_order, duplicates) = self.build_lookup(incoming, &incoming_key);
        if duplicates > 0 {
            warn!(
                "{} incoming row(s) share a key with an earlier row; resolved with {}",
                duplicates, self.duplicate_policy
            );
        }

        let mut base_keys = HashSet::with_capacity(base.len());
        let mut unmatched_base_keys = Vec::new();
        let mut reported_base = HashSet::new();
        let mut matched_rows = 0;

        let rows: Vec<Row> = base
            .rows()
            .iter()
            .map(|row| {
                let Some(key) = base_key(row) else {
                    return row.clone();
                };
                base_keys.insert(key.clone());
                match lookup.get(&key) {
                    Some(&idx) => {
                        matched_rows += 1;
                        let source = &incoming.rows()[idx];
                        let mut merged = row.clone();
                        for column in &self.append_columns {
                            merged.set(column.clone(), source.get(column).clone());
                        }
                        merged
                    }
                    None => {
                        if reported_base.insert(key.clone()) {
                            unmatched_base_keys.push(key.to_string());
                        }
                        row.clone()
                    }
                }
            })
            .collect();

        let unmatched_keys: Vec<String> = incoming_order
            .into_iter()
            .filter(|key| !base_keys.contains(key))
            .map(|key| key.to_string())
            .collect();

        let mut headers = base.headers().to_vec();
        append_headers(&mut headers, &self.append_columns);

        info!(
            "Merged {} of {} base rows ({} incoming key(s) unmatched)",
            matched_rows,
            base.len(),
            unmatched_keys.len()
        );
        debug!("Unmatched base keys: {}", unmatched_base_keys.len());

        MergeOutcome {
            table: Table::from_parts(headers, rows),
            unmatched_keys,
            unmatched_base_keys,
            matched_rows,
        }
    }

    /// Key to incoming row index, plus distinct keys in first-seen order and
    /// the number of rows whose key was already taken.
    fn build_lookup<I>(&self, incoming: &Table, incoming_key: &I) -> (HashMap<MatchKey, usize>, Vec<MatchKey>, usize)
    where
        I: Fn(&Row) -> Option<MatchKey>,
    {
        let mut lookup = HashMap::with_capacity(incoming.len());
        let mut order = Vec::new();
        let mut duplicates = 0;

        for (idx, row) in incoming.rows().iter().enumerate() {
            let Some(key) = incoming_key(row) else {
                continue;
            };
            match lookup.get_mut(&key) {
                Some(existing) => {
                    duplicates += 1;
                    if self.duplicate_policy == DuplicateKeyPolicy::LastWins {
                        *existing = idx;
                    }
                }
                None => {
                    order.push(key.clone());
                    lookup.insert(key, idx);
                }
            }
        }

        (lookup, order, duplicates)
    }

    fn warn_missing_append_columns(&self, incoming: &Table) {
        for column in &self.append_columns {
            if !incoming.has_column(column) {
                warn!("Append column '{}' is not present in the incoming table; values will be null", column);
            }
        }
    }
}
