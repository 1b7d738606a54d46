//! # Required-Column Contracts
//!
//! Checks run before any merge or dereplication stage so that a bad input is
//! rejected up front with every missing column named at once.
//!
//! The base feature table needs an identifier, an m/z and a retention-time
//! column. Exporters that pack all three into one label column (for example
//! `12_301.1412mz_5.32min`) are accepted too: the columns are derived by
//! splitting the label on separators and stripping the `mz`/`min` units.

use serde::{Deserialize, Serialize};

use crate::columns;
use crate::derep::{DereplicationConfig, SampleColumns};
use crate::error::{CoreError, Result};
use crate::table::{CellValue, Table};

/// Separators accepted inside a feature label.
const LABEL_SEPARATORS: &[char] = &['_', '@', '|', '/'];

/// Column names of the base feature table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseColumns {
    /// Feature identifier
    pub id: String,
    /// Feature m/z
    pub mz: String,
    /// Feature retention time
    pub rt: String,
    /// Combined label the other three can be derived from
    pub filename_pattern: String,
}

impl Default for BaseColumns {
    fn default() -> Self {
        Self {
            id: columns::ID.to_string(),
            mz: columns::MZ.to_string(),
            rt: columns::RT.to_string(),
            filename_pattern: columns::FILENAME_PATTERN.to_string(),
        }
    }
}

/// Parts recovered from one feature label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureLabel {
    /// Leading token
    pub id: Option<String>,
    /// Token tagged `mz`, else the second token
    pub mz: Option<f64>,
    /// Token tagged `min`, else the third token
    pub rt: Option<f64>,
}

/// Split `12_301.1412mz_5.32min` into its identifier, m/z and RT.
///
/// Unparseable parts are `None`.
pub fn parse_feature_label(label: &str) -> FeatureLabel {
    let tokens: Vec<&str> = label
        .split(|c: char| LABEL_SEPARATORS.contains(&c) || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .collect();

    let Some((first, rest)) = tokens.split_first() else {
        return FeatureLabel::default();
    };

    // Unit-tagged tokens win; untagged labels fall back to position
    let tagged = |unit: &str| rest.iter().find_map(|t| strip_unit(t, unit));
    let mz = tagged("mz").or_else(|| rest.first().copied());
    let rt = tagged("min").or_else(|| rest.get(1).copied());

    FeatureLabel {
        id: Some(first.to_string()),
        mz: mz.and_then(parse_number),
        rt: rt.and_then(parse_number),
    }
}

fn strip_unit<'a>(token: &'a str, unit: &str) -> Option<&'a str> {
    let split = token.len().checked_sub(unit.len())?;
    if token.is_char_boundary(split) && token[split..].eq_ignore_ascii_case(unit) {
        Some(&token[..split])
    } else {
        None
    }
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Validate the base table, deriving ID/m/z/RT from the label column if needed.
pub fn prepare_base_import(table: &Table, base: &BaseColumns) -> Result<Table> {
    let missing = table.missing_columns(&[base.id.as_str(), base.mz.as_str(), base.rt.as_str()]);
    if missing.is_empty() {
        return Ok(table.clone());
    }
    if !table.has_column(&base.filename_pattern) {
        return Err(CoreError::missing_columns(
            format!(
                "Base import (alternatively provide a '{}' column)",
                base.filename_pattern
            ),
            missing,
        ));
    }

    log::info!(
        "Deriving {} from '{}'",
        missing.join(", "),
        base.filename_pattern
    );

    let mut derived = table.clone();
    let labels: Vec<FeatureLabel> = table
        .column_values(&base.filename_pattern)
        .map(|v| v.as_key().map(|l| parse_feature_label(&l)).unwrap_or_default())
        .collect();

    for column in missing {
        let mut values = labels.iter();
        derived = derived.with_column(column, |_| {
            let label = values.next().cloned().unwrap_or_default();
            if column == base.id {
                CellValue::from(label.id)
            } else if column == base.mz {
                CellValue::from(label.mz)
            } else {
                CellValue::from(label.rt)
            }
        });
    }

    let unparsed = labels.iter().filter(|l| l.mz.is_none() || l.rt.is_none()).count();
    if unparsed > 0 {
        log::warn!("{} feature label(s) could not be fully parsed", unparsed);
    }
    Ok(derived)
}

/// ID joins need the key column on both sides.
///
/// Missing names are reported as `base:<name>` / `incoming:<name>`.
pub fn require_id_join(base: &Table, incoming: &Table, id_column: &str) -> Result<()> {
    require_join_keys("ID join", base, id_column, incoming, id_column)
}

/// Tolerance joins need the mass column on both sides.
///
/// Missing names are reported as `base:<name>` / `incoming:<name>`.
pub fn require_tolerance_join(
    base: &Table,
    incoming: &Table,
    base_mass_column: &str,
    incoming_mass_column: &str,
) -> Result<()> {
    require_join_keys("Tolerance join", base, base_mass_column, incoming, incoming_mass_column)
}

fn require_join_keys(
    context: &str,
    base: &Table,
    base_column: &str,
    incoming: &Table,
    incoming_column: &str,
) -> Result<()> {
    let mut missing = Vec::new();
    if !base.has_column(base_column) {
        missing.push(format!("base:{}", base_column));
    }
    if !incoming.has_column(incoming_column) {
        missing.push(format!("incoming:{}", incoming_column));
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(CoreError::missing_columns(context, missing))
    }
}

/// Dereplication needs an identifier plus biological and QC sample columns.
pub fn require_dereplication(table: &Table, config: &DereplicationConfig) -> Result<SampleColumns> {
    if !table.has_column(&config.id_column) {
        return Err(CoreError::Configuration(format!(
            "No identifier column '{}' found",
            config.id_column
        )));
    }
    SampleColumns::classify(table, config)
}
