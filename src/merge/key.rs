use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::table::Row;

/// Default number of decimals for tolerance joins.
pub const DEFAULT_PRECISION: u32 = 3;

/// Join key derived from one row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MatchKey {
    /// Trimmed textual key
    Exact(String),
    /// Number rounded to `precision` decimals, stored scaled as an integer
    Rounded {
        /// `round(value * 10^precision)`
        scaled: i64,
        /// Decimal digits kept
        precision: u32,
    },
}

impl MatchKey {
    /// Exact key from `column`, `None` when null or blank.
    pub fn exact(row: &Row, column: &str) -> Option<Self> {
        row.key(column).map(MatchKey::Exact)
    }

    /// Rounded key from `column`, `None` when the value is not numeric.
    pub fn rounded(row: &Row, column: &str, precision: u32) -> Option<Self> {
        let value = row.number(column)?;
        let scaled = (value * 10f64.powi(precision as i32)).round();
        if !scaled.is_finite() || scaled.abs() > i64::MAX as f64 {
            return None;
        }
        Some(MatchKey::Rounded {
            scaled: scaled as i64,
            precision,
        })
    }
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchKey::Exact(key) => f.write_str(key),
            MatchKey::Rounded { scaled, precision } => {
                let value = *scaled as f64 / 10f64.powi(*precision as i32);
                write!(f, "{:.*}", *precision as usize, value)
            }
        }
    }
}

/// Which incoming row wins when several share a key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicateKeyPolicy {
    /// The first row with a key is kept
    FirstWins,
    /// Later rows overwrite earlier ones
    #[default]
    LastWins,
}

impl DuplicateKeyPolicy {
    /// Returns all available policy names.
    pub fn variants() -> &'static [&'static str] {
        &["first-wins", "last-wins"]
    }
}

impl fmt::Display for DuplicateKeyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicateKeyPolicy::FirstWins => write!(f, "first-wins"),
            DuplicateKeyPolicy::LastWins => write!(f, "last-wins"),
        }
    }
}

impl FromStr for DuplicateKeyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "first-wins" | "first" => Ok(DuplicateKeyPolicy::FirstWins),
            "last-wins" | "last" => Ok(DuplicateKeyPolicy::LastWins),
            _ => Err(format!(
                "Unknown duplicate key policy '{}'. Valid options: {}",
                s,
                DuplicateKeyPolicy::variants().join(", ")
            )),
        }
    }
}
