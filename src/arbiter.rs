//! # Annotation Arbitration
//!
//! Resolves two competing identifications on one feature row into a single
//! compound label.
//!
//! - **Source A** is a spectral-library hit (FBMN) with match score, library
//!   quality tier, shared peak count and mass error.
//! - **Source B** is an in-silico prediction (Sirius) with a confidence score.
//!
//! Rules are evaluated in order and the first that applies wins:
//!
//! | # | Condition | Result |
//! |---|-----------|--------|
//! | 1 | both names empty | `""` |
//! | 2 | only A | A |
//! | 3 | only B | B |
//! | 4 | names equal ignoring case | A |
//! | 5 | A strong and B strong | B |
//! | 6 | only A strong | A |
//! | 7 | only B strong | B |
//! | 8 | otherwise | A |
//!
//! Any numeric evidence field that fails to parse makes its source weak.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::columns;
use crate::table::{CellValue, Row, Table};

/// Column names feeding the arbiter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceColumns {
    /// Source A compound name
    pub compound_name: String,
    /// Source A match score
    pub mq_score: String,
    /// Source A library quality tier
    pub library_quality: String,
    /// Source A shared peak count
    pub shared_peaks: String,
    /// Source A mass error (ppm)
    pub mz_error_ppm: String,
    /// Source B compound name
    pub name: String,
    /// Source B confidence score
    pub confidence_score: String,
}

impl Default for SourceColumns {
    fn default() -> Self {
        Self {
            compound_name: columns::COMPOUND_NAME.to_string(),
            mq_score: columns::MQ_SCORE.to_string(),
            library_quality: columns::LIBRARY_QUALITY.to_string(),
            shared_peaks: columns::SHARED_PEAKS.to_string(),
            mz_error_ppm: columns::MZ_ERROR_PPM.to_string(),
            name: columns::NAME.to_string(),
            confidence_score: columns::CONFIDENCE_SCORE.to_string(),
        }
    }
}

/// Evidence thresholds. Comparisons are strict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbiterThresholds {
    /// Source A is strong only above this match score
    pub min_mq_score: f64,
    /// Required library quality tier
    pub library_quality: String,
    /// Source A is strong only above this shared peak count
    pub min_shared_peaks: f64,
    /// Source A is strong only below this absolute ppm error
    pub max_abs_mz_error_ppm: f64,
    /// Source B is strong only above this confidence
    pub min_confidence: f64,
}

impl Default for ArbiterThresholds {
    fn default() -> Self {
        Self {
            min_mq_score: 0.9,
            library_quality: "Gold".to_string(),
            min_shared_peaks: 10.0,
            max_abs_mz_error_ppm: 5.0,
            min_confidence: 0.8,
        }
    }
}

/// Which rule produced a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolutionRule {
    /// Neither source has a name
    BothEmpty,
    /// Only source A has a name
    SourceAOnly,
    /// Only source B has a name
    SourceBOnly,
    /// Both names agree ignoring case
    Agreement,
    /// Both sources carry strong evidence; B is preferred
    BothStrong,
    /// Only source A carries strong evidence
    StrongA,
    /// Only source B carries strong evidence
    StrongB,
    /// Neither is strong; A is the default
    DefaultA,
}

impl fmt::Display for ResolutionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResolutionRule::BothEmpty => "both-empty",
            ResolutionRule::SourceAOnly => "source-a-only",
            ResolutionRule::SourceBOnly => "source-b-only",
            ResolutionRule::Agreement => "agreement",
            ResolutionRule::BothStrong => "both-strong",
            ResolutionRule::StrongA => "strong-a",
            ResolutionRule::StrongB => "strong-b",
            ResolutionRule::DefaultA => "default-a",
        };
        f.write_str(name)
    }
}

/// Label plus the rule that chose it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// Resolved compound label, possibly empty
    pub label: String,
    /// Rule that fired
    pub rule: ResolutionRule,
}

/// Rule-table resolver for competing identifications.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationArbiter {
    /// Input column names
    #[serde(default)]
    pub columns: SourceColumns,
    /// Evidence thresholds
    #[serde(default)]
    pub thresholds: ArbiterThresholds,
}

impl AnnotationArbiter {
    /// Arbiter with default column names and thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the input column names.
    pub fn with_columns(mut self, columns: SourceColumns) -> Self {
        self.columns = columns;
        self
    }

    /// Replace the evidence thresholds.
    pub fn with_thresholds(mut self, thresholds: ArbiterThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Resolve one row to a label. Never fails.
    pub fn resolve(&self, row: &Row) -> String {
        self.decide(row).label
    }

    /// Resolve one row and report which rule fired.
    pub fn decide(&self, row: &Row) -> Decision {
        let a = row.trimmed(&self.columns.compound_name);
        let b = row.trimmed(&self.columns.name);

        let (label, rule) = match (a.is_empty(), b.is_empty()) {
            (true, true) => (String::new(), ResolutionRule::BothEmpty),
            (false, true) => (a, ResolutionRule::SourceAOnly),
            (true, false) => (b, ResolutionRule::SourceBOnly),
            (false, false) if a.to_lowercase() == b.to_lowercase() => (a, ResolutionRule::Agreement),
            (false, false) => match (self.is_strong_a(row), self.is_strong_b(row)) {
                (true, true) => (b, ResolutionRule::BothStrong),
                (true, false) => (a, ResolutionRule::StrongA),
                (false, true) => (b, ResolutionRule::StrongB),
                (false, false) => (a, ResolutionRule::DefaultA),
            },
        };

        Decision { label, rule }
    }

    /// Apply [`resolve`](Self::resolve) to every row, writing `output_column`.
    pub fn annotate(&self, table: &Table, output_column: &str) -> Table {
        let annotated = table.with_column(output_column, |row| {
            let label = self.resolve(row);
            if label.is_empty() {
                CellValue::Null
            } else {
                CellValue::Text(label)
            }
        });
        log::info!(
            "Resolved annotations for {} row(s) into '{}'",
            annotated.len(),
            output_column
        );
        annotated
    }

    fn is_strong_a(&self, row: &Row) -> bool {
        let t = &self.thresholds;
        let (Some(mq), Some(peaks), Some(ppm)) = (
            row.number(&self.columns.mq_score),
            row.number(&self.columns.shared_peaks),
            row.number(&self.columns.mz_error_ppm),
        ) else {
            return false;
        };
        mq > t.min_mq_score
            && row.trimmed(&self.columns.library_quality) == t.library_quality
            && peaks > t.min_shared_peaks
            && ppm.abs() < t.max_abs_mz_error_ppm
    }

    fn is_strong_b(&self, row: &Row) -> bool {
        row.number(&self.columns.confidence_score)
            .is_some_and(|c| c > self.thresholds.min_confidence)
    }
}
