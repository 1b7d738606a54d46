//! # Identification Service Contract
//!
//! Types exchanged with an external compound identification service, plus the
//! conversion of its answers into a table that can be merged by identifier.
//!
//! The service itself is opaque. Callers implement [`IdentificationService`]
//! for whatever backend they use; the engine only consumes the output fields.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::table::{append_headers, Row, Table};

/// Output column holding the proposed compound name.
pub const AI_COMPOUND_NAME: &str = "AI_Compound_Name";
/// Output column holding the confidence label.
pub const AI_CONFIDENCE: &str = "AI_Confidence";
/// Output column holding the free-text reasoning.
pub const AI_REASONING: &str = "AI_Reasoning";
/// Output column holding the molecular formula.
pub const AI_MOLECULAR_FORMULA: &str = "AI_Molecular_Formula";
/// Output column holding the structure string (SMILES or similar).
pub const AI_STRUCTURE: &str = "AI_Structure";

/// Errors from building requests or calling a service.
#[derive(Debug, thiserror::Error)]
pub enum IdentificationError {
    /// Peak list could not be parsed
    #[error("Malformed peak list: {0}")]
    MalformedPeaks(String),

    /// Row lacks a usable precursor m/z
    #[error("Missing precursor m/z in column '{0}'")]
    MissingPrecursor(String),

    /// Service reported a failure
    #[error("Identification service failed: {0}")]
    Service(String),
}

/// One fragment peak.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    /// Fragment m/z
    pub mz: f64,
    /// Fragment intensity, when reported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intensity: Option<f64>,
}

/// Query sent to the identification service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentificationRequest {
    /// Precursor m/z
    pub precursor_mz: f64,
    /// Fragment peaks in input order
    pub peaks: Vec<Peak>,
}

impl IdentificationRequest {
    /// Build a request from one feature row.
    ///
    /// The peaks column holds whitespace- or comma-separated entries of the
    /// form `mz:intensity` or bare `mz`. An empty peaks cell gives an empty list.
    pub fn from_row(
        row: &Row,
        mz_column: &str,
        peaks_column: &str,
    ) -> Result<Self, IdentificationError> {
        let precursor_mz = row
            .number(mz_column)
            .ok_or_else(|| IdentificationError::MissingPrecursor(mz_column.to_string()))?;
        let peaks = match row.key(peaks_column) {
            Some(text) => parse_peaks(&text)?,
            None => Vec::new(),
        };
        Ok(Self { precursor_mz, peaks })
    }
}

/// Parse `"mz:intensity mz ..."` into peaks.
pub fn parse_peaks(text: &str) -> Result<Vec<Peak>, IdentificationError> {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (mz, intensity) = match entry.split_once(':') {
                Some((mz, intensity)) => (mz, Some(intensity)),
                None => (entry, None),
            };
            let parse = |s: &str| {
                s.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| IdentificationError::MalformedPeaks(entry.to_string()))
            };
            Ok(Peak {
                mz: parse(mz)?,
                intensity: intensity.map(parse).transpose()?,
            })
        })
        .collect()
}

/// Confidence reported by the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Confidence {
    /// Strong evidence
    High,
    /// Partial evidence
    Medium,
    /// Weak evidence
    Low,
    /// No usable evidence
    #[default]
    Uncertain,
}

impl Confidence {
    /// Label written to the output table.
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "High",
            Confidence::Medium => "Medium",
            Confidence::Low => "Low",
            Confidence::Uncertain => "Uncertain",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Confidence {
    type Err = IdentificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(Confidence::High),
            "medium" => Ok(Confidence::Medium),
            "low" => Ok(Confidence::Low),
            "uncertain" => Ok(Confidence::Uncertain),
            other => Err(IdentificationError::Service(format!(
                "unknown confidence '{}'",
                other
            ))),
        }
    }
}

/// Answer from the identification service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentificationResponse {
    /// Proposed compound name
    pub compound_name: String,
    /// Confidence label
    #[serde(default)]
    pub confidence: Confidence,
    /// Free-text justification
    #[serde(default)]
    pub reasoning: String,
    /// Molecular formula, if proposed
    #[serde(default)]
    pub molecular_formula: Option<String>,
    /// Structure string, if proposed
    #[serde(default)]
    pub structural_string: Option<String>,
}

/// Seam for external identification backends.
pub trait IdentificationService {
    /// Identify one spectrum.
    fn identify(
        &self,
        request: &IdentificationRequest,
    ) -> Result<IdentificationResponse, IdentificationError>;
}

/// Turn `(id, response)` pairs into a table keyed by `id_column`.
///
/// The result can be joined onto a feature table with
/// [`TableMerger::merge_exact`](crate::merge::TableMerger::merge_exact).
pub fn responses_to_table(id_column: &str, responses: &[(String, IdentificationResponse)]) -> Table {
    let rows = responses
        .iter()
        .map(|(id, response)| {
            Row::new()
                .with(id_column, id.as_str())
                .with(AI_COMPOUND_NAME, response.compound_name.as_str())
                .with(AI_CONFIDENCE, response.confidence.as_str())
                .with(AI_REASONING, response.reasoning.as_str())
                .with(AI_MOLECULAR_FORMULA, response.molecular_formula.clone())
                .with(AI_STRUCTURE, response.structural_string.clone())
        })
        .collect();

    let mut headers = vec![id_column.to_string()];
    append_headers(&mut headers, output_columns());
    Table::from_parts(headers, rows)
}

/// Columns produced by [`responses_to_table`] besides the identifier.
pub fn output_columns() -> &'static [&'static str] {
    &[
        AI_COMPOUND_NAME,
        AI_CONFIDENCE,
        AI_REASONING,
        AI_MOLECULAR_FORMULA,
        AI_STRUCTURE,
    ]
}

/// Call `service` for every row that has a precursor m/z.
///
/// Rows that cannot form a request are skipped with a warning; a service
/// failure aborts the whole batch.
pub fn identify_table<S: IdentificationService + ?Sized>(
    service: &S,
    table: &Table,
    id_column: &str,
    mz_column: &str,
    peaks_column: &str,
) -> Result<Table, IdentificationError> {
    let mut responses = Vec::new();
    for row in table.rows() {
        let Some(id) = row.key(id_column) else {
            continue;
        };
        let request = match IdentificationRequest::from_row(row, mz_column, peaks_column) {
            Ok(request) => request,
            Err(e) => {
                log::warn!("Skipping feature {}: {}", id, e);
                continue;
            }
        };
        responses.push((id, service.identify(&request)?));
    }
    log::info!("Identified {} of {} feature(s)", responses.len(), table.len());
    Ok(responses_to_table(id_column, &responses))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::TableMerger;

    struct FixedService;

    impl IdentificationService for FixedService {
        fn identify(
            &self,
            request: &IdentificationRequest,
        ) -> Result<IdentificationResponse, IdentificationError> {
            Ok(IdentificationResponse {
                compound_name: format!("M{:.0}", request.precursor_mz),
                confidence: if request.peaks.is_empty() {
                    Confidence::Low
                } else {
                    Confidence::High
                },
                reasoning: format!("{} peak(s)", request.peaks.len()),
                molecular_formula: None,
                structural_string: None,
            })
        }
    }

    #[test]
    fn test_parse_peaks_with_and_without_intensity() {
        let peaks = parse_peaks("100.5:20 150.25, 200:1e3").unwrap();
        assert_eq!(
            peaks,
            vec![
                Peak { mz: 100.5, intensity: Some(20.0) },
                Peak { mz: 150.25, intensity: None },
                Peak { mz: 200.0, intensity: Some(1000.0) },
            ]
        );
    }

    #[test]
    fn test_parse_peaks_rejects_garbage() {
        let err = parse_peaks("100:abc").unwrap_err();
        assert!(matches!(err, IdentificationError::MalformedPeaks(ref e) if e == "100:abc"));
    }

    #[test]
    fn test_request_from_row() {
        let row = Row::new().with("MZ", "301.14").with("Peaks", "85.03:100");
        let request = IdentificationRequest::from_row(&row, "MZ", "Peaks").unwrap();
        assert_eq!(request.precursor_mz, 301.14);
        assert_eq!(request.peaks.len(), 1);

        let missing = Row::new().with("Peaks", "85.03:100");
        assert!(IdentificationRequest::from_row(&missing, "MZ", "Peaks").is_err());
    }

    #[test]
    fn test_response_deserializes_from_service_json() {
        let json = r#"{"compoundName":"Caffeine","confidence":"High","reasoning":"m/z 195","molecularFormula":"C8H10N4O2"}"#;
        let response: IdentificationResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.confidence, Confidence::High);
        assert_eq!(response.molecular_formula.as_deref(), Some("C8H10N4O2"));
        assert_eq!(response.structural_string, None);
    }

    #[test]
    fn test_responses_merge_by_identifier() {
        let base = Table::from_rows(vec![
            Row::new().with("ID", "1").with("MZ", 195.0).with("Peaks", "138:40"),
            Row::new().with("ID", "2").with("MZ", 181.0),
            Row::new().with("ID", "3"),
        ]);
        let answers = identify_table(&FixedService, &base, "ID", "MZ", "Peaks").unwrap();
        assert_eq!(answers.len(), 2);

        let merged = TableMerger::new(output_columns().iter().copied())
            .merge_exact(&base, &answers, "ID")
            .unwrap();
        let rows = merged.table.rows();
        assert_eq!(rows[0].trimmed(AI_COMPOUND_NAME), "M195");
        assert_eq!(rows[0].trimmed(AI_CONFIDENCE), "High");
        assert_eq!(rows[1].trimmed(AI_CONFIDENCE), "Low");
        assert!(rows[2].get(AI_COMPOUND_NAME).is_empty());
        assert!(rows[0].get(AI_STRUCTURE).is_empty());
    }

    #[test]
    fn test_confidence_parse_is_case_insensitive() {
        assert_eq!("medium".parse::<Confidence>().unwrap(), Confidence::Medium);
        assert!("sure".parse::<Confidence>().is_err());
    }
}
