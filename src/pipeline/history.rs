use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Audit trail of the stages applied during a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingHistory {
    /// Applied stages in order
    pub steps: Vec<ProcessingStep>,
}

/// A single applied stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingStep {
    /// Step order (1-indexed)
    pub order: usize,

    /// Stage name
    pub stage: String,

    /// Software version that ran the stage
    pub version: String,

    /// RFC 3339 timestamp when the stage finished
    pub timestamp: String,

    /// Rows before the stage
    pub rows_in: usize,

    /// Rows after the stage
    pub rows_out: usize,

    /// Stage parameters
    pub parameters: BTreeMap<String, String>,
}

impl ProcessingHistory {
    /// Create a new empty processing history
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished stage, stamping order, version and time.
    pub fn record(
        &mut self,
        stage: impl Into<String>,
        rows_in: usize,
        rows_out: usize,
        parameters: BTreeMap<String, String>,
    ) {
        self.steps.push(ProcessingStep {
            order: self.steps.len() + 1,
            stage: stage.into(),
            version: crate::VERSION.to_string(),
            timestamp: Utc::now().to_rfc3339(),
            rows_in,
            rows_out,
            parameters,
        });
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Build a parameter map from `(name, value)` pairs.
pub fn parameters<I, K, V>(pairs: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: ToString,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.to_string()))
        .collect()
}
