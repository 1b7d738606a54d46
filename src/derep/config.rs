use serde::{Deserialize, Serialize};

use crate::columns;
use crate::error::{CoreError, Result};
use crate::table::Table;

/// What to do with a row that has fewer valid QC values than required.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InsufficientQcPolicy {
    /// Pass the QC filter with an undefined RSD, ranked as the most stable
    #[default]
    Favorable,
    /// Mark the row `ExcludedUnstableQC`
    Exclude,
}

/// Settings for [`DereplicationEngine`](super::DereplicationEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DereplicationConfig {
    /// Feature identifier column
    pub id_column: String,
    /// Resolved annotation column that defines the groups
    pub annotation_column: String,
    /// Column receiving the per-row status
    pub status_column: String,
    /// Case-insensitive prefixes of biological sample columns
    pub biological_prefixes: Vec<String>,
    /// Case-insensitive prefix of QC sample columns
    pub qc_prefix: String,
    /// Rows above this missing rate (percent) are excluded
    pub max_missing_rate: f64,
    /// Rows above this QC RSD (percent) are excluded
    pub max_qc_rsd: f64,
    /// Candidates must have RSD strictly below `min RSD + rsd_window`
    pub rsd_window: f64,
    /// Positive QC values needed to compute an RSD
    pub min_qc_values: usize,
    /// Handling of rows below `min_qc_values`
    pub insufficient_qc: InsufficientQcPolicy,
}

impl Default for DereplicationConfig {
    fn default() -> Self {
        Self {
            id_column: columns::ID.to_string(),
            annotation_column: columns::RESOLVED_ANNOTATION.to_string(),
            status_column: columns::DEREPLICATION_STATUS.to_string(),
            biological_prefixes: columns::BIOLOGICAL_PREFIXES
                .iter()
                .map(|p| p.to_string())
                .collect(),
            qc_prefix: columns::QC_PREFIX.to_string(),
            max_missing_rate: 50.0,
            max_qc_rsd: 30.0,
            rsd_window: 2.0,
            min_qc_values: 2,
            insufficient_qc: InsufficientQcPolicy::default(),
        }
    }
}

impl DereplicationConfig {
    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.max_missing_rate) {
            return Err(CoreError::InvalidParameter(format!(
                "max_missing_rate must be between 0 and 100, got {}",
                self.max_missing_rate
            )));
        }
        if !(self.max_qc_rsd >= 0.0) {
            return Err(CoreError::InvalidParameter(format!(
                "max_qc_rsd must be non-negative, got {}",
                self.max_qc_rsd
            )));
        }
        if !(self.rsd_window > 0.0) {
            return Err(CoreError::InvalidParameter(format!(
                "rsd_window must be positive, got {}",
                self.rsd_window
            )));
        }
        // sample standard deviation needs two values
        if self.min_qc_values < 2 {
            return Err(CoreError::InvalidParameter(format!(
                "min_qc_values must be at least 2, got {}",
                self.min_qc_values
            )));
        }
        if self.qc_prefix.is_empty() || self.biological_prefixes.iter().any(|p| p.is_empty()) {
            return Err(CoreError::InvalidParameter(
                "Sample column prefixes must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Biological and QC sample columns of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleColumns {
    /// Biological sample columns in table order
    pub biological: Vec<String>,
    /// QC sample columns in table order
    pub qc: Vec<String>,
}

impl SampleColumns {
    /// Classify headers by prefix. QC columns are never biological.
    ///
    /// Fails when either class is empty.
    pub fn classify(table: &Table, config: &DereplicationConfig) -> Result<Self> {
        let is_qc = |h: &str| columns::has_prefix_ignore_case(h, &config.qc_prefix);
        let qc = table.headers_where(is_qc);
        let biological = table.headers_where(|h| {
            !is_qc(h)
                && config
                    .biological_prefixes
                    .iter()
                    .any(|p| columns::has_prefix_ignore_case(h, p))
        });

        if biological.is_empty() {
            return Err(CoreError::Configuration(format!(
                "No biological sample columns found (expected a header starting with one of: {})",
                config.biological_prefixes.join(", ")
            )));
        }
        if qc.is_empty() {
            return Err(CoreError::Configuration(format!(
                "No QC sample columns found (expected a header starting with '{}')",
                config.qc_prefix
            )));
        }

        Ok(Self { biological, qc })
    }
}
