use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Per-row outcome of dereplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DereplicationStatus {
    /// Row is kept: group winner, single-member group, or unannotated
    Retained,
    /// Row lost to another member of its group
    Removed,
    /// Too many biological samples without signal
    ExcludedHighMissing,
    /// QC replicates too variable
    ExcludedUnstableQC,
}

impl DereplicationStatus {
    /// Label written to the status column.
    pub fn as_str(&self) -> &'static str {
        match self {
            DereplicationStatus::Retained => "Retained",
            DereplicationStatus::Removed => "Removed",
            DereplicationStatus::ExcludedHighMissing => "Excluded_High_Missing",
            DereplicationStatus::ExcludedUnstableQC => "Excluded_Unstable_QC",
        }
    }

    /// Whether the row survives into the dereplicated feature list.
    pub fn is_retained(&self) -> bool {
        matches!(self, DereplicationStatus::Retained)
    }

    /// Returns all status labels.
    pub fn variants() -> &'static [&'static str] {
        &["Retained", "Removed", "Excluded_High_Missing", "Excluded_Unstable_QC"]
    }
}

impl fmt::Display for DereplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DereplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Retained" => Ok(DereplicationStatus::Retained),
            "Removed" => Ok(DereplicationStatus::Removed),
            "Excluded_High_Missing" => Ok(DereplicationStatus::ExcludedHighMissing),
            "Excluded_Unstable_QC" => Ok(DereplicationStatus::ExcludedUnstableQC),
            other => Err(format!(
                "Unknown dereplication status '{}'. Valid options: {}",
                other,
                DereplicationStatus::variants().join(", ")
            )),
        }
    }
}
