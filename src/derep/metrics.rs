//! Quality metrics computed from replicate sample columns.
//!
//! These values only drive winner selection. They are never written back to
//! the table.

use crate::table::Row;

/// Percentage of biological columns without a positive value, in `[0, 100]`.
///
/// A table with no biological columns reports 100.
pub fn missing_rate<S: AsRef<str>>(row: &Row, biological: &[S]) -> f64 {
    if biological.is_empty() {
        return 100.0;
    }
    let positive = positive_values(row, biological).count();
    100.0 * (1.0 - positive as f64 / biological.len() as f64)
}

/// Mean of the positive biological values, 0 when there are none.
pub fn average_intensity<S: AsRef<str>>(row: &Row, biological: &[S]) -> f64 {
    mean(&positive_values(row, biological).collect::<Vec<_>>()).unwrap_or(0.0)
}

/// QC replicate stability of one row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QcStability {
    /// Fewer positive QC values than required
    Insufficient {
        /// Positive values found
        found: usize,
    },
    /// Mean of the QC values is zero, which marks the row unstable.
    ///
    /// Unreachable from [`qc_stability`], which only averages positive values.
    ZeroMean,
    /// Relative standard deviation in percent
    Rsd(f64),
}

/// RSD (percent, sample standard deviation) of the positive QC values.
pub fn qc_stability<S: AsRef<str>>(row: &Row, qc: &[S], min_values: usize) -> QcStability {
    let values: Vec<f64> = positive_values(row, qc).collect();
    if values.len() < min_values.max(2) {
        return QcStability::Insufficient { found: values.len() };
    }
    let Some(mean) = mean(&values) else {
        return QcStability::Insufficient { found: 0 };
    };
    // never true for positive values
    if mean == 0.0 {
        return QcStability::ZeroMean;
    }
    let sd = sample_std_dev(&values, mean);
    QcStability::Rsd(100.0 * sd / mean)
}

/// A group member that passed both quality filters.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityCandidate {
    /// Row position in the input table
    pub index: usize,
    /// Missing rate in percent
    pub missing_rate: f64,
    /// QC RSD in percent, `None` when too few QC values existed
    pub qc_rsd: Option<f64>,
    /// Mean positive biological intensity
    pub avg_intensity: f64,
}

impl QualityCandidate {
    /// RSD used for ranking; an undefined RSD ranks as perfectly stable.
    pub fn ranking_rsd(&self) -> f64 {
        self.qc_rsd.unwrap_or(0.0)
    }
}

/// Pick the winner among surviving candidates, returning its slice position.
///
/// Candidates whose RSD is not below `min RSD + window` are dropped; among the
/// rest the highest average intensity wins and ties go to the earliest.
pub fn select_winner(candidates: &[QualityCandidate], window: f64) -> Option<usize> {
    match candidates.len() {
        0 => return None,
        1 => return Some(0),
        _ => {}
    }

    let min_rsd = candidates
        .iter()
        .map(QualityCandidate::ranking_rsd)
        .fold(f64::INFINITY, f64::min);
    let cutoff = min_rsd + window;

    let mut best: Option<usize> = None;
    for (pos, candidate) in candidates.iter().enumerate() {
        if candidate.ranking_rsd() >= cutoff {
            continue;
        }
        match best {
            Some(b) if candidates[b].avg_intensity >= candidate.avg_intensity => {}
            _ => best = Some(pos),
        }
    }
    best
}

fn positive_values<'a, S: AsRef<str>>(row: &'a Row, columns: &'a [S]) -> impl Iterator<Item = f64> + 'a {
    columns
        .iter()
        .filter_map(move |c| row.number(c.as_ref()))
        .filter(|v| *v > 0.0)
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn sample_std_dev(values: &[f64], mean: f64) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (ss / (n - 1) as f64).sqrt()
}
