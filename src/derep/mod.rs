//! # Dereplication
//!
//! Collapses repeated identifications of the same compound down to one
//! feature, using replicate sample columns to judge which feature measured the
//! compound best.
//!
//! ## Stages
//!
//! 1. **Grouping**: rows are grouped by trimmed resolved annotation. Rows
//!    without an annotation skip every later stage and are `Retained`.
//! 2. **Trivial groups**: a group with one row keeps it.
//! 3. **Missing rate**: rows with more than 50% of biological samples lacking
//!    a positive value are `ExcludedHighMissing`.
//! 4. **QC stability**: rows whose QC replicate RSD exceeds 30% are
//!    `ExcludedUnstableQC`. Rows with fewer than two positive QC values pass
//!    with an undefined RSD.
//! 5. **Winner selection**: survivors within 2 RSD points of the most stable
//!    survivor compete on mean biological intensity; ties go to the earlier
//!    row.
//! 6. **Status assignment**: the winner is `Retained`, other survivors are
//!    `Removed`, excluded rows keep their exclusion. A group without
//!    survivors is `Removed` entirely.
//! 7. **Reassembly**: rows are put back in input order, keyed by identifier.
//!
//! The output table has the input headers plus the status column. Quality
//! metrics are never written to it.

mod config;
pub mod metrics;
mod status;

#[cfg(test)]
mod tests;

use log::{debug, info};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::contracts;
use crate::error::Result;
use crate::table::{append_headers, CellValue, Table};

pub use config::{DereplicationConfig, InsufficientQcPolicy, SampleColumns};
pub use metrics::{QcStability, QualityCandidate};
pub use status::DereplicationStatus;

/// Counts gathered during one dereplication run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DereplicationSummary {
    /// Distinct non-empty annotations
    pub groups: usize,
    /// Groups with more than one row
    pub contested_groups: usize,
    /// Groups where no row survived the quality filters
    pub groups_without_winner: usize,
    /// Rows without an annotation
    pub unannotated: usize,
    /// Rows marked `Retained`
    pub retained: usize,
    /// Rows marked `Removed`
    pub removed: usize,
    /// Rows marked `ExcludedHighMissing`
    pub excluded_high_missing: usize,
    /// Rows marked `ExcludedUnstableQC`
    pub excluded_unstable_qc: usize,
}

impl DereplicationSummary {
    fn count(&mut self, status: DereplicationStatus) {
        match status {
            DereplicationStatus::Retained => self.retained += 1,
            DereplicationStatus::Removed => self.removed += 1,
            DereplicationStatus::ExcludedHighMissing => self.excluded_high_missing += 1,
            DereplicationStatus::ExcludedUnstableQC => self.excluded_unstable_qc += 1,
        }
    }
}

impl fmt::Display for DereplicationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Dereplication Summary")?;
        writeln!(f, "  Annotation groups:     {}", self.groups)?;
        writeln!(f, "  Contested groups:      {}", self.contested_groups)?;
        writeln!(f, "  Groups without winner: {}", self.groups_without_winner)?;
        writeln!(f, "  Unannotated rows:      {}", self.unannotated)?;
        writeln!(f, "  Retained:              {}", self.retained)?;
        writeln!(f, "  Removed:               {}", self.removed)?;
        writeln!(f, "  Excluded (missing):    {}", self.excluded_high_missing)?;
        writeln!(f, "  Excluded (QC):         {}", self.excluded_unstable_qc)?;
        Ok(())
    }
}

/// Result of [`DereplicationEngine::run`].
#[derive(Debug, Clone)]
pub struct DereplicationOutcome {
    /// Input rows in input order, plus the status column
    pub table: Table,
    /// Per-status counts
    pub summary: DereplicationSummary,
}

/// Annotation-group deduplication driven by replicate quality metrics.
#[derive(Debug, Clone, Default)]
pub struct DereplicationEngine {
    config: DereplicationConfig,
}

impl DereplicationEngine {
    /// Create an engine with the given settings.
    pub fn new(config: DereplicationConfig) -> Self {
        Self { config }
    }

    /// Active settings.
    pub fn config(&self) -> &DereplicationConfig {
        &self.config
    }

    /// Dereplicate `table`.
    ///
    /// Fails without producing anything when the identifier column is absent
    /// or no biological or QC sample columns can be found.
    pub fn run(&self, table: &Table) -> Result<DereplicationOutcome> {
        let cfg = &self.config;
        cfg.validate()?;

        let samples = contracts::require_dereplication(table, cfg)?;
        if !table.has_column(&cfg.annotation_column) {
            log::warn!(
                "Annotation column '{}' not found; every row is treated as unannotated",
                cfg.annotation_column
            );
        }
        debug!(
            "Dereplicating with {} biological and {} QC column(s)",
            samples.biological.len(),
            samples.qc.len()
        );

        let mut statuses: Vec<Option<DereplicationStatus>> = vec![None; table.len()];
        let mut summary = DereplicationSummary::default();

        // Groups in order of first appearance
        let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
        let mut group_index: HashMap<String, usize> = HashMap::new();
        let mut bypassed = Vec::new();

        for (idx, row) in table.rows().iter().enumerate() {
            match row.key(&cfg.annotation_column) {
                Some(annotation) => {
                    let slot = *group_index.entry(annotation.clone()).or_insert_with(|| {
                        groups.push((annotation, Vec::new()));
                        groups.len() - 1
                    });
                    groups[slot].1.push(idx);
                }
                None => {
                    statuses[idx] = Some(DereplicationStatus::Retained);
                    bypassed.push(idx);
                }
            }
        }

        summary.groups = groups.len();
        summary.unannotated = bypassed.len();

        for (annotation, members) in &groups {
            if members.len() > 1 {
                summary.contested_groups += 1;
            }
            let winner = self.resolve_group(table, members, &samples, &mut statuses);
            match winner {
                Some(idx) => debug!(
                    "Group '{}' ({} row(s)): row {} retained",
                    annotation,
                    members.len(),
                    idx
                ),
                None => {
                    summary.groups_without_winner += 1;
                    debug!("Group '{}' ({} row(s)): no survivor", annotation, members.len());
                }
            }
        }

        // Processed groups then bypassed rows, restored to input order by identifier
        let mut order: Vec<usize> = groups
            .iter()
            .flat_map(|(_, members)| members.iter().copied())
            .chain(bypassed)
            .collect();
        let positions = identifier_positions(table, &cfg.id_column);
        order.sort_by_key(|&idx| {
            let position = table.rows()[idx]
                .key(&cfg.id_column)
                .and_then(|id| positions.get(&id).copied())
                .unwrap_or(usize::MAX);
            (position, idx)
        });

        let rows = order
            .into_iter()
            .map(|idx| {
                let status = statuses[idx].unwrap_or(DereplicationStatus::Removed);
                summary.count(status);
                table.rows()[idx]
                    .clone()
                    .with(cfg.status_column.clone(), CellValue::from(status.as_str()))
            })
            .collect();

        let mut headers = table.headers().to_vec();
        append_headers(&mut headers, [&cfg.status_column]);

        info!(
            "Dereplication: {} group(s), {} retained, {} removed, {} excluded (missing), {} excluded (QC)",
            summary.groups,
            summary.retained,
            summary.removed,
            summary.excluded_high_missing,
            summary.excluded_unstable_qc
        );

        Ok(DereplicationOutcome {
            table: Table::from_parts(headers, rows),
            summary,
        })
    }

    /// Assign statuses for one group and return the winning row index.
    fn resolve_group(
        &self,
        table: &Table,
        members: &[usize],
        samples: &SampleColumns,
        statuses: &mut [Option<DereplicationStatus>],
    ) -> Option<usize> {
        let cfg = &self.config;

        if let [only] = members {
            statuses[*only] = Some(DereplicationStatus::Retained);
            return Some(*only);
        }

        let mut survivors = Vec::with_capacity(members.len());
        for &idx in members {
            let row = &table.rows()[idx];

            let missing = metrics::missing_rate(row, &samples.biological);
            if missing > cfg.max_missing_rate {
                statuses[idx] = Some(DereplicationStatus::ExcludedHighMissing);
                continue;
            }

            let qc_rsd = match metrics::qc_stability(row, &samples.qc, cfg.min_qc_values) {
                QcStability::Insufficient { .. } => match cfg.insufficient_qc {
                    InsufficientQcPolicy::Favorable => None,
                    InsufficientQcPolicy::Exclude => {
                        statuses[idx] = Some(DereplicationStatus::ExcludedUnstableQC);
                        continue;
                    }
                },
                QcStability::ZeroMean => {
                    statuses[idx] = Some(DereplicationStatus::ExcludedUnstableQC);
                    continue;
                }
                QcStability::Rsd(rsd) if rsd > cfg.max_qc_rsd => {
                    statuses[idx] = Some(DereplicationStatus::ExcludedUnstableQC);
                    continue;
                }
                QcStability::Rsd(rsd) => Some(rsd),
            };

            survivors.push(QualityCandidate {
                index: idx,
                missing_rate: missing,
                qc_rsd,
                avg_intensity: metrics::average_intensity(row, &samples.biological),
            });
        }

        let Some(pos) = metrics::select_winner(&survivors, cfg.rsd_window) else {
            for &idx in members {
                statuses[idx] = Some(DereplicationStatus::Removed);
            }
            return None;
        };

        let winner = survivors[pos].index;
        for candidate in &survivors {
            statuses[candidate.index] = Some(if candidate.index == winner {
                DereplicationStatus::Retained
            } else {
                DereplicationStatus::Removed
            });
        }
        Some(winner)
    }
}

/// First input position of every identifier.
fn identifier_positions(table: &Table, id_column: &str) -> HashMap<String, usize> {
    let mut positions = HashMap::with_capacity(table.len());
    for (idx, row) in table.rows().iter().enumerate() {
        if let Some(id) = row.key(id_column) {
            positions.entry(id).or_insert(idx);
        }
    }
    positions
}
