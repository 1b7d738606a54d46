//! # Annotation Pipeline
//!
//! Runs the stages end to end over one base feature table:
//!
//! 1. **Import**: required-column contract, deriving ID/m/z/RT from a label
//!    column when needed
//! 2. **Merge**: one join per annotation source, exact or by tolerance
//! 3. **Resolve**: arbitration into a single annotation column
//! 4. **Dereplicate**: one retained feature per annotation
//! 5. **Filter**: contaminant removal
//!
//! Every stage runs through a [`Session`], so each intermediate table is kept
//! and the caller can step back. Settings live in an immutable
//! [`PipelineContext`] handed in at construction; nothing is global.
//!
//! A failing stage stops the run. The failure is recorded in the
//! [`RunReport`] and the session still holds every table produced before it.

mod history;
mod session;


use log::{info, warn};

use crate::arbiter::AnnotationArbiter;
use crate::columns;
use crate::contaminant::{removed_count, ContaminantFilter};
use crate::contracts::{self, BaseColumns};
use crate::derep::{DereplicationConfig, DereplicationEngine, DereplicationSummary};
use crate::error::CoreError;
use crate::merge::{DuplicateKeyPolicy, MergeOutcome, TableMerger, DEFAULT_PRECISION};
use crate::report::{RunReport, RunStep};
use crate::table::Table;

pub use history::{parameters, ProcessingHistory, ProcessingStep};
pub use session::{Session, Snapshot};

/// Unmatched keys listed in a warning before the rest are elided.
const MAX_LISTED_KEYS: usize = 5;

/// How an annotation source is joined onto the base table.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinKind {
    /// Trimmed string equality on one column present in both tables
    Exact {
        /// Key column
        key: String,
    },
    /// Numeric equality after rounding both sides
    Tolerance {
        /// Mass column of the base table
        base_key: String,
        /// Mass column of the incoming table
        incoming_key: String,
    },
}

/// An annotation table to merge onto the base.
#[derive(Debug, Clone)]
pub struct MergeSource {
    /// Short name used in reports, e.g. `gnps`
    pub name: String,
    /// Incoming table
    pub table: Table,
    /// Join key
    pub join: JoinKind,
    /// Columns copied from matched rows
    pub append_columns: Vec<String>,
}

impl MergeSource {
    /// Source joined on the feature identifier.
    pub fn by_id(name: impl Into<String>, table: Table, append_columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            table,
            join: JoinKind::Exact {
                key: columns::ID.to_string(),
            },
            append_columns,
        }
    }

    /// Source joined on the given key kind.
    pub fn new(name: impl Into<String>, table: Table, join: JoinKind, append_columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            table,
            join,
            append_columns,
        }
    }
}

/// Immutable settings shared by every stage of a run.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    /// Base-table column names
    pub base_columns: BaseColumns,
    /// Decimals kept by tolerance joins
    pub precision: u32,
    /// Duplicate incoming key handling
    pub duplicate_policy: DuplicateKeyPolicy,
    /// Arbitration rules
    pub arbiter: AnnotationArbiter,
    /// Column receiving the resolved annotation
    pub resolved_column: String,
    /// Dereplication settings; groups always come from `resolved_column`
    pub dereplication: DereplicationConfig,
    /// Contaminant list; empty skips the filter stage
    pub contaminants: Vec<String>,
}

impl Default for PipelineContext {
    fn default() -> Self {
        Self {
            base_columns: BaseColumns::default(),
            precision: DEFAULT_PRECISION,
            duplicate_policy: DuplicateKeyPolicy::default(),
            arbiter: AnnotationArbiter::default(),
            resolved_column: columns::RESOLVED_ANNOTATION.to_string(),
            dereplication: DereplicationConfig::default(),
            contaminants: Vec::new(),
        }
    }
}

impl PipelineContext {
    /// Merger for one source under these settings.
    pub fn merger(&self, source: &MergeSource) -> TableMerger {
        TableMerger::new(source.append_columns.iter().cloned())
            .with_duplicate_policy(self.duplicate_policy)
            .with_precision(self.precision)
    }

    /// Dereplication settings grouping on the resolved annotation column.
    pub fn dereplication_config(&self) -> DereplicationConfig {
        DereplicationConfig {
            annotation_column: self.resolved_column.clone(),
            ..self.dereplication.clone()
        }
    }

    /// Contaminant filter reading the resolved annotation column.
    pub fn contaminant_filter(&self) -> ContaminantFilter {
        ContaminantFilter::new(&self.contaminants).with_annotation_column(self.resolved_column.clone())
    }
}

/// Everything a run produced.
#[derive(Debug)]
pub struct PipelineRun {
    /// Snapshot history; the current table is the final output
    pub session: Session,
    /// Per-stage report
    pub report: RunReport,
    /// Audit trail of successful stages
    pub history: ProcessingHistory,
    /// Dereplication counts, when that stage ran
    pub dereplication: Option<DereplicationSummary>,
}

impl PipelineRun {
    /// True when no stage failed.
    pub fn is_success(&self) -> bool {
        !self.report.has_failures()
    }

    /// Final table.
    pub fn table(&self) -> &Table {
        self.session.current()
    }
}

/// Configurable end-to-end runner.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    context: PipelineContext,
    sources: Vec<MergeSource>,
    resolve: bool,
    dereplicate: bool,
}

impl Pipeline {
    /// Pipeline with no stages beyond import.
    pub fn new(context: PipelineContext) -> Self {
        Self {
            context,
            sources: Vec::new(),
            resolve: false,
            dereplicate: false,
        }
    }

    /// Add an annotation source; sources merge in the order added.
    pub fn with_source(mut self, source: MergeSource) -> Self {
        self.sources.push(source);
        self
    }

    /// Enable or disable the resolve stage.
    pub fn with_resolve(mut self, enabled: bool) -> Self {
        self.resolve = enabled;
        self
    }

    /// Enable or disable the dereplication stage.
    pub fn with_dereplication(mut self, enabled: bool) -> Self {
        self.dereplicate = enabled;
        self
    }

    /// Settings in use.
    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    /// Run every enabled stage over `base`.
    ///
    /// `source` names the input in the report. Stage failures are reported,
    /// not returned; check [`PipelineRun::is_success`].
    pub fn run(&self, base: Table, source: impl Into<String>) -> PipelineRun {
        let ctx = &self.context;
        let mut report = RunReport::new(source);
        let mut history = ProcessingHistory::new();
        let mut dereplication = None;

        let rows_in = base.len();
        let mut session = Session::with_stage("input", base);
        let imported = session.apply("import", |t| contracts::prepare_base_import(t, &ctx.base_columns));
        if !record(&mut report, &mut history, "import", rows_in, imported, Vec::new()) {
            return PipelineRun { session, report, history, dereplication };
        }

        for src in &self.sources {
            let stage = format!("merge:{}", src.name);
            let merger = ctx.merger(src);
            let rows_in = session.current().len();
            let mut diagnostics = None;

            let merged = session.apply(stage.as_str(), |t| -> Result<Table, CoreError> {
                let outcome = match &src.join {
                    JoinKind::Exact { key } => merger.merge_exact(t, &src.table, key)?,
                    JoinKind::Tolerance { base_key, incoming_key } => {
                        merger.merge_tolerance(t, &src.table, base_key, incoming_key)?
                    }
                };
                diagnostics = Some(merge_warning(&outcome));
                Ok(outcome.table)
            });

            let params = match &src.join {
                JoinKind::Exact { key } => vec![("join".to_string(), "exact".to_string()), ("key".into(), key.clone())],
                JoinKind::Tolerance { base_key, incoming_key } => vec![
                    ("join".to_string(), "tolerance".to_string()),
                    ("key".into(), format!("{}={}", base_key, incoming_key)),
                    ("precision".into(), ctx.precision.to_string()),
                ],
            };
            let ok = match (merged, diagnostics.flatten()) {
                (Ok(table), Some(message)) => {
                    let rows = table.len();
                    warn!("{}: {}", stage, message);
                    report.add_step(RunStep::warning(&stage, message).with_rows(rows));
                    history.record(&stage, rows_in, rows, parameters(params));
                    true
                }
                (merged, _) => record(&mut report, &mut history, &stage, rows_in, merged, params),
            };
            if !ok {
                return PipelineRun { session, report, history, dereplication };
            }
        }

        if self.resolve {
            let rows_in = session.current().len();
            let resolved = session.apply("resolve", |t| {
                Ok::<_, CoreError>(ctx.arbiter.annotate(t, &ctx.resolved_column))
            });
            let params = vec![("output".to_string(), ctx.resolved_column.clone())];
            if !record(&mut report, &mut history, "resolve", rows_in, resolved, params) {
                return PipelineRun { session, report, history, dereplication };
            }
        }

        if self.dereplicate {
            let engine = DereplicationEngine::new(ctx.dereplication_config());
            let rows_in = session.current().len();
            let derep = session.apply("dereplicate", |t| {
                engine.run(t).map(|outcome| {
                    dereplication = Some(outcome.summary);
                    outcome.table
                })
            });
            let params = vec![
                ("max_missing_rate".to_string(), ctx.dereplication.max_missing_rate.to_string()),
                ("max_qc_rsd".to_string(), ctx.dereplication.max_qc_rsd.to_string()),
                ("rsd_window".to_string(), ctx.dereplication.rsd_window.to_string()),
            ];
            if !record(&mut report, &mut history, "dereplicate", rows_in, derep, params) {
                return PipelineRun { session, report, history, dereplication };
            }
        }

        if !ctx.contaminants.is_empty() {
            let filter = ctx.contaminant_filter();
            let rows_in = session.current().len();
            let filtered = session.apply("filter", |t| Ok::<_, CoreError>(filter.apply(t)));
            let params = vec![("excluded_names".to_string(), filter.len().to_string())];
            record(&mut report, &mut history, "filter", rows_in, filtered, params);
        }

        info!(
            "Pipeline finished: {} row(s), {} stage(s)",
            session.current().len(),
            history.steps.len()
        );
        PipelineRun { session, report, history, dereplication }
    }
}

/// Report a stage outcome; returns false when it failed.
fn record(
    report: &mut RunReport,
    history: &mut ProcessingHistory,
    stage: &str,
    rows_in: usize,
    outcome: Result<&Table, CoreError>,
    params: Vec<(String, String)>,
) -> bool {
    match outcome {
        Ok(table) => {
            report.add_step(RunStep::ok(stage).with_rows(table.len()));
            history.record(stage, rows_in, table.len(), parameters(params));
            true
        }
        Err(e) => {
            log::error!("{} failed: {}", stage, e);
            report.add_step(RunStep::failed(stage, e.to_string()));
            false
        }
    }
}

/// Warning text for a merge with unmatched incoming keys.
fn merge_warning(outcome: &MergeOutcome) -> Option<String> {
    if outcome.unmatched_keys.is_empty() {
        return None;
    }
    let listed: Vec<&str> = outcome
        .unmatched_keys
        .iter()
        .take(MAX_LISTED_KEYS)
        .map(String::as_str)
        .collect();
    let more = outcome.unmatched_keys.len().saturating_sub(MAX_LISTED_KEYS);
    let suffix = if more > 0 { format!(" (+{} more)", more) } else { String::new() };
    Some(format!(
        "{} unmatched incoming key(s): {}{}",
        outcome.unmatched_keys.len(),
        listed.join(", "),
        suffix
    ))
}

/// Rows removed by the contaminant stage of a finished run.
pub fn filtered_rows(run: &PipelineRun) -> Option<usize> {
    let snapshots = run.session.snapshots();
    let pos = snapshots.iter().position(|s| s.stage == "filter")?;
    let before = snapshots.get(pos.checked_sub(1)?)?;
    Some(removed_count(&before.table, &snapshots[pos].table))
}
