//! # metannot - Metabolomics Feature Annotation
//!
//! `metannot` turns a raw LC-MS feature table into a curated list of annotated
//! features. It joins identification results from several upstream tools onto
//! the feature table, arbitrates between competing identifications, and
//! collapses repeated identifications of the same compound down to the single
//! best-measured feature.
//!
//! ## Key Features
//!
//! - **Key-based merging**: exact joins on feature identifiers and tolerance
//!   joins on rounded m/z, with explicit handling of duplicate incoming keys.
//!
//! - **Rule-table arbitration**: spectral-library hits and in-silico
//!   predictions are reconciled by an ordered set of evidence rules.
//!
//! - **Quality-driven dereplication**: replicate sample columns decide which
//!   feature of a compound is kept, using missing rate, QC precision and mean
//!   intensity.
//!
//! - **Immutable stages**: every transform returns a new table, so undo is a
//!   matter of keeping the previous value.
//!
//! ## Quick Start
//!
//! ```rust
//! use metannot::pipeline::{MergeSource, Pipeline, PipelineContext};
//! use metannot::table::{Row, Table};
//!
//! let features = Table::from_rows(vec![
//!     Row::new().with("ID", "1").with("MZ", 195.0877).with("RT", 3.1),
//!     Row::new().with("ID", "2").with("MZ", 138.0550).with("RT", 1.2),
//! ]);
//! let library = Table::from_rows(vec![
//!     Row::new().with("ID", "1").with("compoundName", "Caffeine"),
//! ]);
//!
//! let run = Pipeline::new(PipelineContext::default())
//!     .with_source(MergeSource::by_id("gnps", library, vec!["compoundName".into()]))
//!     .with_resolve(true)
//!     .run(features, "example");
//!
//! assert!(run.is_success());
//! assert_eq!(run.table().rows()[0].trimmed("Resolved_Annotation"), "Caffeine");
//! ```
//!
//! ## Architecture
//!
//! The core transforms are pure functions over [`table::Table`]:
//!
//! - [`merge`]: exact and tolerance joins
//! - [`arbiter`]: per-row annotation arbitration
//! - [`derep`]: annotation-group dereplication
//! - [`contaminant`]: exclusion-list filtering
//!
//! Around them sit [`contracts`] (required-column checks), [`pipeline`]
//! (snapshot sessions and the end-to-end runner), [`report`],
//! [`identification`] (external identification service contract) and [`io`]
//! (CSV/TSV/JSON reading and CSV export).

// Documentation lints - enforce complete documentation for publication
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

pub mod arbiter;
pub mod columns;
pub mod contaminant;
pub mod contracts;
pub mod derep;
pub mod error;
pub mod identification;
pub mod io;
pub mod merge;
pub mod pipeline;
pub mod report;
pub mod table;

/// Crate version recorded in processing history.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::arbiter::{AnnotationArbiter, ArbiterThresholds, ResolutionRule, SourceColumns};
    pub use crate::contaminant::ContaminantFilter;
    pub use crate::contracts::{prepare_base_import, BaseColumns};
    pub use crate::derep::{
        DereplicationConfig, DereplicationEngine, DereplicationOutcome, DereplicationStatus,
        DereplicationSummary, InsufficientQcPolicy,
    };
    pub use crate::error::{CoreError, Result};
    pub use crate::identification::{
        IdentificationRequest, IdentificationResponse, IdentificationService,
    };
    pub use crate::io::{read_table, write_csv, TableIoError};
    pub use crate::merge::{DuplicateKeyPolicy, MergeOutcome, TableMerger};
    pub use crate::pipeline::{MergeSource, Pipeline, PipelineContext, PipelineRun, Session};
    pub use crate::report::{RunReport, RunStep};
    pub use crate::table::{CellValue, Row, Table};
}
