//! TOML configuration file support.
//!
//! Every section is optional; command-line flags override file values.
//!
//! ```toml
//! # metannot.toml
//! [merge]
//! precision = 3
//! duplicate_policy = "last-wins"
//!
//! [arbiter]
//! min_mq_score = 0.9
//!
//! [dereplication]
//! qc_prefix = "QC"
//! biological_prefixes = ["Sample"]
//!
//! [contaminants]
//! names = ["Phthalate"]
//!
//! [[sources]]
//! name = "gnps"
//! path = "gnps.tsv"
//! key = "ID"
//! append = ["compoundName", "mqScore"]
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use metannot::arbiter::{AnnotationArbiter, ArbiterThresholds, SourceColumns};
use metannot::contaminant::parse_name_list;
use metannot::contracts::BaseColumns;
use metannot::derep::DereplicationConfig;
use metannot::merge::DuplicateKeyPolicy;
use metannot::pipeline::{JoinKind, PipelineContext};

/// Root configuration structure for metannot.toml files.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base feature table column names.
    pub base: BaseColumns,

    /// Merge settings.
    pub merge: MergeConfig,

    /// Arbitration thresholds and input columns.
    pub arbiter: ArbiterConfig,

    /// Dereplication settings.
    pub dereplication: DereplicationConfig,

    /// Contaminant exclusion list.
    pub contaminants: ContaminantConfig,

    /// Annotation sources merged by `run`.
    pub sources: Vec<SourceConfig>,
}

/// Configuration for merge stages.
#[derive(Debug, Default, Deserialize)]
pub struct MergeConfig {
    /// Decimals kept by tolerance joins.
    pub precision: Option<u32>,

    /// Which incoming row wins on duplicate keys.
    pub duplicate_policy: Option<DuplicateKeyPolicy>,
}

/// Configuration for the resolve stage.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ArbiterConfig {
    /// Evidence thresholds, given directly under `[arbiter]`.
    #[serde(flatten)]
    pub thresholds: ArbiterThresholds,

    /// Input column names, under `[arbiter.columns]`.
    pub columns: SourceColumns,

    /// Column receiving the resolved annotation.
    pub output_column: Option<String>,
}

/// Configuration for the contaminant filter.
#[derive(Debug, Default, Deserialize)]
pub struct ContaminantConfig {
    /// Inline names.
    #[serde(default)]
    pub names: Vec<String>,

    /// Newline-separated list file, merged with `names`.
    pub file: Option<PathBuf>,
}

/// One annotation source for `run`.
#[derive(Debug, Deserialize)]
pub struct SourceConfig {
    /// Short name shown in the report.
    pub name: String,

    /// Table to merge.
    pub path: PathBuf,

    /// Exact-join key column.
    pub key: Option<String>,

    /// Base mass column for tolerance joins.
    pub base_key: Option<String>,

    /// Incoming mass column for tolerance joins.
    pub incoming_key: Option<String>,

    /// Columns to copy; empty copies every non-key column.
    #[serde(default)]
    pub append: Vec<String>,
}

impl SourceConfig {
    /// Join kind described by the key fields.
    pub fn join(&self) -> Result<JoinKind> {
        match (&self.key, &self.base_key, &self.incoming_key) {
            (Some(key), None, None) => Ok(JoinKind::Exact { key: key.clone() }),
            (None, Some(base_key), Some(incoming_key)) => Ok(JoinKind::Tolerance {
                base_key: base_key.clone(),
                incoming_key: incoming_key.clone(),
            }),
            (None, None, None) => Ok(JoinKind::Exact {
                key: metannot::columns::ID.to_string(),
            }),
            _ => bail!(
                "Source '{}': set either `key`, or both `base_key` and `incoming_key`",
                self.name
            ),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }

    /// Load `path` when given, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Every configured contaminant name, reading the list file if set.
    pub fn contaminant_names(&self) -> Result<Vec<String>> {
        let mut names = self.contaminants.names.clone();
        if let Some(file) = &self.contaminants.file {
            names.extend(read_contaminant_file(file)?);
        }
        Ok(names)
    }

    /// Arbiter built from the `[arbiter]` section.
    pub fn arbiter(&self) -> AnnotationArbiter {
        AnnotationArbiter::new()
            .with_columns(self.arbiter.columns.clone())
            .with_thresholds(self.arbiter.thresholds.clone())
    }

    /// Immutable pipeline settings from this file.
    pub fn to_context(&self) -> Result<PipelineContext> {
        let defaults = PipelineContext::default();
        let mut dereplication = self.dereplication.clone();
        if let Some(column) = &self.arbiter.output_column {
            dereplication.annotation_column = column.clone();
        }
        Ok(PipelineContext {
            base_columns: self.base.clone(),
            precision: self.merge.precision.unwrap_or(defaults.precision),
            duplicate_policy: self.merge.duplicate_policy.unwrap_or_default(),
            arbiter: self.arbiter(),
            resolved_column: self
                .arbiter
                .output_column
                .clone()
                .unwrap_or(defaults.resolved_column),
            dereplication,
            contaminants: self.contaminant_names()?,
        })
    }
}

/// Read a newline-separated contaminant list.
pub fn read_contaminant_file(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read contaminant list: {}", path.display()))?;
    let names = parse_name_list(&content);
    log::debug!("Loaded {} contaminant name(s) from {}", names.len(), path.display());
    Ok(names)
}
