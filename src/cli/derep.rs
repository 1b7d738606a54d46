use anyhow::Result;
use std::path::PathBuf;

use metannot::derep::{DereplicationEngine, DereplicationStatus, InsufficientQcPolicy};

use super::{load_table, save_table, Config};

pub struct DerepArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    pub max_missing: Option<f64>,
    pub max_rsd: Option<f64>,
    pub rsd_window: Option<f64>,
    pub qc_prefix: Option<String>,
    pub bio_prefix: Vec<String>,
    pub insufficient_qc: Option<InsufficientQcPolicy>,
    pub retained_only: bool,
    pub drop: Vec<String>,
}

/// Dereplicate an annotated feature table
pub fn run(config: &Config, args: DerepArgs) -> Result<()> {
    let table = load_table(&args.input)?;

    let mut settings = config.dereplication.clone();
    if let Some(column) = &config.arbiter.output_column {
        settings.annotation_column = column.clone();
    }
    if let Some(v) = args.max_missing {
        settings.max_missing_rate = v;
    }
    if let Some(v) = args.max_rsd {
        settings.max_qc_rsd = v;
    }
    if let Some(v) = args.rsd_window {
        settings.rsd_window = v;
    }
    if let Some(prefix) = args.qc_prefix {
        settings.qc_prefix = prefix;
    }
    if !args.bio_prefix.is_empty() {
        settings.biological_prefixes = args.bio_prefix;
    }
    if let Some(policy) = args.insufficient_qc {
        settings.insufficient_qc = policy;
    }

    let status_column = settings.status_column.clone();
    let outcome = DereplicationEngine::new(settings).run(&table)?;
    print!("{}", outcome.summary);

    let exported = if args.retained_only {
        let retained = DereplicationStatus::Retained.as_str();
        outcome
            .table
            .filter_rows(|row| row.trimmed(&status_column) == retained)
    } else {
        outcome.table
    };

    save_table(&exported, &args.output, &args.drop)
}
