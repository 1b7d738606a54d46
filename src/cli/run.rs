use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

use metannot::pipeline::{filtered_rows, JoinKind, MergeSource, Pipeline};

use super::config::SourceConfig;
use super::merge::non_key_columns;
use super::{load_table, print_report, save_table, Config};

pub struct RunArgs {
    pub base: PathBuf,
    pub output: PathBuf,
    pub sources: Vec<String>,
    pub resolve: bool,
    pub dereplicate: bool,
    pub history: Option<PathBuf>,
    pub drop: Vec<String>,
}

/// Run the whole annotation pipeline
pub fn run(config: &Config, args: RunArgs) -> Result<()> {
    let context = config.to_context()?;
    let base = load_table(&args.base)?;

    let mut pipeline = Pipeline::new(context)
        .with_resolve(args.resolve)
        .with_dereplication(args.dereplicate);

    for source in &config.sources {
        pipeline = pipeline.with_source(load_source(source)?);
    }
    for entry in &args.sources {
        let (name, path) = entry
            .split_once('=')
            .with_context(|| format!("Expected NAME=PATH, got '{}'", entry))?;
        let source = SourceConfig {
            name: name.trim().to_string(),
            path: PathBuf::from(path.trim()),
            key: None,
            base_key: None,
            incoming_key: None,
            append: Vec::new(),
        };
        pipeline = pipeline.with_source(load_source(&source)?);
    }

    let run = pipeline.run(base, args.base.display().to_string());
    print_report(&run.report);
    if let Some(summary) = &run.dereplication {
        print!("{}", summary);
    }
    if let Some(removed) = filtered_rows(&run) {
        println!("Contaminant filter removed {} row(s)", removed);
    }

    if let Some(path) = &args.history {
        std::fs::write(path, run.history.to_json()?)
            .with_context(|| format!("Failed to write history: {}", path.display()))?;
        info!("Processing history written to {}", path.display());
    }

    if !run.is_success() {
        std::process::exit(1);
    }

    save_table(run.table(), &args.output, &args.drop)
}

/// Read a configured source and work out what to append.
fn load_source(source: &SourceConfig) -> Result<MergeSource> {
    let table = load_table(&source.path)?;
    let join = source.join()?;
    let append = if source.append.is_empty() {
        let key = match &join {
            JoinKind::Exact { key } => key.as_str(),
            JoinKind::Tolerance { incoming_key, .. } => incoming_key.as_str(),
        };
        non_key_columns(&table, &[key])
    } else {
        source.append.clone()
    };
    Ok(MergeSource::new(source.name.clone(), table, join, append))
}
