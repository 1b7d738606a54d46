use anyhow::Result;
use std::path::PathBuf;

use metannot::contaminant::{removed_count, ContaminantFilter};

use super::config::read_contaminant_file;
use super::{load_table, save_table, Config};

/// Drop rows annotated with a contaminant
pub fn run(
    config: &Config,
    input: PathBuf,
    output: PathBuf,
    names: Vec<String>,
    list: Option<PathBuf>,
    column: Option<String>,
) -> Result<()> {
    let table = load_table(&input)?;

    let mut excluded = config.contaminant_names()?;
    excluded.extend(names);
    if let Some(list) = list {
        excluded.extend(read_contaminant_file(&list)?);
    }
    if excluded.is_empty() {
        anyhow::bail!("No contaminant names given (use --names, --list or [contaminants] in the config)");
    }

    let column = column
        .or_else(|| config.arbiter.output_column.clone())
        .unwrap_or_else(|| config.dereplication.annotation_column.clone());
    let filter = ContaminantFilter::new(&excluded).with_annotation_column(column);
    let filtered = filter.apply(&table);

    println!(
        "Removed {} of {} row(s) using {} contaminant name(s)",
        removed_count(&table, &filtered),
        table.len(),
        filter.len()
    );
    save_table(&filtered, &output, &[])
}
