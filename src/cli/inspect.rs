use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use metannot::derep::SampleColumns;
use metannot::table::Table;

use super::{load_table, Config};

/// Table overview printed by `inspect`.
#[derive(Debug, Serialize)]
struct TableSummary {
    file: String,
    rows: usize,
    columns: Vec<String>,
    biological_columns: Vec<String>,
    qc_columns: Vec<String>,
    annotated_rows: usize,
    distinct_annotations: usize,
    statuses: BTreeMap<String, usize>,
}

/// Summarize a feature table
pub fn run(config: &Config, file: PathBuf, json: bool) -> Result<()> {
    let table = load_table(&file)?;
    let summary = summarize(&table, config, file.display().to_string());

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Feature Table Information");
    println!("=========================");
    println!("File: {}", summary.file);
    println!();
    println!("Rows:    {}", summary.rows);
    println!("Columns: {}", summary.columns.len());
    for (i, column) in summary.columns.iter().enumerate() {
        println!("  {:3}. {}", i + 1, column);
    }
    println!();
    println!("Biological sample columns: {}", summary.biological_columns.len());
    println!("QC sample columns:         {}", summary.qc_columns.len());
    println!(
        "Annotated rows:            {} ({} distinct)",
        summary.annotated_rows, summary.distinct_annotations
    );
    if !summary.statuses.is_empty() {
        println!();
        println!("Dereplication status:");
        for (status, count) in &summary.statuses {
            println!("  {:<22} {}", status, count);
        }
    }
    Ok(())
}

fn summarize(table: &Table, config: &Config, file: String) -> TableSummary {
    let settings = &config.dereplication;
    let annotation = config
        .arbiter
        .output_column
        .as_deref()
        .unwrap_or(&settings.annotation_column);

    // Classification errors just mean the table is not ready for dereplication
    let (biological_columns, qc_columns) = match SampleColumns::classify(table, settings) {
        Ok(samples) => (samples.biological, samples.qc),
        Err(_) => (Vec::new(), Vec::new()),
    };

    let annotations: Vec<String> = table.rows().iter().filter_map(|r| r.key(annotation)).collect();
    let distinct: std::collections::HashSet<&str> = annotations.iter().map(String::as_str).collect();

    let mut statuses = BTreeMap::new();
    for row in table.rows() {
        if let Some(status) = row.key(&settings.status_column) {
            *statuses.entry(status).or_insert(0) += 1;
        }
    }

    TableSummary {
        file,
        rows: table.len(),
        columns: table.headers().to_vec(),
        biological_columns,
        qc_columns,
        annotated_rows: annotations.len(),
        distinct_annotations: distinct.len(),
        statuses,
    }
}
