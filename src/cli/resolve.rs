use anyhow::Result;
use std::collections::BTreeMap;
use std::path::PathBuf;

use metannot::table::CellValue;

use super::{load_table, save_table, Config};

/// Column receiving the fired rule with `--explain`.
const RULE_COLUMN: &str = "Resolution_Rule";

/// Arbitrate competing identifications into one annotation column
pub fn run(
    config: &Config,
    input: PathBuf,
    output: PathBuf,
    column: Option<String>,
    explain: bool,
) -> Result<()> {
    let table = load_table(&input)?;
    let arbiter = config.arbiter();
    let column = column
        .or_else(|| config.arbiter.output_column.clone())
        .unwrap_or_else(|| metannot::columns::RESOLVED_ANNOTATION.to_string());

    let mut resolved = arbiter.annotate(&table, &column);

    let mut rules: BTreeMap<String, usize> = BTreeMap::new();
    for row in table.rows() {
        *rules.entry(arbiter.decide(row).rule.to_string()).or_default() += 1;
    }
    println!("Resolved {} row(s) into '{}'", table.len(), column);
    for (rule, count) in &rules {
        println!("  {:<14} {}", rule, count);
    }

    if explain {
        resolved = resolved.with_column(RULE_COLUMN, |row| {
            CellValue::Text(arbiter.decide(row).rule.to_string())
        });
    }

    save_table(&resolved, &output, &[])
}
