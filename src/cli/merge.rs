use anyhow::{Context, Result};
use log::{info, warn};
use std::path::PathBuf;

use metannot::columns;
use metannot::merge::{DuplicateKeyPolicy, TableMerger};
use metannot::table::Table;

use super::{load_table, save_table, Config};

/// Unmatched keys printed before the list is cut short.
const PREVIEW_KEYS: usize = 10;

pub struct MergeArgs {
    pub base: PathBuf,
    pub incoming: PathBuf,
    pub output: PathBuf,
    pub key: Option<String>,
    pub tolerance: Option<String>,
    pub append: Vec<String>,
    pub precision: Option<u32>,
    pub duplicates: Option<DuplicateKeyPolicy>,
}

/// Join one annotation table onto a feature table
pub fn run(config: &Config, args: MergeArgs) -> Result<()> {
    let base = load_table(&args.base)?;
    let incoming = load_table(&args.incoming)?;

    let tolerance = args.tolerance.as_deref().map(parse_pair).transpose()?;
    let key = args.key.unwrap_or_else(|| columns::ID.to_string());
    let key_columns: Vec<&str> = match &tolerance {
        Some((_, incoming_key)) => vec![incoming_key.as_str()],
        None => vec![key.as_str()],
    };
    let append = if args.append.is_empty() {
        non_key_columns(&incoming, &key_columns)
    } else {
        args.append
    };
    info!("Appending {} column(s): {}", append.len(), append.join(", "));

    let mut merger = TableMerger::new(append)
        .with_duplicate_policy(
            args.duplicates
                .or(config.merge.duplicate_policy)
                .unwrap_or_default(),
        );
    if let Some(precision) = args.precision.or(config.merge.precision) {
        merger = merger.with_precision(precision);
    }

    let outcome = match &tolerance {
        Some((base_key, incoming_key)) => merger.merge_tolerance(&base, &incoming, base_key, incoming_key)?,
        None => merger.merge_exact(&base, &incoming, &key)?,
    };

    println!(
        "Matched {} of {} base row(s); {} incoming key(s) unmatched",
        outcome.matched_rows,
        base.len(),
        outcome.unmatched_keys.len()
    );
    if !outcome.unmatched_keys.is_empty() {
        let preview: Vec<&str> = outcome
            .unmatched_keys
            .iter()
            .take(PREVIEW_KEYS)
            .map(String::as_str)
            .collect();
        warn!("Unmatched incoming keys: {}", preview.join(", "));
    }

    save_table(&outcome.table, &args.output, &[])
}

/// Split `BASE=INCOMING`.
fn parse_pair(pair: &str) -> Result<(String, String)> {
    let (left, right) = pair
        .split_once('=')
        .with_context(|| format!("Expected BASE=INCOMING, got '{}'", pair))?;
    let (left, right) = (left.trim(), right.trim());
    if left.is_empty() || right.is_empty() {
        anyhow::bail!("Expected BASE=INCOMING, got '{}'", pair);
    }
    Ok((left.to_string(), right.to_string()))
}

/// Incoming headers other than the join key.
pub(super) fn non_key_columns(incoming: &Table, key_columns: &[&str]) -> Vec<String> {
    incoming.headers_where(|h| !key_columns.contains(&h))
}

#[cfg(test)]
mod tests {
    use super::*;
    use metannot::table::Row;

    #[test]
    fn test_parse_pair() {
        assert_eq!(parse_pair("MZ = ionMass").unwrap(), ("MZ".to_string(), "ionMass".to_string()));
        assert!(parse_pair("MZ").is_err());
        assert!(parse_pair("=ionMass").is_err());
    }

    #[test]
    fn test_non_key_columns() {
        let incoming = Table::from_rows(vec![Row::new().with("ID", "1").with("Name", "x")]);
        assert_eq!(non_key_columns(&incoming, &["ID"]), vec!["Name"]);
    }
}
