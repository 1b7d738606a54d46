//! Property-based tests for the table transforms

use metannot::contaminant::ContaminantFilter;
use metannot::derep::metrics::{missing_rate, select_winner, QualityCandidate};
use metannot::derep::DereplicationEngine;
use metannot::merge::TableMerger;
use metannot::table::{Row, Table};
use proptest::prelude::*;

const LABELS: &[&str] = &["Caffeine", "Glucose", "Citrate", "Erucamide"];

/// Rows with random annotations and sample values
fn feature_rows() -> impl Strategy<Value = Vec<(Option<usize>, [f64; 3], [f64; 2])>> {
    prop::collection::vec(
        (
            prop::option::of(0..LABELS.len()),
            prop::array::uniform3(0.0f64..1000.0),
            prop::array::uniform2(1.0f64..500.0),
        ),
        1..40,
    )
}

fn build_table(rows: &[(Option<usize>, [f64; 3], [f64; 2])]) -> Table {
    let rows = rows
        .iter()
        .enumerate()
        .map(|(i, (label, bio, qc))| {
            let mut row = Row::new().with("ID", i as i64);
            if let Some(label) = label {
                row.set("Resolved_Annotation", LABELS[*label]);
            }
            for (j, v) in bio.iter().enumerate() {
                row.set(format!("Sample_{}", j + 1), *v);
            }
            for (j, v) in qc.iter().enumerate() {
                row.set(format!("QC_{}", j + 1), *v);
            }
            row
        })
        .collect();
    Table::from_rows(rows)
}

proptest! {
    /// Output has the input rows in input order
    #[test]
    fn test_dereplication_preserves_order(rows in feature_rows()) {
        let table = build_table(&rows);
        let outcome = DereplicationEngine::default().run(&table).unwrap();

        prop_assert_eq!(outcome.table.len(), table.len());
        for (before, after) in table.rows().iter().zip(outcome.table.rows()) {
            prop_assert_eq!(before.trimmed("ID"), after.trimmed("ID"));
        }
    }

    /// Every annotation group keeps at most one row, single-member groups exactly one
    #[test]
    fn test_at_most_one_retained_per_group(rows in feature_rows()) {
        let table = build_table(&rows);
        let outcome = DereplicationEngine::default().run(&table).unwrap();

        for label in LABELS {
            let members: Vec<&Row> = outcome
                .table
                .rows()
                .iter()
                .filter(|r| r.trimmed("Resolved_Annotation") == *label)
                .collect();
            let retained = members
                .iter()
                .filter(|r| r.trimmed("Dereplication_Status") == "Retained")
                .count();
            prop_assert!(retained <= 1);
            if members.len() == 1 {
                prop_assert_eq!(retained, 1);
            }
        }

        for row in outcome.table.rows() {
            if row.trimmed("Resolved_Annotation").is_empty() {
                prop_assert_eq!(row.trimmed("Dereplication_Status"), "Retained");
            }
        }
    }

    /// Missing rate is a percentage
    #[test]
    fn test_missing_rate_bounds(values in prop::collection::vec(-10.0f64..10.0, 1..12)) {
        let columns: Vec<String> = (0..values.len()).map(|i| format!("Sample_{}", i)).collect();
        let mut row = Row::new();
        for (c, v) in columns.iter().zip(&values) {
            row.set(c.clone(), *v);
        }
        let rate = missing_rate(&row, &columns);
        prop_assert!((0.0..=100.0).contains(&rate));
    }

    /// Equal intensities go to the earliest candidate
    #[test]
    fn test_ties_go_to_earliest(count in 2usize..10, intensity in 1.0f64..1e6) {
        let candidates: Vec<QualityCandidate> = (0..count)
            .map(|index| QualityCandidate {
                index,
                missing_rate: 0.0,
                qc_rsd: Some(5.0),
                avg_intensity: intensity,
            })
            .collect();
        prop_assert_eq!(select_winner(&candidates, 2.0), Some(0));
    }

    /// Filtering twice removes nothing more
    #[test]
    fn test_contaminant_filter_idempotent(rows in feature_rows(), excluded in prop::collection::vec(0..LABELS.len(), 0..3)) {
        let table = build_table(&rows);
        let filter = ContaminantFilter::new(excluded.iter().map(|i| LABELS[*i]));

        let once = filter.apply(&table);
        let twice = filter.apply(&once);
        prop_assert_eq!(once.len(), twice.len());
        prop_assert!(once.rows().iter().all(|r| !filter.excludes(&r.trimmed("Resolved_Annotation"))));
    }

    /// Merging keeps base row count and order
    #[test]
    fn test_merge_preserves_base(rows in feature_rows(), keys in prop::collection::vec(0i64..60, 1..30)) {
        let base = build_table(&rows);
        let incoming = Table::from_rows(
            keys.iter()
                .map(|k| Row::new().with("ID", *k).with("compoundName", format!("C{}", k)))
                .collect(),
        );

        let outcome = TableMerger::new(["compoundName"]).merge_exact(&base, &incoming, "ID").unwrap();
        prop_assert_eq!(outcome.table.len(), base.len());
        for (before, after) in base.rows().iter().zip(outcome.table.rows()) {
            let id = before.trimmed("ID");
            prop_assert_eq!(&id, &after.trimmed("ID"));
            let name = after.trimmed("compoundName");
            let expected = format!("C{}", id);
            prop_assert!(name.is_empty() || name == expected);
        }
    }
}
