use super::*;
use crate::table::Row;
use crate::error::CoreError;

const STATUS: &str = "Dereplication_Status";

fn feature(id: &str, annotation: &str, bio: &[f64], qc: &[f64]) -> Row {
    let mut row = Row::new().with("ID", id).with("Resolved_Annotation", annotation);
    for (i, v) in bio.iter().enumerate() {
        row.set(format!("Sample_{}", i + 1), *v);
    }
    for (i, v) in qc.iter().enumerate() {
        row.set(format!("QC_{}", i + 1), *v);
    }
    row
}

fn table(rows: Vec<Row>) -> Table {
    let mut headers = vec!["ID".to_string(), "Resolved_Annotation".to_string()];
    let bio = rows
        .iter()
        .flat_map(|r| r.columns().filter(|c| c.starts_with("Sample_")).map(str::to_string).collect::<Vec<_>>())
        .max_by_key(|c| c.clone());
    let qc = rows
        .iter()
        .flat_map(|r| r.columns().filter(|c| c.starts_with("QC_")).map(str::to_string).collect::<Vec<_>>())
        .max_by_key(|c| c.clone());
    let count = |last: Option<String>, prefix: &str| {
        last.and_then(|c| c.trim_start_matches(prefix).parse::<usize>().ok())
            .unwrap_or(0)
    };
    for i in 1..=count(bio, "Sample_") {
        headers.push(format!("Sample_{i}"));
    }
    for i in 1..=count(qc, "QC_") {
        headers.push(format!("QC_{i}"));
    }
    Table::new(headers, rows).unwrap()
}

fn statuses(outcome: &DereplicationOutcome) -> Vec<(String, String)> {
    outcome
        .table
        .rows()
        .iter()
        .map(|r| (r.trimmed("ID"), r.trimmed(STATUS)))
        .collect()
}

fn run(rows: Vec<Row>) -> DereplicationOutcome {
    DereplicationEngine::default().run(&table(rows)).unwrap()
}

#[test]
fn test_rsd_window_and_intensity_pick_winner() {
    // QC RSDs 5, 6 and 40; mean intensities 50, 80 and 10
    let outcome = run(vec![
        feature("1", "Caffeine", &[50.0, 50.0], &[95.0, 100.0, 105.0]),
        feature("2", "Caffeine", &[80.0, 80.0], &[94.0, 100.0, 106.0]),
        feature("3", "Caffeine", &[10.0, 10.0], &[60.0, 100.0, 140.0]),
    ]);

    assert_eq!(
        statuses(&outcome),
        vec![
            ("1".into(), "Removed".into()),
            ("2".into(), "Retained".into()),
            ("3".into(), "Excluded_Unstable_QC".into()),
        ]
    );
    assert_eq!(outcome.summary.contested_groups, 1);
    assert_eq!(outcome.summary.excluded_unstable_qc, 1);
}

#[test]
fn test_high_missing_rate_is_excluded() {
    // 4 biological columns with a single positive value: 75% missing
    let outcome = run(vec![
        feature("1", "Adenine", &[500.0, 0.0, 0.0, 0.0], &[100.0, 100.0]),
        feature("2", "Adenine", &[20.0, 20.0, 20.0, 20.0], &[100.0, 101.0]),
    ]);
    let rows = outcome.table.rows();
    assert_eq!(rows[0].trimmed(STATUS), "Excluded_High_Missing");
    assert_eq!(rows[1].trimmed(STATUS), "Retained");
}

#[test]
fn test_exactly_half_missing_is_kept() {
    let outcome = run(vec![
        feature("1", "Adenine", &[500.0, 500.0, 0.0, 0.0], &[100.0, 100.0]),
        feature("2", "Adenine", &[20.0, 20.0, 20.0, 20.0], &[100.0, 100.0]),
    ]);
    assert_eq!(outcome.table.rows()[0].trimmed(STATUS), "Retained");
}

#[test]
fn test_single_member_groups_are_retained_without_filtering() {
    // would fail both filters if it were contested
    let outcome = run(vec![feature("1", "Lonely", &[0.0, 0.0, 0.0], &[1.0, 100.0])]);
    assert_eq!(outcome.table.rows()[0].trimmed(STATUS), "Retained");
}

#[test]
fn test_unannotated_rows_bypass_and_are_retained() {
    let outcome = run(vec![
        feature("1", "", &[0.0, 0.0], &[1.0, 1.0]),
        feature("2", "X", &[5.0, 5.0], &[1.0, 1.0]),
        Row::new().with("ID", "3").with("Sample_1", 1.0).with("Sample_2", 1.0),
    ]);
    let got = statuses(&outcome);
    assert_eq!(got[0], ("1".into(), "Retained".into()));
    assert_eq!(got[2], ("3".into(), "Retained".into()));
    assert_eq!(outcome.summary.unannotated, 2);
}

#[test]
fn test_group_without_survivors_is_all_removed() {
    let outcome = run(vec![
        feature("1", "Noise", &[1.0, 0.0, 0.0], &[100.0, 100.0]),
        feature("2", "Noise", &[5.0, 5.0, 5.0], &[10.0, 100.0]),
    ]);
    assert_eq!(
        statuses(&outcome),
        vec![("1".into(), "Removed".into()), ("2".into(), "Removed".into())]
    );
    assert_eq!(outcome.summary.groups_without_winner, 1);
}

#[test]
fn test_insufficient_qc_ranks_as_most_stable() {
    let outcome = run(vec![
        feature("1", "Betaine", &[900.0, 900.0], &[97.0, 100.0, 103.0]),
        feature("2", "Betaine", &[100.0, 100.0], &[100.0, 0.0, 0.0]),
    ]);
    // row 1 has RSD 3, outside the 0 + 2 window opened by row 2
    assert_eq!(outcome.table.rows()[1].trimmed(STATUS), "Retained");
    assert_eq!(outcome.table.rows()[0].trimmed(STATUS), "Removed");
}

#[test]
fn test_insufficient_qc_can_be_excluded() {
    let config = DereplicationConfig {
        insufficient_qc: InsufficientQcPolicy::Exclude,
        ..DereplicationConfig::default()
    };
    let input = table(vec![
        feature("1", "Betaine", &[900.0, 900.0], &[97.0, 100.0, 103.0]),
        feature("2", "Betaine", &[100.0, 100.0], &[100.0, 0.0, 0.0]),
    ]);
    let outcome = DereplicationEngine::new(config).run(&input).unwrap();
    assert_eq!(outcome.table.rows()[0].trimmed(STATUS), "Retained");
    assert_eq!(outcome.table.rows()[1].trimmed(STATUS), "Excluded_Unstable_QC");
}

#[test]
fn test_intensity_tie_goes_to_earlier_row() {
    let outcome = run(vec![
        feature("1", "Other", &[1.0, 1.0], &[100.0, 100.0]),
        feature("2", "Tie", &[40.0, 40.0], &[100.0, 101.0]),
        feature("3", "Tie", &[40.0, 40.0], &[100.0, 100.0]),
    ]);
    let got = statuses(&outcome);
    assert_eq!(got[1], ("2".into(), "Retained".into()));
    assert_eq!(got[2], ("3".into(), "Removed".into()));
}

#[test]
fn test_original_order_is_restored_across_interleaved_groups() {
    let outcome = run(vec![
        feature("10", "B", &[1.0, 1.0], &[10.0, 10.0]),
        feature("20", "A", &[1.0, 1.0], &[10.0, 10.0]),
        feature("30", "", &[1.0, 1.0], &[10.0, 10.0]),
        feature("40", "B", &[2.0, 2.0], &[10.0, 10.0]),
        feature("50", "A", &[2.0, 2.0], &[10.0, 10.0]),
    ]);
    let ids: Vec<String> = outcome.table.column_values("ID").map(|v| v.to_string()).collect();
    assert_eq!(ids, vec!["10", "20", "30", "40", "50"]);
}

#[test]
fn test_rows_without_identifier_sort_last() {
    let mut rows = vec![
        feature("", "A", &[1.0, 1.0], &[10.0, 10.0]),
        feature("2", "A", &[2.0, 2.0], &[10.0, 10.0]),
    ];
    rows.push(feature("3", "B", &[2.0, 2.0], &[10.0, 10.0]));
    let outcome = run(rows);
    let ids: Vec<String> = outcome.table.rows().iter().map(|r| r.trimmed("ID")).collect();
    assert_eq!(ids, vec!["2", "3", ""]);
}

#[test]
fn test_output_adds_only_status_column() {
    let input = table(vec![
        feature("1", "A", &[1.0, 1.0], &[10.0, 10.0]),
        feature("2", "A", &[2.0, 2.0], &[10.0, 11.0]),
    ]);
    let outcome = DereplicationEngine::default().run(&input).unwrap();
    let mut expected = input.headers().to_vec();
    expected.push(STATUS.to_string());
    assert_eq!(outcome.table.headers(), expected.as_slice());
    // input is untouched
    assert!(!input.has_column(STATUS));
}

#[test]
fn test_missing_identifier_column_is_fatal() {
    let input = Table::from_rows(vec![Row::new()
        .with("Resolved_Annotation", "A")
        .with("Sample_1", 1.0)
        .with("QC_1", 1.0)]);
    let err = DereplicationEngine::default().run(&input).unwrap_err();
    assert!(matches!(err, CoreError::Configuration(_)));
}

#[test]
fn test_missing_sample_columns_are_fatal() {
    let no_qc = Table::from_rows(vec![Row::new().with("ID", "1").with("Sample_1", 1.0)]);
    let err = DereplicationEngine::default().run(&no_qc).unwrap_err();
    assert!(err.to_string().contains("QC"));

    let no_bio = Table::from_rows(vec![Row::new().with("ID", "1").with("QC_1", 1.0)]);
    let err = DereplicationEngine::default().run(&no_bio).unwrap_err();
    assert!(err.to_string().contains("biological"));
}

#[test]
fn test_qc_columns_are_not_biological() {
    let config = DereplicationConfig {
        biological_prefixes: vec!["Q".to_string()],
        ..DereplicationConfig::default()
    };
    let input = Table::from_rows(vec![Row::new()
        .with("ID", "1")
        .with("QC_1", 1.0)
        .with("Q_bio", 1.0)]);
    let samples = SampleColumns::classify(&input, &config).unwrap();
    assert_eq!(samples.biological, vec!["Q_bio"]);
    assert_eq!(samples.qc, vec!["QC_1"]);
}

#[test]
fn test_invalid_thresholds_are_rejected() {
    let config = DereplicationConfig {
        max_missing_rate: 150.0,
        ..DereplicationConfig::default()
    };
    let input = table(vec![feature("1", "A", &[1.0], &[1.0])]);
    let err = DereplicationEngine::new(config).run(&input).unwrap_err();
    assert!(matches!(err, CoreError::InvalidParameter(_)));
}

#[test]
fn test_status_round_trips_through_labels() {
    for label in DereplicationStatus::variants() {
        let status: DereplicationStatus = label.parse().unwrap();
        assert_eq!(status.as_str(), *label);
    }
}

#[test]
fn test_zero_and_negative_qc_values_are_insufficient() {
    let row = Row::new().with("QC_1", 0.0).with("QC_2", -3.0).with("QC_3", 0.0);
    let qc = ["QC_1", "QC_2", "QC_3"];
    assert_eq!(
        metrics::qc_stability(&row, &qc[..], 2),
        QcStability::Insufficient { found: 0 }
    );
}
