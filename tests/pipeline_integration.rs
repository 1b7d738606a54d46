//! Integration tests for metannot
//!
//! These tests drive the public API end to end: reading tables from disk,
//! merging annotation sources, arbitration, dereplication, filtering and
//! CSV export.

use metannot::arbiter::AnnotationArbiter;
use metannot::contaminant::ContaminantFilter;
use metannot::derep::{DereplicationConfig, DereplicationEngine, DereplicationStatus, InsufficientQcPolicy};
use metannot::io::{read_table, write_csv};
use metannot::merge::{DuplicateKeyPolicy, TableMerger};
use metannot::pipeline::{JoinKind, MergeSource, Pipeline, PipelineContext};
use metannot::table::{CellValue, Row, Table};
use std::fs;
use tempfile::tempdir;

fn status(table: &Table, idx: usize) -> String {
    table.rows()[idx].trimmed("Dereplication_Status")
}

/// Exact merge fills matched rows and leaves the rest null
#[test]
fn test_exact_merge_scenario() {
    let base = Table::from_rows(vec![Row::new().with("ID", "1"), Row::new().with("ID", "2")]);
    let incoming = Table::from_rows(vec![Row::new().with("ID", "2").with("Compound_Name", "X")]);

    let outcome = TableMerger::new(["Compound_Name"])
        .merge_exact(&base, &incoming, "ID")
        .unwrap();

    assert_eq!(outcome.table.len(), 2);
    assert_eq!(outcome.table.rows()[0].get("Compound_Name"), &CellValue::Null);
    assert_eq!(outcome.table.rows()[1].trimmed("Compound_Name"), "X");
    assert!(outcome.unmatched_keys.is_empty());
    assert_eq!(outcome.unmatched_base_keys, vec!["1"]);
}

/// Tolerance merge matches masses that round to the same value
#[test]
fn test_tolerance_merge_scenario() {
    let base = Table::from_rows(vec![Row::new().with("ID", "1").with("MZ", 100.1234)]);
    let incoming = Table::from_rows(vec![Row::new()
        .with("ionMass", 100.1228)
        .with("name", "Tyrosine")
        .with("confidenceScore", 0.93)]);

    let outcome = TableMerger::new(["name", "confidenceScore"])
        .merge_tolerance(&base, &incoming, "MZ", "ionMass")
        .unwrap();

    assert_eq!(outcome.matched_rows, 1);
    assert_eq!(outcome.table.rows()[0].trimmed("name"), "Tyrosine");
    assert_eq!(outcome.table.rows()[0].number("confidenceScore"), Some(0.93));
}

/// Duplicate incoming keys follow the configured policy
#[test]
fn test_duplicate_policy() {
    let base = Table::from_rows(vec![Row::new().with("ID", "7")]);
    let incoming = Table::from_rows(vec![
        Row::new().with("ID", "7").with("compoundName", "First"),
        Row::new().with("ID", "7").with("compoundName", "Second"),
    ]);

    let last = TableMerger::new(["compoundName"]).merge_exact(&base, &incoming, "ID").unwrap();
    assert_eq!(last.table.rows()[0].trimmed("compoundName"), "Second");

    let first = TableMerger::new(["compoundName"])
        .with_duplicate_policy(DuplicateKeyPolicy::FirstWins)
        .merge_exact(&base, &incoming, "ID")
        .unwrap();
    assert_eq!(first.table.rows()[0].trimmed("compoundName"), "First");
}

/// Unstable QC row is excluded; the most intense stable row wins
#[test]
fn test_dereplication_scenario() {
    // QC RSDs of about 5.7%, 6.4% and 42.4%
    let table = Table::from_rows(vec![
        Row::new()
            .with("ID", "1")
            .with("Resolved_Annotation", "Caffeine")
            .with("QC_1", 96.0)
            .with("QC_2", 104.0)
            .with("Sample_1", 50.0)
            .with("Sample_2", 50.0),
        Row::new()
            .with("ID", "2")
            .with("Resolved_Annotation", "Caffeine")
            .with("QC_1", 95.5)
            .with("QC_2", 104.5)
            .with("Sample_1", 80.0)
            .with("Sample_2", 80.0),
        Row::new()
            .with("ID", "3")
            .with("Resolved_Annotation", "Caffeine")
            .with("QC_1", 70.0)
            .with("QC_2", 130.0)
            .with("Sample_1", 10.0)
            .with("Sample_2", 10.0),
    ]);

    let outcome = DereplicationEngine::default().run(&table).unwrap();

    assert_eq!(status(&outcome.table, 0), "Removed");
    assert_eq!(status(&outcome.table, 1), "Retained");
    assert_eq!(status(&outcome.table, 2), "Excluded_Unstable_QC");
    assert_eq!(outcome.summary.retained, 1);
    assert_eq!(outcome.summary.excluded_unstable_qc, 1);
}

/// Three of four biological samples empty excludes the row
#[test]
fn test_missing_rate_scenario() {
    let row = |id: &str, values: [f64; 4]| {
        let mut row = Row::new()
            .with("ID", id)
            .with("Resolved_Annotation", "Glucose")
            .with("QC_1", 100.0)
            .with("QC_2", 101.0);
        for (i, v) in values.iter().enumerate() {
            row.set(format!("Sample_{}", i + 1), *v);
        }
        row
    };
    let table = Table::from_rows(vec![
        row("a", [0.0, 0.0, 500.0, 0.0]),
        row("b", [10.0, 12.0, 11.0, 9.0]),
    ]);

    let outcome = DereplicationEngine::default().run(&table).unwrap();
    assert_eq!(status(&outcome.table, 0), "Excluded_High_Missing");
    assert_eq!(status(&outcome.table, 1), "Retained");
}

/// The exclude policy turns thin QC coverage into an exclusion
#[test]
fn test_insufficient_qc_policy() {
    let table = Table::from_rows(vec![
        Row::new()
            .with("ID", "1")
            .with("Resolved_Annotation", "Alanine")
            .with("QC_1", 100.0)
            .with("Sample_1", 900.0),
        Row::new()
            .with("ID", "2")
            .with("Resolved_Annotation", "Alanine")
            .with("QC_1", 100.0)
            .with("QC_2", 102.0)
            .with("Sample_1", 100.0),
    ]);

    let favorable = DereplicationEngine::default().run(&table).unwrap();
    assert_eq!(status(&favorable.table, 0), "Retained");

    let strict = DereplicationEngine::new(DereplicationConfig {
        insufficient_qc: InsufficientQcPolicy::Exclude,
        ..Default::default()
    })
    .run(&table)
    .unwrap();
    assert_eq!(status(&strict.table, 0), "Excluded_Unstable_QC");
    assert_eq!(status(&strict.table, 1), "Retained");
}

/// CSV in, full pipeline, CSV out
#[test]
fn test_pipeline_from_files() {
    let dir = tempdir().unwrap();
    let features = dir.path().join("features.csv");
    let library = dir.path().join("gnps.tsv");
    let output = dir.path().join("curated.csv");

    fs::write(
        &features,
        "ID,MZ,RT,Sample_A,Sample_B,QC_1,QC_2\n\
         1,195.0877,3.1,1000,1100,500,510\n\
         2,195.0880,3.4,0,0,500,700\n\
         3,279.1591,7.9,300,320,200,204\n\
         4,138.0550,1.2,50,60,90,91\n",
    )
    .unwrap();
    fs::write(
        &library,
        "ID\tcompoundName\tmqScore\n\
         1\tCaffeine\t0.95\n\
         2\tCaffeine\t0.91\n\
         3\tDibutyl phthalate\t0.88\n\
         99\tGhost\t0.5\n",
    )
    .unwrap();

    let base = read_table(&features).unwrap();
    let gnps = read_table(&library).unwrap();

    let context = PipelineContext {
        contaminants: vec!["Dibutyl phthalate".to_string()],
        ..Default::default()
    };
    let run = Pipeline::new(context)
        .with_source(MergeSource::by_id("gnps", gnps, vec!["compoundName".into(), "mqScore".into()]))
        .with_resolve(true)
        .with_dereplication(true)
        .run(base, "features.csv");

    assert!(run.is_success());
    assert!(run.report.has_warnings());
    let stages: Vec<&str> = run.history.steps.iter().map(|s| s.stage.as_str()).collect();
    assert_eq!(stages, vec!["import", "merge:gnps", "resolve", "dereplicate", "filter"]);

    let summary = run.dereplication.as_ref().unwrap();
    assert_eq!(summary.groups, 2);
    assert_eq!(summary.unannotated, 1);

    let table = run.table();
    let ids: Vec<String> = table.rows().iter().map(|r| r.trimmed("ID")).collect();
    assert_eq!(ids, vec!["1", "2", "4"]);
    assert_eq!(table.rows()[0].trimmed("Dereplication_Status"), "Retained");
    assert_eq!(table.rows()[1].trimmed("Dereplication_Status"), "Excluded_High_Missing");

    write_csv(table, &output, &["mqScore"]).unwrap();
    let written = read_table(&output).unwrap();
    assert_eq!(written.len(), 3);
    assert!(!written.has_column("mqScore"));
    assert!(written.has_column("Resolved_Annotation"));
    assert_eq!(written.rows()[0].trimmed("Resolved_Annotation"), "Caffeine");
}

/// A tolerance source and a library source feed the arbiter together
#[test]
fn test_pipeline_arbitrates_two_sources() {
    let base = Table::from_rows(vec![
        Row::new().with("ID", "1").with("MZ", 182.0812).with("RT", 2.0),
        Row::new().with("ID", "2").with("MZ", 166.0863).with("RT", 4.0),
    ]);
    let library = Table::from_rows(vec![
        Row::new()
            .with("ID", "1")
            .with("compoundName", "Tyrosine")
            .with("mqScore", 0.95)
            .with("libraryQuality", "Gold")
            .with("sharedPeaks", 14.0)
            .with("mzErrorPpm", 1.2),
        Row::new().with("ID", "2").with("compoundName", "Unknown peptide").with("mqScore", 0.4),
    ]);
    let sirius = Table::from_rows(vec![
        Row::new().with("ionMass", 182.0809).with("name", "L-Tyrosine").with("confidenceScore", 0.5),
        Row::new().with("ionMass", 166.0861).with("name", "Phenylalanine").with("confidenceScore", 0.92),
    ]);

    let library_columns = ["compoundName", "mqScore", "libraryQuality", "sharedPeaks", "mzErrorPpm"];
    let run = Pipeline::new(PipelineContext::default())
        .with_source(MergeSource::by_id(
            "gnps",
            library,
            library_columns.iter().map(|c| c.to_string()).collect(),
        ))
        .with_source(MergeSource::new(
            "sirius",
            sirius,
            JoinKind::Tolerance {
                base_key: "MZ".into(),
                incoming_key: "ionMass".into(),
            },
            vec!["name".into(), "confidenceScore".into()],
        ))
        .with_resolve(true)
        .run(base, "memory");

    assert!(run.is_success());
    let table = run.table();
    // strong library hit beats a weak prediction
    assert_eq!(table.rows()[0].trimmed("Resolved_Annotation"), "Tyrosine");
    // confident prediction beats a weak library hit
    assert_eq!(table.rows()[1].trimmed("Resolved_Annotation"), "Phenylalanine");
}

/// A table without QC columns fails the dereplication stage but keeps earlier snapshots
#[test]
fn test_pipeline_stops_on_failed_stage() {
    let base = Table::from_rows(vec![Row::new()
        .with("ID", "1")
        .with("MZ", 100.0)
        .with("RT", 1.0)
        .with("Sample_1", 10.0)
        .with("compoundName", "Serine")]);

    let mut run = Pipeline::new(PipelineContext::default())
        .with_resolve(true)
        .with_dereplication(true)
        .run(base, "memory");

    assert!(!run.is_success());
    assert_eq!(run.report.failure_count(), 1);
    assert_eq!(run.session.stage(), "resolve");
    assert!(run.table().has_column("Resolved_Annotation"));
    assert!(run.session.undo());
    assert!(!run.table().has_column("Resolved_Annotation"));
}

/// Arbitration and filtering compose over plain tables
#[test]
fn test_resolve_then_filter() {
    let table = Table::from_rows(vec![
        Row::new().with("ID", "1").with("compoundName", "Erucamide"),
        Row::new().with("ID", "2").with("name", "Citrate"),
        Row::new().with("ID", "3"),
    ]);
    let resolved = AnnotationArbiter::new().annotate(&table, "Resolved_Annotation");
    let filtered = ContaminantFilter::from_lines("# slip agents\nErucamide\n").apply(&resolved);

    let ids: Vec<String> = filtered.rows().iter().map(|r| r.trimmed("ID")).collect();
    assert_eq!(ids, vec!["2", "3"]);
    assert_eq!(resolved.len(), 3);
}

/// Status labels parse back into statuses
#[test]
fn test_status_labels() {
    for label in DereplicationStatus::variants() {
        let status: DereplicationStatus = label.parse().unwrap();
        assert_eq!(status.as_str(), *label);
    }
    assert!("Kept".parse::<DereplicationStatus>().is_err());
}
