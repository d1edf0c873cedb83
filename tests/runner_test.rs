//! バッチ処理の統合テスト
//!
//! PDF処理はコピーするだけのスタンパーで置き換え、行単位の振る舞いを検証する

mod fixtures;

use fixtures::write_table;
use pdf_index_adder::{BatchRunner, CancelToken, PdfIndexError, Stamp, ERROR_LOG_NAME};
use pdf_index_common::RunEvent;
use std::path::Path;
use tempfile::tempdir;

/// 元ファイルの内容の後にラベルを付けて書き出す
struct CopyStamper;

impl Stamp for CopyStamper {
    fn stamp(&self, source: &Path, label: &str, destination: &Path) -> pdf_index_adder::Result<()> {
        let mut data = std::fs::read(source)?;
        data.extend_from_slice(label.as_bytes());
        std::fs::write(destination, data)?;
        Ok(())
    }
}

/// 内容が "broken" のファイルだけ失敗する
struct PickyStamper;

impl Stamp for PickyStamper {
    fn stamp(&self, source: &Path, label: &str, destination: &Path) -> pdf_index_adder::Result<()> {
        if std::fs::read(source)? == b"broken" {
            return Err(PdfIndexError::Stamp {
                file_name: source.file_name().unwrap().to_string_lossy().to_string(),
                detail: "invalid header".into(),
            });
        }
        CopyStamper.stamp(source, label, destination)
    }
}

fn collect_events<S: Stamp>(runner: &BatchRunner<S>, table: &Path, output: &Path) -> Vec<RunEvent> {
    let mut events = Vec::new();
    runner.run(table, output, |event| events.push(event));
    events
}

fn completed_report(events: &[RunEvent]) -> pdf_index_common::RunReport {
    match events.last() {
        Some(RunEvent::Completed { report, .. }) => report.clone(),
        other => panic!("expected Completed, got {:?}", other),
    }
}

#[test]
fn test_missing_file_row_is_logged_and_others_succeed() {
    let dir = tempdir().expect("Failed to create temp dir");
    for name in ["a.pdf", "b.pdf", "c.pdf"] {
        std::fs::write(dir.path().join(name), b"%PDF").unwrap();
    }
    let table = dir.path().join("batch.xlsx");
    write_table(
        &table,
        &[("a.pdf", "A-1"), ("b.pdf", "B-1"), ("missing.pdf", "M-1"), ("c.pdf", "C-1")],
    );
    let output = dir.path().join("out");
    std::fs::create_dir_all(&output).unwrap();

    let runner = BatchRunner::new(CopyStamper, CancelToken::new());
    let events = collect_events(&runner, &table, &output);
    let report = completed_report(&events);

    assert_eq!(report.total, 4);
    assert_eq!(report.succeeded, 3);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].starts_with("row 4: file does not exist: "));
    assert!(report.failures[0].contains(&dir.path().join("missing.pdf").display().to_string()));

    assert!(output.join("A-1_a.pdf").is_file());
    assert!(output.join("B-1_b.pdf").is_file());
    assert!(output.join("C-1_c.pdf").is_file());

    let log = std::fs::read_to_string(output.join(ERROR_LOG_NAME)).unwrap();
    assert_eq!(log.lines().count(), 1);
    assert_eq!(report.error_log, Some(output.join(ERROR_LOG_NAME)));

    if let Some(RunEvent::Completed { summary, .. }) = events.last() {
        assert!(summary.starts_with("Processed 3/4 files successfully"));
        assert!(summary.contains("1 failed, see: "));
    }
}

#[test]
fn test_empty_cells_produce_no_output() {
    let dir = tempdir().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("a.pdf"), b"%PDF").unwrap();
    let table = dir.path().join("batch.xlsx");
    write_table(&table, &[("", "X-1"), ("a.pdf", ""), ("a.pdf", "OK")]);
    let output = dir.path().join("out");
    std::fs::create_dir_all(&output).unwrap();

    let runner = BatchRunner::new(CopyStamper, CancelToken::new());
    let report = completed_report(&collect_events(&runner, &table, &output));

    assert_eq!(report.succeeded, 1);
    assert_eq!(
        report.failures,
        vec!["row 2: file path is empty".to_string(), "row 3: index is empty".to_string()]
    );

    let outputs: Vec<_> = std::fs::read_dir(&output)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|n| n.ends_with(".pdf"))
        .collect();
    assert_eq!(outputs, vec!["OK_a.pdf".to_string()]);
}

#[test]
fn test_progress_reported_for_every_row() {
    let dir = tempdir().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("good.pdf"), b"%PDF").unwrap();
    std::fs::write(dir.path().join("bad.pdf"), b"broken").unwrap();
    let table = dir.path().join("batch.xlsx");
    write_table(&table, &[("good.pdf", "1"), ("bad.pdf", "2"), ("nope.pdf", "3")]);
    let output = dir.path().join("out");
    std::fs::create_dir_all(&output).unwrap();

    let runner = BatchRunner::new(PickyStamper, CancelToken::new());
    let events = collect_events(&runner, &table, &output);

    let progress: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            RunEvent::Progress { current, total } => Some((*current, *total)),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![(1, 3), (2, 3), (3, 3)]);
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);

    let report = completed_report(&events);
    assert_eq!(report.succeeded, 1);
    assert!(report.failures[0].starts_with("row 3: processing failed: "));
    assert!(report.failures[0].contains("bad.pdf"));
}

#[test]
fn test_cancel_stops_at_row_boundary() {
    let dir = tempdir().expect("Failed to create temp dir");
    let mut rows = Vec::new();
    for i in 1..=5 {
        std::fs::write(dir.path().join(format!("{}.pdf", i)), b"%PDF").unwrap();
        rows.push((format!("{}.pdf", i), format!("IDX{}", i)));
    }
    let rows_ref: Vec<(&str, &str)> = rows.iter().map(|(p, i)| (p.as_str(), i.as_str())).collect();
    let table = dir.path().join("batch.xlsx");
    write_table(&table, &rows_ref);
    let output = dir.path().join("out");
    std::fs::create_dir_all(&output).unwrap();

    let token = CancelToken::new();
    let runner = BatchRunner::new(CopyStamper, token.clone());
    let mut events = Vec::new();
    runner.run(&table, &output, |event| {
        if event == (RunEvent::Progress { current: 2, total: 5 }) {
            token.cancel();
        }
        events.push(event);
    });

    assert!(output.join("IDX1_1.pdf").is_file());
    assert!(output.join("IDX2_2.pdf").is_file());
    assert!(!output.join("IDX3_3.pdf").exists());
    assert!(!events
        .iter()
        .any(|e| matches!(e, RunEvent::Progress { current, .. } if *current > 2)));

    let report = completed_report(&events);
    assert!(report.cancelled);
    assert_eq!(report.processed, 2);
    assert_eq!(report.succeeded, 2);
    if let Some(RunEvent::Completed { summary, .. }) = events.last() {
        assert!(summary.contains("Stopped after 2 of 5 rows"));
    }
}

#[test]
fn test_duplicate_destination_keeps_single_file() {
    let dir = tempdir().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("a.pdf"), b"%PDF").unwrap();
    let table = dir.path().join("batch.xlsx");
    // 禁止文字の置換後に同じ出力名になる
    write_table(&table, &[("a.pdf", "X/1"), ("a.pdf", "X:1")]);
    let output = dir.path().join("out");
    std::fs::create_dir_all(&output).unwrap();

    let runner = BatchRunner::new(CopyStamper, CancelToken::new());
    let report = completed_report(&collect_events(&runner, &table, &output));
    assert_eq!(report.succeeded, 2);

    // 再実行しても上書きされるだけ
    let report = completed_report(&collect_events(&runner, &table, &output));
    assert_eq!(report.succeeded, 2);

    let count = std::fs::read_dir(&output).unwrap().count();
    assert_eq!(count, 1);
    assert!(output.join("X_1_a.pdf").is_file());
}

#[test]
fn test_relative_paths_resolve_against_table_dir() {
    let dir = tempdir().expect("Failed to create temp dir");
    let files = dir.path().join("files");
    std::fs::create_dir_all(&files).unwrap();
    std::fs::write(files.join("report.pdf"), b"%PDF").unwrap();
    let absolute = dir.path().join("abs.pdf");
    std::fs::write(&absolute, b"%PDF").unwrap();

    let table_dir = dir.path().join("tables");
    std::fs::create_dir_all(&table_dir).unwrap();
    let table = table_dir.join("batch.xlsx");
    let absolute_str = absolute.display().to_string();
    write_table(
        &table,
        &[("../files/report.pdf", "FIN/2023:001"), (absolute_str.as_str(), "ABS")],
    );
    let output = dir.path().join("out");
    std::fs::create_dir_all(&output).unwrap();

    let runner = BatchRunner::new(CopyStamper, CancelToken::new());
    let report = completed_report(&collect_events(&runner, &table, &output));

    assert_eq!(report.succeeded, 2, "failures: {:?}", report.failures);
    assert!(output.join("FIN_2023_001_report.pdf").is_file());
    assert!(output.join("ABS_abs.pdf").is_file());
    assert!(!output.join(ERROR_LOG_NAME).exists());
}

#[test]
fn test_unreadable_table_is_fatal() {
    let dir = tempdir().expect("Failed to create temp dir");
    let table = dir.path().join("broken.xlsx");
    std::fs::write(&table, b"not a workbook").unwrap();

    let runner = BatchRunner::new(CopyStamper, CancelToken::new());
    let events = collect_events(&runner, &table, dir.path());

    assert_eq!(events.len(), 1);
    match &events[0] {
        RunEvent::FatalError(message) => assert!(message.starts_with("fatal error: ")),
        other => panic!("expected FatalError, got {:?}", other),
    }
}

#[test]
fn test_header_only_table() {
    let dir = tempdir().expect("Failed to create temp dir");
    let table = dir.path().join("empty.xlsx");
    write_table(&table, &[]);

    let runner = BatchRunner::new(CopyStamper, CancelToken::new());
    let events = collect_events(&runner, &table, dir.path());

    assert_eq!(events.len(), 1);
    let report = completed_report(&events);
    assert_eq!(report.total, 0);
    assert!(!report.has_failures());
}

#[test]
fn test_report_serializes_for_json_output() {
    let dir = tempdir().expect("Failed to create temp dir");
    let table = dir.path().join("batch.xlsx");
    write_table(&table, &[("missing.pdf", "M-1")]);
    let output = dir.path().join("out");
    std::fs::create_dir_all(&output).unwrap();

    let runner = BatchRunner::new(CopyStamper, CancelToken::new());
    let report = completed_report(&collect_events(&runner, &table, &output));

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["total"], 1);
    assert_eq!(json["succeeded"], 0);
    assert_eq!(json["cancelled"], false);
    assert!(json["failures"][0].as_str().unwrap().starts_with("row 2: "));
    assert!(json["errorLog"].as_str().unwrap().ends_with(ERROR_LOG_NAME));
}
