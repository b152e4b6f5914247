use std::io::Write;
use std::sync::Arc;

use ldr_config::EngineConfig;
use ldr_ingest::{process_file, scan_reader, FailureKind, IngestError, NoProgress, ScanCancel};
use ldr_schemas::CandidateKeySet;

fn keys() -> Arc<CandidateKeySet> {
    Arc::new(CandidateKeySet::from_raw_keys(["LD-001"]))
}

fn scan(src: &str) -> Result<ldr_ingest::ScanOutcome, IngestError> {
    scan_reader(
        src.as_bytes(),
        "ledger.csv",
        src.len() as u64,
        keys(),
        &EngineConfig::default(),
        &mut NoProgress,
        &ScanCancel::new(),
    )
}

#[test]
fn scenario_concatenated_export_is_rejected() {
    let src = "Nº Vale;Revisão\nLD-001;0\nLD-002;0\nNº Vale;Revisão\nLD-001;A\n";
    let err = scan(src).unwrap_err();
    assert_eq!(err.kind(), FailureKind::BadInput);
    match err {
        IngestError::HeaderRedetected { row, file_size } => {
            assert_eq!(row, 3);
            assert_eq!(file_size, src.len() as u64);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn scenario_reordered_second_header_is_rejected() {
    let src = "Nº Vale;Revisão\nLD-001;0\nRevisão;Nº Vale\nA;LD-001\n";
    let err = scan(src).unwrap_err();
    assert_eq!(err.kind(), FailureKind::BadInput);
    assert!(matches!(err, IngestError::HeaderRedetected { row: 2, .. }));
}

#[test]
fn scenario_ledger_without_identifier_column_is_rejected() {
    let err = scan("Projeto;Revisão\nP1;0\n").unwrap_err();
    assert_eq!(err.kind(), FailureKind::BadInput);
    assert!(err.to_string().contains("Projeto"));
}

#[tokio::test]
async fn scenario_empty_ledger_file_has_no_header() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let err = process_file(
        file.path(),
        keys(),
        &EngineConfig::default(),
        &mut NoProgress,
        &ScanCancel::new(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, IngestError::MissingHeader { file_size: 0 }));
}

#[tokio::test]
async fn scenario_missing_file_is_io_failure() {
    let dir = tempfile::tempdir().unwrap();
    let err = process_file(
        &dir.path().join("absent.csv"),
        keys(),
        &EngineConfig::default(),
        &mut NoProgress,
        &ScanCancel::new(),
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), FailureKind::Io);
    assert!(err.to_string().contains("absent.csv"));
}

#[tokio::test]
async fn scenario_empty_candidate_set_fails_before_reading() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "Nº Vale;Revisão").unwrap();
    let err = process_file(
        file.path(),
        Arc::new(CandidateKeySet::default()),
        &EngineConfig::default(),
        &mut NoProgress,
        &ScanCancel::new(),
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), FailureKind::NoCandidateKeys);
}
