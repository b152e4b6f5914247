use std::io::Write;

use ldr_config::EngineConfig;
use ldr_ingest::{NoProgress, ScanCancel};
use ldr_reconcile::run_pipeline;
use ldr_schemas::{EmissionStatus, PrimaryRow};

fn ledger() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "Nº Vale;Revisão;Data de Aceitação;Código de Disposição;Tipo de Emissão;Projeto\n\
         LD-001;-1;02/01/2024;;E;Usina\n\
         LD-900;0;03/01/2024;1;E;Usina\n\
         LD-001;A;11/01/2024;2;E;Usina\n"
    )
    .unwrap();
    file.flush().unwrap();
    file
}

#[tokio::test]
async fn scenario_one_found_one_missing() {
    let file = ledger();
    let rows = vec![
        PrimaryRow::new("LD-001", "civil.csv", "A", "2024-01-10"),
        PrimaryRow::new("LD-002", "civil.csv", "0", "2024-01-12"),
    ];

    let out = run_pipeline(
        file.path(),
        &rows,
        &EngineConfig::default(),
        Some("abc123".to_string()),
        &mut NoProgress,
        &ScanCancel::new(),
    )
    .await
    .unwrap();

    let s = &out.summary;
    assert_eq!(s.keys_found, 1);
    assert_eq!(s.keys_not_found, 1);
    assert_eq!(s.keys_issued, 1);
    assert_eq!(s.keys_not_issued, 0);
    assert_eq!(s.rows_processed, 2);
    assert_eq!(s.config_hash.as_deref(), Some("abc123"));

    let ld1 = s.record_for("LD-001").unwrap();
    assert!(ld1.found_in_ledger);
    assert!(ld1.issued);
    assert_eq!(ld1.group.len(), 2);
    assert_eq!(ld1.group[0].emission, Some(EmissionStatus::Initial));
    assert_eq!(ld1.group[1].emission, Some(EmissionStatus::FirstIssue));
    assert_eq!(ld1.extracted.as_ref().unwrap().project, "Usina");
    assert_eq!(ld1.dates.difference_days, Some(1));
    assert_eq!(ld1.dates.equal, Some(true));
    assert_eq!(ld1.certified_revision, None);

    let ld2 = s.record_for("LD-002").unwrap();
    assert!(!ld2.found_in_ledger);
    assert!(!ld2.issued);
    assert!(ld2.extracted.is_none());
    assert!(ld2.group.is_empty());
    assert_eq!(ld2.dates.equal, None);

    // rows outside the candidate set never reach the index
    assert_eq!(out.scan.rows_seen, 3);
    assert_eq!(out.scan.rows_matched, 2);
    assert_eq!(out.scan.keys_found, 1);
    assert_eq!(out.scan.keys_requested, 2);
}

#[tokio::test]
async fn scenario_output_serializes_for_export() {
    let file = ledger();
    let rows = vec![PrimaryRow::new("LD-001", "civil.csv", "A", "2024-01-10")];
    let mut last = 0u8;
    let mut sink = |p: u8, _: &str| last = p;

    let out = run_pipeline(
        file.path(),
        &rows,
        &EngineConfig::default(),
        None,
        &mut sink,
        &ScanCancel::new(),
    )
    .await
    .unwrap();
    assert_eq!(last, 100);

    let v = serde_json::to_value(&out).unwrap();
    assert_eq!(v["summary"]["keys_found"], 1);
    assert_eq!(v["summary"]["records"][0]["group"][1]["emission"], "PRIMEMISSAO");
    assert_eq!(v["summary"]["records"][0]["dates"]["primary_date"], "2024-01-10");
    assert_eq!(v["scan"]["delimiter"], "semicolon");
    assert_eq!(v["mapping"]["resolved"]["key"], "Nº Vale");
}
