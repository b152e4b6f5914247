use std::io::Write;
use std::sync::Arc;

use ldr_config::EngineConfig;
use ldr_ingest::{process_file, scan_reader, NoProgress, ScanCancel};
use ldr_schemas::CandidateKeySet;

const LEDGER: &str = "\
Nº Vale;Revisão;Data de Aceitação;Código de Disposição;Tipo de Emissão;Título
X1;0;2024-03-01;1;E;Planta baixa
X3;0;2024-03-02;1;E;Corte
X2;A;2024-03-03;2;E;Fachada
X4;B;2024-03-04;1;E;Detalhe
";

fn candidates() -> Arc<CandidateKeySet> {
    Arc::new(CandidateKeySet::from_raw_keys(["X1", "x-2"]))
}

#[test]
fn scenario_sync_scan_indexes_only_requested_keys() {
    let out = scan_reader(
        LEDGER.as_bytes(),
        "ledger.csv",
        LEDGER.len() as u64,
        candidates(),
        &EngineConfig::default(),
        &mut NoProgress,
        &ScanCancel::new(),
    )
    .unwrap();

    assert_eq!(out.index.len(), 1);
    assert!(out.index.get("X1").is_some());
    assert!(out.index.get("X3").is_none());
    assert!(out.index.get("X4").is_none());
    assert_eq!(out.stats.rows_seen, 4);
    assert_eq!(out.stats.keys_requested, 2);
    assert_eq!(out.stats.keys_found, 1);
    assert_eq!(out.stats.delimiter, "semicolon");

    let row = &out.index.get("X1").unwrap().rows()[0];
    assert_eq!(row.acceptance_date, "2024-03-01");
    assert_eq!(row.title, "Planta baixa");
}

#[tokio::test]
async fn scenario_async_scan_matches_sync_scan() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(LEDGER.as_bytes()).unwrap();
    file.flush().unwrap();

    let keys = Arc::new(CandidateKeySet::from_raw_keys(["X1", "X2"]));
    let mut updates: Vec<(u8, String)> = Vec::new();
    let mut sink = |p: u8, s: &str| updates.push((p, s.to_string()));

    let out = process_file(
        file.path(),
        keys,
        &EngineConfig::default(),
        &mut sink,
        &ScanCancel::new(),
    )
    .await
    .unwrap();

    let mut found: Vec<String> = out.index.keys().map(|k| k.to_string()).collect();
    found.sort();
    assert_eq!(found, vec!["X1".to_string(), "X2".to_string()]);
    assert_eq!(out.stats.file_size, LEDGER.len() as u64);
    assert_eq!(out.stats.bytes_read, LEDGER.len() as u64);

    let x2 = out.index.get("X2").unwrap();
    assert!(x2.is_issued());
    assert_eq!(x2.first_issue().unwrap().revision, "A");

    assert_eq!(updates.first().map(|u| u.0), Some(0));
    assert_eq!(updates.last().map(|u| u.0), Some(100));
}
