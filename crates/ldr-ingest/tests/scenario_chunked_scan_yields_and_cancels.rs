use std::io::Write;
use std::sync::Arc;

use ldr_config::{ChunkTier, EngineConfig};
use ldr_ingest::{process_file, IngestError, NoProgress, ScanCancel};
use ldr_schemas::{CandidateKeySet, EmissionStatus};

fn ledger_file(rows: usize) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "Nº Vale;Revisão;Código de Disposição;Tipo de Emissão").unwrap();
    for i in 0..rows {
        writeln!(file, "LD-{:05};0;2;E", i).unwrap();
    }
    writeln!(file, "LD-00007;-1;;E").unwrap();
    writeln!(file, "LD-00007;1;1;E").unwrap();
    file.flush().unwrap();
    file
}

fn tiny_chunks() -> EngineConfig {
    let mut cfg = EngineConfig::default();
    cfg.scan.chunk_tiers = vec![ChunkTier {
        max_file_bytes: None,
        chunk_bytes: 256,
    }];
    cfg
}

#[tokio::test]
async fn scenario_many_chunks_build_the_same_groups() {
    let file = ledger_file(500);
    let keys = Arc::new(CandidateKeySet::from_raw_keys(["LD-00007", "LD-00400"]));

    let out = process_file(
        file.path(),
        keys,
        &tiny_chunks(),
        &mut NoProgress,
        &ScanCancel::new(),
    )
    .await
    .unwrap();

    assert!(out.stats.chunks > 10);
    assert_eq!(out.stats.rows_seen, 502);
    assert_eq!(out.stats.chunk_bytes, 256);

    let g = out.index.get("LD-00007").unwrap();
    let revs: Vec<&str> = g.rows().iter().map(|r| r.revision.as_str()).collect();
    assert_eq!(revs, vec!["-1", "0", "1"]);
    assert_eq!(g.rows()[0].emission, Some(EmissionStatus::Initial));
    assert_eq!(g.rows()[1].emission, Some(EmissionStatus::FirstIssue));
    assert_eq!(g.certified().unwrap().revision, "1");
    assert!(out.index.get("LD-00400").is_some());
}

#[tokio::test]
async fn scenario_cancel_discards_partial_index() {
    let file = ledger_file(500);
    let keys = Arc::new(CandidateKeySet::from_raw_keys(["LD-00007"]));
    let cancel = ScanCancel::new();

    let trigger = cancel.clone();
    let mut sink = move |_: u8, _: &str| trigger.cancel();

    let err = process_file(file.path(), keys, &tiny_chunks(), &mut sink, &cancel)
        .await
        .unwrap_err();

    match err {
        IngestError::Cancelled { rows_seen } => assert!(rows_seen < 502),
        other => panic!("unexpected error: {other}"),
    }
}
