use std::io::Write;

use ldr_config::EngineConfig;
use ldr_ingest::{NoProgress, ScanCancel};
use ldr_reconcile::run_pipeline;
use ldr_schemas::PrimaryRow;

#[tokio::test]
async fn scenario_identical_input_gives_identical_counts() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "Nº Vale,Revisão,Data de Aceitação,Código de Disposição,Tipo de Emissão").unwrap();
    for i in 0..300 {
        let rev = match i % 4 {
            0 => "-1",
            1 => "A",
            2 => "0",
            _ => "1",
        };
        writeln!(file, "LD-{:03},{rev},{:02}/03/2024,1,E", i % 40, 1 + i % 28).unwrap();
    }
    file.flush().unwrap();

    let rows: Vec<PrimaryRow> = (0..60)
        .map(|i| PrimaryRow::new(format!("ld-{:03}", i), "mech.csv", "0", "2024-03-05"))
        .collect();

    let mut cfg = EngineConfig::default();
    cfg.scan.chunk_tiers[0].chunk_bytes = 512;

    let mut runs = Vec::new();
    for _ in 0..2 {
        let out = run_pipeline(
            file.path(),
            &rows,
            &cfg,
            None,
            &mut NoProgress,
            &ScanCancel::new(),
        )
        .await
        .unwrap();
        runs.push(out);
    }

    assert_eq!(runs[0].summary.counts(), runs[1].summary.counts());
    assert_eq!(runs[0].summary.records, runs[1].summary.records);
    assert_ne!(runs[0].summary.run_id, runs[1].summary.run_id);
    assert_eq!(runs[0].summary.keys_found, 40);
    assert_eq!(runs[0].summary.keys_not_found, 20);
}
