use std::sync::Arc;

use ldr_config::EngineConfig;
use ldr_ingest::{scan_reader, NoProgress, ScanCancel};
use ldr_schemas::CandidateKeySet;

#[test]
fn scenario_latin1_export_resolves_headers_and_rows() {
    // Windows-1252 export: accented bytes are invalid UTF-8.
    let mut src: Vec<u8> = Vec::new();
    src.extend_from_slice(b"N\xBA Vale;Revis\xE3o;Data de Aceita\xE7\xE3o;");
    src.extend_from_slice(b"C\xF3digo de Disposi\xE7\xE3o;Tipo de Emiss\xE3o;T\xEDtulo\n");
    src.extend_from_slice(b"LD-010;0;05/02/2024;1;E;Funda\xE7\xF5es\n");

    let keys = Arc::new(CandidateKeySet::from_raw_keys(["LD-010"]));
    let out = scan_reader(
        src.as_slice(),
        "legacy.csv",
        src.len() as u64,
        keys,
        &EngineConfig::default(),
        &mut NoProgress,
        &ScanCancel::new(),
    )
    .unwrap();

    assert!(out.mapping.absent.iter().all(|f| f != "key" && f != "revision"));
    assert!(out.mapping.resolved.contains_key("acceptance_date"));
    assert!(out.mapping.resolved.contains_key("disposition"));

    let group = out.index.get("LD-010").unwrap();
    let row = &group.rows()[0];
    assert_eq!(row.revision, "0");
    assert_eq!(row.acceptance_date, "05/02/2024");
    assert!(row.title.starts_with("Funda"));
    assert!(row.title.contains('\u{FFFD}'));
    assert!(row.certified);
}

#[test]
fn scenario_mojibake_headers_resolve() {
    let src = "NÂº Vale,RevisÃ£o,SituaÃ§Ã£o\nLD-011,A,Emitido\n";
    let keys = Arc::new(CandidateKeySet::from_raw_keys(["LD-011"]));
    let out = scan_reader(
        src.as_bytes(),
        "mojibake.csv",
        src.len() as u64,
        keys,
        &EngineConfig::default(),
        &mut NoProgress,
        &ScanCancel::new(),
    )
    .unwrap();

    assert_eq!(out.stats.delimiter, "comma");
    let row = &out.index.get("LD-011").unwrap().rows()[0];
    assert_eq!(row.revision, "A");
    assert_eq!(row.status, "Emitido");
}

#[test]
fn scenario_bom_prefixed_header_resolves() {
    let src = "\u{FEFF}Nº Vale;Revisão\nLD-012;B\n";
    let keys = Arc::new(CandidateKeySet::from_raw_keys(["LD-012"]));
    let out = scan_reader(
        src.as_bytes(),
        "bom.csv",
        src.len() as u64,
        keys,
        &EngineConfig::default(),
        &mut NoProgress,
        &ScanCancel::new(),
    )
    .unwrap();

    assert_eq!(out.mapping.resolved.get("key").map(String::as_str), Some("Nº Vale"));
    assert_eq!(out.index.get("LD-012").unwrap().rows()[0].revision, "B");
}
