//! `ldr reconcile`: one full pass from files.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use ldr_ingest::ScanCancel;
use ldr_reconcile::{run_pipeline, PipelineOutput, ReconcileError};
use tracing::{info, warn};

use super::load_engine_config;
use super::primary::load_primary_csv;

pub struct ReconcileArgs {
    pub ledger: PathBuf,
    pub primary: Vec<PathBuf>,
    pub config_paths: Vec<String>,
    pub out: Option<PathBuf>,
    pub strict_config: bool,
}

pub async fn run_reconcile(args: ReconcileArgs) -> Result<()> {
    let (cfg, config_hash) = load_engine_config(&args.config_paths, args.strict_config)?;

    let mut rows = Vec::new();
    for path in &args.primary {
        rows.extend(load_primary_csv(path)?);
    }

    let cancel = ScanCancel::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received; cancelling scan");
                cancel.cancel();
            }
        });
    }

    let mut last_decile: Option<u8> = None;
    let mut progress = |pct: u8, status: &str| {
        let decile = pct / 10;
        if last_decile != Some(decile) {
            last_decile = Some(decile);
            info!(percent = pct, "{status}");
        }
    };

    let output = run_pipeline(&args.ledger, &rows, &cfg, config_hash, &mut progress, &cancel)
        .await
        .map_err(failure)?;

    let json = serde_json::to_string_pretty(&output).context("serialize summary")?;
    match &args.out {
        Some(path) => {
            fs::write(path, json)
                .with_context(|| format!("write summary to {}", path.display()))?;
            print_summary(&output);
            println!("out={}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn failure(e: ReconcileError) -> anyhow::Error {
    let kind = e.kind();
    anyhow::Error::new(e).context(format!("RECONCILE_FAILED kind={}", kind.as_str()))
}

fn print_summary(out: &PipelineOutput) {
    let s = &out.summary;
    println!("run_id={}", s.run_id);
    println!("config_hash={}", s.config_hash.as_deref().unwrap_or("NONE"));
    println!("rows_processed={}", s.rows_processed);
    println!("rows_skipped_invalid={}", s.rows_skipped_invalid);
    println!("keys_found={}", s.keys_found);
    println!("keys_not_found={}", s.keys_not_found);
    println!("keys_issued={}", s.keys_issued);
    println!("keys_not_issued={}", s.keys_not_issued);
    println!("keys_certified={}", s.keys_certified);
    println!("date_discrepancies={}", s.date_discrepancies);
    println!("ledger_rows_seen={}", out.scan.rows_seen);
    println!("ledger_rows_matched={}", out.scan.rows_matched);
}
