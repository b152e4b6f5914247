use std::path::Path;
use std::sync::Arc;

use ldr_config::EngineConfig;
use ldr_ingest::{process_file, MappingReport, ProgressSink, ScanCancel, ScanStats};
use ldr_schemas::{CandidateKeySet, PrimaryRow, ReconciliationSummary};
use serde::Serialize;
use tracing::info;

use crate::engine::reconcile;
use crate::error::ReconcileError;

/// Share of the overall progress bar given to the ledger scan.
const SCAN_SHARE: u8 = 90;

/// Result bundle of one full pass. Owned by the caller; nothing is retained.
#[derive(Debug, Serialize)]
pub struct PipelineOutput {
    pub summary: ReconciliationSummary,
    pub scan: ScanStats,
    pub mapping: MappingReport,
}

/// Rescales a stage's 0..=100 into a slice of the caller's bar.
struct StageProgress<'a, P: ?Sized> {
    inner: &'a mut P,
    base: u8,
    span: u8,
}

impl<P: ProgressSink + ?Sized> ProgressSink for StageProgress<'_, P> {
    fn report(&mut self, percent: u8, status: &str) {
        let scaled = u16::from(self.base) + u16::from(percent.min(100)) * u16::from(self.span) / 100;
        self.inner.report(scaled.min(100) as u8, status);
    }
}

/// Scan the ledger for the keys of `primary_rows`, then reconcile.
///
/// Stages run strictly in sequence: candidate keys, scan + finalize,
/// aggregate. The index is dropped before returning.
pub async fn run_pipeline<P>(
    ledger: &Path,
    primary_rows: &[PrimaryRow],
    cfg: &EngineConfig,
    config_hash: Option<String>,
    progress: &mut P,
    cancel: &ScanCancel,
) -> Result<PipelineOutput, ReconcileError>
where
    P: ProgressSink + Send + ?Sized,
{
    if primary_rows.is_empty() {
        return Err(ReconcileError::NoPrimaryRows);
    }

    let keys = Arc::new(CandidateKeySet::from_primary_rows(primary_rows));
    info!(
        primary_rows = primary_rows.len(),
        candidate_keys = keys.len(),
        ledger = %ledger.display(),
        "pipeline started"
    );

    let outcome = {
        let mut stage = StageProgress {
            inner: &mut *progress,
            base: 0,
            span: SCAN_SHARE,
        };
        process_file(ledger, keys, cfg, &mut stage, cancel).await?
    };

    let mut summary = {
        let mut stage = StageProgress {
            inner: &mut *progress,
            base: SCAN_SHARE,
            span: 100 - SCAN_SHARE,
        };
        reconcile(primary_rows, &outcome.index, cfg, &mut stage)?
    };
    summary.config_hash = config_hash;

    Ok(PipelineOutput {
        summary,
        scan: outcome.stats,
        mapping: outcome.mapping,
    })
}
