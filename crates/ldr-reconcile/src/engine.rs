use chrono::Utc;
use ldr_config::EngineConfig;
use ldr_ingest::{FinalizedIndex, KeyGroup, ProgressSink};
use ldr_schemas::{normalize_key, PrimaryRow, ReconciliationRecord, ReconciliationSummary};
use tracing::{debug, info};
use uuid::Uuid;

use crate::dates::compare_dates;
use crate::error::ReconcileError;

const PROGRESS_STEPS: usize = 100;

#[derive(Default)]
struct Counters {
    rows_processed: u64,
    rows_skipped_invalid: u64,
    keys_found: u64,
    keys_not_found: u64,
    keys_issued: u64,
    keys_not_issued: u64,
    keys_certified: u64,
    date_discrepancies: u64,
}

/// Join every valid primary row to the finalized index.
///
/// Counters are per primary row: two LD rows naming the same key count twice.
/// Rows the validator rejected are skipped and counted apart. A row that
/// cannot be resolved records `row_error` and the pass continues.
///
/// The summary's `config_hash` is left empty; callers that loaded a layered
/// configuration fill it in.
pub fn reconcile<P>(
    primary_rows: &[PrimaryRow],
    index: &FinalizedIndex,
    cfg: &EngineConfig,
    progress: &mut P,
) -> Result<ReconciliationSummary, ReconcileError>
where
    P: ProgressSink + ?Sized,
{
    if primary_rows.is_empty() {
        return Err(ReconcileError::NoPrimaryRows);
    }

    let started_at = Utc::now();
    let run_id = Uuid::new_v4();
    let total = primary_rows.len();
    let report_every = (total / PROGRESS_STEPS).max(1);
    let tolerance = cfg.dates.tolerance_days;

    info!(%run_id, primary_rows = total, indexed_keys = index.len(), "reconciliation started");
    progress.report(0, "reconciling primary ledgers");

    let mut c = Counters::default();
    let mut records = Vec::with_capacity(total);

    for (i, row) in primary_rows.iter().enumerate() {
        if !row.is_valid() {
            c.rows_skipped_invalid += 1;
        } else {
            c.rows_processed += 1;
            let record = reconcile_row(row, index, tolerance, &mut c);
            records.push(record);
        }

        let done = i + 1;
        if done % report_every == 0 && done < total {
            let pct = (done * 100 / total).min(99) as u8;
            progress.report(pct, &format!("reconciled {done} of {total} rows"));
        }
    }

    let summary = ReconciliationSummary {
        run_id,
        started_at,
        finished_at: Utc::now(),
        config_hash: None,
        rows_processed: c.rows_processed,
        rows_skipped_invalid: c.rows_skipped_invalid,
        keys_found: c.keys_found,
        keys_not_found: c.keys_not_found,
        keys_issued: c.keys_issued,
        keys_not_issued: c.keys_not_issued,
        keys_certified: c.keys_certified,
        date_discrepancies: c.date_discrepancies,
        records,
    };

    info!(
        %run_id,
        rows_processed = summary.rows_processed,
        rows_skipped_invalid = summary.rows_skipped_invalid,
        keys_found = summary.keys_found,
        keys_not_found = summary.keys_not_found,
        keys_issued = summary.keys_issued,
        date_discrepancies = summary.date_discrepancies,
        "reconciliation complete"
    );
    progress.report(
        100,
        &format!(
            "reconciliation complete: {} found, {} not found",
            summary.keys_found, summary.keys_not_found
        ),
    );

    Ok(summary)
}

fn reconcile_row(
    row: &PrimaryRow,
    index: &FinalizedIndex,
    tolerance_days: i64,
    c: &mut Counters,
) -> ReconciliationRecord {
    let normalized = normalize_key(&row.key);
    let mut record =
        ReconciliationRecord::not_found(&row.key, &normalized, &row.source_file, &row.revision);

    if normalized.is_empty() {
        c.keys_not_found += 1;
        record.row_error = Some("empty key".to_string());
        return record;
    }

    let Some(group) = index.get(&normalized) else {
        c.keys_not_found += 1;
        return record;
    };

    c.keys_found += 1;
    record.found_in_ledger = true;
    fill_from_group(&mut record, row, group, tolerance_days, c);
    record
}

fn fill_from_group(
    record: &mut ReconciliationRecord,
    row: &PrimaryRow,
    group: &KeyGroup,
    tolerance_days: i64,
    c: &mut Counters,
) {
    record.issued = group.is_issued();
    if record.issued {
        c.keys_issued += 1;
    } else {
        c.keys_not_issued += 1;
    }

    record.certified_revision = group.certified().map(|r| r.revision.clone());
    if record.certified_revision.is_some() {
        c.keys_certified += 1;
    }

    record.group = group.rows().to_vec();

    let Some(rep) = group.representative() else {
        debug!(key = %record.normalized_key, "ledger group has no rows");
        record.row_error = Some("ledger group is empty".to_string());
        return;
    };

    record.dates = compare_dates(&row.date, &rep.acceptance_date, tolerance_days);
    if record.has_date_discrepancy() {
        c.date_discrepancies += 1;
    }
    record.extracted = Some(rep.clone());
}

#[cfg(test)]
mod tests {
    use super::*;
    use ldr_ingest::{finalize, KeyIndex, NoProgress};
    use ldr_schemas::{LedgerRow, NormalizedKey, RowValidation};

    fn ledger_row(key: &str, rev: &str, date: &str) -> LedgerRow {
        LedgerRow {
            key: key.to_string(),
            revision: rev.to_string(),
            acceptance_date: date.to_string(),
            disposition: "1".to_string(),
            emission_type: "E".to_string(),
            ..LedgerRow::default()
        }
    }

    fn index(rows: Vec<LedgerRow>) -> FinalizedIndex {
        let mut idx = KeyIndex::new();
        for r in rows {
            let k = NormalizedKey::from_raw(&r.key).unwrap();
            idx.push(k, r);
        }
        finalize(idx, &EngineConfig::default().codes)
    }

    #[test]
    fn empty_primary_set_is_rejected_up_front() {
        let err = reconcile(&[], &index(vec![]), &EngineConfig::default(), &mut NoProgress)
            .unwrap_err();
        assert!(matches!(err, ReconcileError::NoPrimaryRows));
    }

    #[test]
    fn representative_is_first_issue_row() {
        let idx = index(vec![
            ledger_row("LD-1", "-1", "2024-01-01"),
            ledger_row("LD-1", "A", "2024-01-11"),
            ledger_row("LD-1", "0", "2024-03-01"),
        ]);
        let rows = vec![PrimaryRow::new("ld-1", "a.csv", "A", "2024-01-10")];
        let s = reconcile(&rows, &idx, &EngineConfig::default(), &mut NoProgress).unwrap();

        let rec = &s.records[0];
        assert!(rec.found_in_ledger);
        assert!(rec.issued);
        assert_eq!(rec.extracted.as_ref().unwrap().revision, "A");
        assert_eq!(rec.dates.difference_days, Some(1));
        assert_eq!(rec.dates.equal, Some(true));
        assert_eq!(rec.certified_revision.as_deref(), Some("0"));
        assert_eq!(rec.group.len(), 3);
        assert_eq!(s.keys_certified, 1);
        assert_eq!(s.date_discrepancies, 0);
    }

    #[test]
    fn unissued_group_uses_first_row_and_counts_not_issued() {
        let idx = index(vec![ledger_row("LD-2", "-1", "2024-01-20")]);
        let rows = vec![PrimaryRow::new("LD-2", "a.csv", "0", "2024-01-10")];
        let s = reconcile(&rows, &idx, &EngineConfig::default(), &mut NoProgress).unwrap();

        let rec = &s.records[0];
        assert!(!rec.issued);
        assert_eq!(rec.extracted.as_ref().unwrap().revision, "-1");
        assert_eq!(s.keys_not_issued, 1);
        assert_eq!(s.date_discrepancies, 1);
    }

    #[test]
    fn invalid_and_blank_rows() {
        let idx = index(vec![ledger_row("LD-3", "0", "")]);
        let mut rejected = PrimaryRow::new("LD-3", "a.csv", "0", "");
        rejected.validation = Some(RowValidation {
            valid: Some(false),
            messages: vec![],
        });
        let mut unknown = PrimaryRow::new("LD-3", "a.csv", "0", "");
        unknown.validation = Some(RowValidation::default());
        let rows = vec![rejected, unknown, PrimaryRow::new("\u{FEFF} ", "a.csv", "0", "")];

        let s = reconcile(&rows, &idx, &EngineConfig::default(), &mut NoProgress).unwrap();
        assert_eq!(s.rows_skipped_invalid, 1);
        assert_eq!(s.rows_processed, 2);
        assert_eq!(s.keys_found, 1);
        assert_eq!(s.keys_not_found, 1);
        assert_eq!(s.records[1].row_error.as_deref(), Some("empty key"));
        // neither side has a date
        assert_eq!(s.records[0].dates.equal, None);
    }

    #[test]
    fn progress_ends_at_100() {
        let idx = index(vec![ledger_row("LD-4", "0", "")]);
        let rows: Vec<PrimaryRow> = (0..250)
            .map(|i| PrimaryRow::new(format!("LD-{i}"), "a.csv", "0", ""))
            .collect();
        let mut last = 0u8;
        let mut calls = 0;
        let mut sink = |p: u8, _: &str| {
            assert!(p >= last);
            last = p;
            calls += 1;
        };
        reconcile(&rows, &idx, &EngineConfig::default(), &mut sink).unwrap();
        assert_eq!(last, 100);
        assert!(calls < 250);
    }
}
