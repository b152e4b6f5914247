use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::LedgerRow;

/// Outcome of comparing the LD's date against the ledger's acceptance date.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateComparison {
    /// `None` when neither side parsed.
    pub equal: Option<bool>,
    pub primary_date: Option<NaiveDate>,
    pub secondary_date: Option<NaiveDate>,
    /// `secondary - primary` in whole days; `None` unless both sides parsed.
    pub difference_days: Option<i64>,
}

/// Reconciliation outcome for one primary row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationRecord {
    /// Key as written in the LD.
    pub key: String,
    pub normalized_key: String,
    pub source_file: String,
    pub revision: String,
    pub found_in_ledger: bool,
    pub issued: bool,
    /// Representative ledger row the secondary fields were read from.
    pub extracted: Option<LedgerRow>,
    /// Revision of the group's certified row, if any.
    pub certified_revision: Option<String>,
    pub dates: DateComparison,
    /// Full ordered group for audit display; empty when not found.
    pub group: Vec<LedgerRow>,
    /// Row-level problem noted during aggregation. Never aborts the pass.
    pub row_error: Option<String>,
}

impl ReconciliationRecord {
    pub fn not_found(
        key: impl Into<String>,
        normalized_key: impl Into<String>,
        source_file: impl Into<String>,
        revision: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            normalized_key: normalized_key.into(),
            source_file: source_file.into(),
            revision: revision.into(),
            found_in_ledger: false,
            issued: false,
            extracted: None,
            certified_revision: None,
            dates: DateComparison::default(),
            group: Vec::new(),
            row_error: None,
        }
    }

    pub fn has_date_discrepancy(&self) -> bool {
        self.dates.equal == Some(false)
    }
}

/// Aggregate result of one reconciliation pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Hash of the effective engine configuration, when one was loaded.
    pub config_hash: Option<String>,

    pub rows_processed: u64,
    pub rows_skipped_invalid: u64,
    pub keys_found: u64,
    pub keys_not_found: u64,
    pub keys_issued: u64,
    /// Counted only for found keys.
    pub keys_not_issued: u64,
    pub keys_certified: u64,
    pub date_discrepancies: u64,

    pub records: Vec<ReconciliationRecord>,
}

/// Counter-only view, used to compare runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryCounts {
    pub rows_processed: u64,
    pub rows_skipped_invalid: u64,
    pub keys_found: u64,
    pub keys_not_found: u64,
    pub keys_issued: u64,
    pub keys_not_issued: u64,
    pub keys_certified: u64,
    pub date_discrepancies: u64,
}

impl ReconciliationSummary {
    pub fn counts(&self) -> SummaryCounts {
        SummaryCounts {
            rows_processed: self.rows_processed,
            rows_skipped_invalid: self.rows_skipped_invalid,
            keys_found: self.keys_found,
            keys_not_found: self.keys_not_found,
            keys_issued: self.keys_issued,
            keys_not_issued: self.keys_not_issued,
            keys_certified: self.keys_certified,
            date_discrepancies: self.date_discrepancies,
        }
    }

    /// First record for a raw LD key, matched after normalisation.
    pub fn record_for(&self, raw_key: &str) -> Option<&ReconciliationRecord> {
        let wanted = crate::normalize_key(raw_key);
        self.records.iter().find(|r| r.normalized_key == wanted)
    }
}
