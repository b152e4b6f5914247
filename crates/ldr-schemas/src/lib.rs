//! ldr-schemas
//!
//! Shared vocabulary for the LD reconciliation engine: the key normaliser,
//! the candidate key set, reduced ledger rows, primary rows and the
//! reconciliation result types. No IO.

mod key;
mod ledger;
mod report;

pub use key::{normalize_key, CandidateKeySet, NormalizedKey};
pub use ledger::{CanonicalField, EmissionStatus, LedgerRow, PrimaryRow, RowValidation};
pub use report::{DateComparison, ReconciliationRecord, ReconciliationSummary, SummaryCounts};
