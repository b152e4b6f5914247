//! ldr-reconcile
//!
//! Cross-validation of primary ledgers (LDs) against the finalized key index
//! of the management ledger.
//!
//! For each valid LD row the key is normalised and looked up; found rows take
//! their secondary fields from the group's representative row (the first
//! issue, else the first row in order) and have their dates compared under
//! the configured tolerance. [`run_pipeline`] strings the whole pass
//! together: candidate keys, streaming scan, aggregation.

mod dates;
mod engine;
mod error;
mod pipeline;

pub use dates::{compare_dates, parse_date, MAX_YEAR, MIN_YEAR};
pub use engine::reconcile;
pub use error::ReconcileError;
pub use pipeline::{run_pipeline, PipelineOutput};
