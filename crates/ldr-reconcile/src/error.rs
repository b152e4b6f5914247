use std::fmt;

use ldr_ingest::{FailureKind, IngestError};

/// Hard precondition failures of a reconciliation pass. A run that returns
/// one of these produced no summary.
#[derive(Debug)]
pub enum ReconcileError {
    /// No primary rows were supplied.
    NoPrimaryRows,
    /// The ledger scan failed.
    Ingest(IngestError),
}

impl ReconcileError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ReconcileError::NoPrimaryRows => FailureKind::NoPrimaryRows,
            ReconcileError::Ingest(e) => e.kind(),
        }
    }
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileError::NoPrimaryRows => write!(f, "no primary ledger rows to reconcile"),
            ReconcileError::Ingest(e) => write!(f, "ledger scan failed: {e}"),
        }
    }
}

impl std::error::Error for ReconcileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReconcileError::Ingest(e) => Some(e),
            ReconcileError::NoPrimaryRows => None,
        }
    }
}

impl From<IngestError> for ReconcileError {
    fn from(e: IngestError) -> Self {
        ReconcileError::Ingest(e)
    }
}
