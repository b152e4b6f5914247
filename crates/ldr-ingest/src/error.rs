use std::fmt;

/// Coarse failure class, for callers that only need to tell "bad input
/// format" from "no candidate keys" from "I/O failure".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    BadInput,
    NoCandidateKeys,
    NoPrimaryRows,
    Io,
    Cancelled,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::BadInput => "BAD_INPUT",
            FailureKind::NoCandidateKeys => "NO_CANDIDATE_KEYS",
            FailureKind::NoPrimaryRows => "NO_PRIMARY_ROWS",
            FailureKind::Io => "IO",
            FailureKind::Cancelled => "CANCELLED",
        }
    }
}

/// Structural failures of a ledger scan. Row-level defects never surface
/// here; they are counted in `ScanStats`.
#[derive(Debug)]
pub enum IngestError {
    /// The file could not be opened or read.
    Io {
        path: String,
        file_size: u64,
        detail: String,
    },
    /// No header row (empty file).
    MissingHeader { file_size: u64 },
    /// Neither identifying column could be resolved from the header.
    MissingKeyColumn { file_size: u64, headers: Vec<String> },
    /// A data row looked like a header; the ledger changed shape mid-stream.
    HeaderRedetected { row: u64, file_size: u64 },
    /// The candidate key set was empty; nothing could ever match.
    NoCandidateKeys,
    /// The caller cancelled the scan; partial results were discarded.
    Cancelled { rows_seen: u64 },
}

impl IngestError {
    pub fn kind(&self) -> FailureKind {
        match self {
            IngestError::Io { .. } => FailureKind::Io,
            IngestError::MissingHeader { .. }
            | IngestError::MissingKeyColumn { .. }
            | IngestError::HeaderRedetected { .. } => FailureKind::BadInput,
            IngestError::NoCandidateKeys => FailureKind::NoCandidateKeys,
            IngestError::Cancelled { .. } => FailureKind::Cancelled,
        }
    }

    pub(crate) fn io(path: impl Into<String>, file_size: u64, detail: impl fmt::Display) -> Self {
        IngestError::Io {
            path: path.into(),
            file_size,
            detail: detail.to_string(),
        }
    }
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::Io {
                path,
                file_size,
                detail,
            } => write!(f, "ledger io error ({path}, {file_size} bytes): {detail}"),
            IngestError::MissingHeader { file_size } => {
                write!(f, "ledger has no header row ({file_size} bytes)")
            }
            IngestError::MissingKeyColumn { file_size, headers } => write!(
                f,
                "ledger header has no vale/document column ({file_size} bytes, {} columns: {:?})",
                headers.len(),
                headers.iter().take(12).collect::<Vec<_>>()
            ),
            IngestError::HeaderRedetected { row, file_size } => write!(
                f,
                "ledger header re-detected at data row {row} ({file_size} bytes); \
                 concatenated or reshaped exports are not supported"
            ),
            IngestError::NoCandidateKeys => {
                write!(f, "no candidate keys: the primary ledgers yielded no valid vale numbers")
            }
            IngestError::Cancelled { rows_seen } => {
                write!(f, "ledger scan cancelled after {rows_seen} rows")
            }
        }
    }
}

impl std::error::Error for IngestError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_distinguish_failure_classes() {
        assert_eq!(IngestError::NoCandidateKeys.kind(), FailureKind::NoCandidateKeys);
        assert_eq!(
            IngestError::MissingHeader { file_size: 0 }.kind(),
            FailureKind::BadInput
        );
        assert_eq!(
            IngestError::io("x.csv", 10, "denied").kind(),
            FailureKind::Io
        );
    }

    #[test]
    fn display_carries_file_size() {
        let e = IngestError::io("big.csv", 3_000_000_000, "permission denied");
        let s = e.to_string();
        assert!(s.contains("big.csv"));
        assert!(s.contains("3000000000"));
        assert!(s.contains("permission denied"));

        let s = IngestError::HeaderRedetected {
            row: 41,
            file_size: 99,
        }
        .to_string();
        assert!(s.contains("row 41"));
        assert!(s.contains("99 bytes"));
    }
}
