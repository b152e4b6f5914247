//! ldr-ingest
//!
//! Streaming scan of the management ledger into a key index.
//!
//! The ledger can be several gigabytes; it is read in chunks and only rows
//! whose normalised identifier belongs to the candidate set survive. At end of
//! stream every group is ordered by revision and given its derived fields
//! (emission status, certification), producing a [`FinalizedIndex`].
//!
//! Header names are resolved through alias tables that tolerate accents,
//! case and encoding damage. Undecodable bytes are replaced, never fatal.
//! Structural failures (no header, no key column, a header repeated mid-file,
//! I/O) surface as [`IngestError`]; row-level defects are counted in
//! [`ScanStats`].

pub mod columns;
pub mod delimiter;
mod derive;
mod error;
mod index;
mod progress;
mod stream;

pub use columns::{
    alias_key, resolve_columns, ColumnMapping, MappingReport, MatchedBy, PrimaryField,
    LEDGER_ALIASES, PRIMARY_ALIASES,
};
pub use delimiter::{delimiter_name, sniff_delimiter};
pub use derive::{
    assign_certification, assign_emission, finalize, order_group, revision_order,
    UNORDERED_REVISION,
};
pub use error::{FailureKind, IngestError};
pub use index::{FinalizedIndex, KeyGroup, KeyIndex};
pub use progress::{NoProgress, ProgressSink, ScanCancel};
pub use stream::{process_file, scan_reader, Chunk, ChunkReader, ScanOutcome, ScanStats};
