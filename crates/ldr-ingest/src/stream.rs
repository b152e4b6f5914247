//! Streaming scan of the management ledger.
//!
//! The file is read in bounded chunks (sized by [`ScanConfig::chunk_bytes_for`])
//! and never held in memory as a whole. Each row's identifier is normalised
//! and tested against the candidate set; rows that miss are dropped before
//! being reduced to a [`LedgerRow`], so memory follows the matched rows, not the
//! file.
//!
//! Two entry points share the same parser:
//! - [`scan_reader`] runs on the caller's thread.
//! - [`process_file`] parses on a blocking thread and hands chunks to the async
//!   caller through a bounded channel, yielding at every chunk boundary so the
//!   host runtime stays responsive. One producer and one consumer keep rows in
//!   stream order.
//!
//! Both finish by finalizing the index (`crate::derive`) before returning.

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use csv::ByteRecord;
use ldr_config::{EngineConfig, ScanConfig};
use ldr_schemas::{normalize_key, CandidateKeySet, LedgerRow, NormalizedKey};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::columns::{ColumnMapping, MappingReport};
use crate::delimiter::{delimiter_name, sniff_delimiter};
use crate::derive::finalize;
use crate::error::IngestError;
use crate::index::{FinalizedIndex, KeyIndex};
use crate::progress::{ProgressSink, ScanCancel};

/// Bytes inspected for delimiter sniffing.
const SNIFF_BYTES: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Scan metadata returned alongside the index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub file_size: u64,
    pub delimiter: String,
    pub chunk_bytes: u64,
    pub chunks: u64,
    pub bytes_read: u64,
    pub rows_seen: u64,
    pub rows_matched: u64,
    /// Rows whose field count differs from the header's; skipped.
    pub rows_malformed: u64,
    /// Rows with blank identifiers in both key columns; skipped.
    pub rows_without_key: u64,
    pub keys_requested: u64,
    pub keys_found: u64,
    pub elapsed_ms: u64,
}

/// Everything a scan produces.
#[derive(Debug)]
pub struct ScanOutcome {
    pub index: FinalizedIndex,
    pub stats: ScanStats,
    pub mapping: MappingReport,
}

// ---------------------------------------------------------------------------
// Chunk parser
// ---------------------------------------------------------------------------

/// Rows parsed between two suspension points. Only admitted rows are kept.
#[derive(Debug, Default)]
pub struct Chunk {
    pub rows_seen: u64,
    pub rows_malformed: u64,
    pub rows_without_key: u64,
    /// Absolute byte offset reached at the end of this chunk.
    pub position: u64,
    pub matched: Vec<(NormalizedKey, LedgerRow)>,
}

/// Pull parser yielding one [`Chunk`] at a time.
pub struct ChunkReader<R: Read> {
    rdr: csv::Reader<R>,
    mapping: ColumnMapping,
    keys: Arc<CandidateKeySet>,
    record: ByteRecord,
    source: String,
    file_size: u64,
    chunk_bytes: u64,
    row_number: u64,
    done: bool,
}

impl<R: Read> ChunkReader<R> {
    /// Read and resolve the header row. Fails when the header is missing or
    /// names no identifying column.
    pub fn new(
        reader: R,
        delimiter: u8,
        keys: Arc<CandidateKeySet>,
        chunk_bytes: u64,
        source: &str,
        file_size: u64,
    ) -> Result<Self, IngestError> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .has_headers(true)
            .from_reader(reader);

        let raw_headers = rdr.byte_headers().map_err(|e| {
            if e.is_io_error() {
                IngestError::io(source, file_size, e)
            } else {
                IngestError::MissingHeader { file_size }
            }
        })?;
        let headers: Vec<String> = raw_headers
            .iter()
            .map(|h| {
                String::from_utf8_lossy(h)
                    .trim_start_matches('\u{FEFF}')
                    .trim()
                    .to_string()
            })
            .collect();

        if headers.iter().all(|h| h.is_empty()) {
            return Err(IngestError::MissingHeader { file_size });
        }

        let mapping = ColumnMapping::resolve(headers);
        if !mapping.has_identifier() {
            return Err(IngestError::MissingKeyColumn {
                file_size,
                headers: mapping.headers().to_vec(),
            });
        }

        Ok(Self {
            rdr,
            mapping,
            keys,
            record: ByteRecord::new(),
            source: source.to_string(),
            file_size,
            chunk_bytes: chunk_bytes.max(1),
            row_number: 0,
            done: false,
        })
    }

    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    /// Next chunk, or `None` at end of stream.
    pub fn next_chunk(&mut self) -> Result<Option<Chunk>, IngestError> {
        if self.done {
            return Ok(None);
        }

        let start = self.rdr.position().byte();
        let mut chunk = Chunk::default();

        loop {
            match self.rdr.read_byte_record(&mut self.record) {
                Ok(true) => {
                    self.row_number += 1;
                    chunk.rows_seen += 1;
                    self.admit(&mut chunk)?;
                }
                Ok(false) => {
                    self.done = true;
                    break;
                }
                Err(e) if e.is_io_error() => {
                    return Err(IngestError::io(&self.source, self.file_size, e));
                }
                Err(_) => {
                    self.row_number += 1;
                    chunk.rows_seen += 1;
                    chunk.rows_malformed += 1;
                }
            }

            if self.rdr.position().byte().saturating_sub(start) >= self.chunk_bytes {
                break;
            }
        }

        chunk.position = self.rdr.position().byte();
        if self.done && chunk.rows_seen == 0 {
            return Ok(None);
        }
        Ok(Some(chunk))
    }

    fn admit(&self, chunk: &mut Chunk) -> Result<(), IngestError> {
        let identifier = self.mapping.identifier(&self.record);

        if let Some(id) = identifier.as_deref() {
            if self.mapping.looks_like_header(id, &self.record) {
                return Err(IngestError::HeaderRedetected {
                    row: self.row_number,
                    file_size: self.file_size,
                });
            }
        }

        if self.record.len() != self.mapping.headers().len() {
            chunk.rows_malformed += 1;
            return Ok(());
        }

        let Some(raw_key) = identifier else {
            chunk.rows_without_key += 1;
            return Ok(());
        };

        let Some(key) = self.keys.get(&normalize_key(&raw_key)) else {
            return Ok(());
        };

        let row = self.mapping.reduce(&self.record, self.row_number, raw_key);
        chunk.matched.push((key.clone(), row));
        Ok(())
    }
}

/// Sniff the delimiter from the buffered head of `reader` and open a
/// [`ChunkReader`] over it.
fn open_chunks<R: Read>(
    reader: R,
    keys: Arc<CandidateKeySet>,
    chunk_bytes: u64,
    source: &str,
    file_size: u64,
) -> Result<(ChunkReader<BufReader<R>>, u8), IngestError> {
    let mut buf = BufReader::with_capacity(SNIFF_BYTES, reader);
    let delimiter = {
        let head = buf
            .fill_buf()
            .map_err(|e| IngestError::io(source, file_size, e))?;
        sniff_delimiter(head)
    };
    let chunks = ChunkReader::new(buf, delimiter, keys, chunk_bytes, source, file_size)?;
    Ok((chunks, delimiter))
}

// ---------------------------------------------------------------------------
// Index builder (consumer side)
// ---------------------------------------------------------------------------

struct IndexBuilder {
    index: KeyIndex,
    stats: ScanStats,
    mapping: MappingReport,
    progress_every: u64,
    next_report_at: u64,
    started: Instant,
}

impl IndexBuilder {
    fn new(
        scan: &ScanConfig,
        mapping: &ColumnMapping,
        delimiter: u8,
        chunk_bytes: u64,
        file_size: u64,
        keys_requested: usize,
        source: &str,
    ) -> Self {
        let report = mapping.report();
        info!(
            source,
            file_size,
            delimiter = delimiter_name(delimiter),
            chunk_bytes,
            keys_requested,
            resolved = report.resolved.len(),
            "ledger scan started"
        );
        if !report.absent.is_empty() {
            warn!(absent = ?report.absent, "ledger columns not found; fields will read empty");
        }
        if !report.literal_matches.is_empty() {
            debug!(literal = ?report.literal_matches, "columns bound by literal alias fallback");
        }

        let progress_every = scan.progress_every(file_size);
        Self {
            index: KeyIndex::new(),
            stats: ScanStats {
                file_size,
                delimiter: delimiter_name(delimiter).to_string(),
                chunk_bytes,
                keys_requested: keys_requested as u64,
                ..ScanStats::default()
            },
            mapping: report,
            progress_every,
            next_report_at: progress_every,
            started: Instant::now(),
        }
    }

    fn absorb<P: ProgressSink + ?Sized>(&mut self, chunk: Chunk, progress: &mut P) {
        let s = &mut self.stats;
        s.chunks += 1;
        s.rows_seen += chunk.rows_seen;
        s.rows_malformed += chunk.rows_malformed;
        s.rows_without_key += chunk.rows_without_key;
        s.rows_matched += chunk.matched.len() as u64;
        s.bytes_read = chunk.position;

        debug!(
            chunk = s.chunks,
            rows = chunk.rows_seen,
            matched = chunk.matched.len(),
            position = chunk.position,
            "ledger chunk absorbed"
        );

        for (key, row) in chunk.matched {
            self.index.push(key, row);
        }

        if self.stats.rows_seen >= self.next_report_at {
            let status = format!(
                "scanning ledger: {} rows read, {} matched",
                self.stats.rows_seen, self.stats.rows_matched
            );
            progress.report(scan_percent(self.stats.bytes_read, self.stats.file_size), &status);
            self.next_report_at = self.stats.rows_seen + self.progress_every;
        }
    }

    fn finish<P: ProgressSink + ?Sized>(
        self,
        cfg: &EngineConfig,
        progress: &mut P,
    ) -> ScanOutcome {
        progress.report(99, "finalizing key index");

        let index = finalize(self.index, &cfg.codes);
        let mut stats = self.stats;
        stats.keys_found = index.len() as u64;
        stats.elapsed_ms = self.started.elapsed().as_millis() as u64;

        info!(
            rows_seen = stats.rows_seen,
            rows_matched = stats.rows_matched,
            rows_malformed = stats.rows_malformed,
            keys_found = stats.keys_found,
            keys_requested = stats.keys_requested,
            elapsed_ms = stats.elapsed_ms,
            "ledger scan complete"
        );

        progress.report(
            100,
            &format!(
                "ledger scan complete: {} of {} keys found",
                stats.keys_found, stats.keys_requested
            ),
        );

        ScanOutcome {
            index,
            stats,
            mapping: self.mapping,
        }
    }
}

/// Percent of the file consumed, capped below 100 until finalization.
fn scan_percent(bytes_read: u64, file_size: u64) -> u8 {
    if file_size == 0 {
        return 99;
    }
    (bytes_read.saturating_mul(100) / file_size).min(98) as u8
}

// ---------------------------------------------------------------------------
// Synchronous entry point
// ---------------------------------------------------------------------------

/// Scan `reader` on the current thread.
///
/// `source` names the input in errors and logs; `file_size` drives chunk
/// sizing and progress (pass the best estimate available).
pub fn scan_reader<R, P>(
    reader: R,
    source: &str,
    file_size: u64,
    keys: Arc<CandidateKeySet>,
    cfg: &EngineConfig,
    progress: &mut P,
    cancel: &ScanCancel,
) -> Result<ScanOutcome, IngestError>
where
    R: Read,
    P: ProgressSink + ?Sized,
{
    if keys.is_empty() {
        return Err(IngestError::NoCandidateKeys);
    }

    let chunk_bytes = cfg.scan.chunk_bytes_for(file_size);
    let keys_requested = keys.len();
    let (mut chunks, delimiter) = open_chunks(reader, keys, chunk_bytes, source, file_size)?;
    let mut builder = IndexBuilder::new(
        &cfg.scan,
        chunks.mapping(),
        delimiter,
        chunk_bytes,
        file_size,
        keys_requested,
        source,
    );

    while let Some(chunk) = chunks.next_chunk()? {
        builder.absorb(chunk, progress);
        if cancel.is_cancelled() {
            return Err(cancelled(&builder));
        }
    }

    Ok(builder.finish(cfg, progress))
}

fn cancelled(builder: &IndexBuilder) -> IngestError {
    warn!(rows_seen = builder.stats.rows_seen, "ledger scan cancelled; partial index discarded");
    IngestError::Cancelled {
        rows_seen: builder.stats.rows_seen,
    }
}

// ---------------------------------------------------------------------------
// Async entry point
// ---------------------------------------------------------------------------

enum Produced {
    Opened { mapping: ColumnMapping, delimiter: u8 },
    Chunk(Chunk),
}

/// Scan the ledger at `path`, parsing on a blocking thread.
///
/// The parser sends one chunk at a time through a channel of
/// `scan.channel_capacity`; after absorbing each chunk this task yields (or
/// sleeps `scan.yield_pause_ms`). Cancelling drops the partial index.
pub async fn process_file<P>(
    path: &Path,
    keys: Arc<CandidateKeySet>,
    cfg: &EngineConfig,
    progress: &mut P,
    cancel: &ScanCancel,
) -> Result<ScanOutcome, IngestError>
where
    P: ProgressSink + Send + ?Sized,
{
    if keys.is_empty() {
        return Err(IngestError::NoCandidateKeys);
    }

    let source = path.display().to_string();
    let file_size = tokio::fs::metadata(path)
        .await
        .map_err(|e| IngestError::io(&source, 0, e))?
        .len();
    let chunk_bytes = cfg.scan.chunk_bytes_for(file_size);
    let keys_requested = keys.len();

    progress.report(0, "opening ledger");

    let (tx, mut rx) = mpsc::channel(cfg.scan.channel_capacity.max(1));
    let producer = {
        let path = path.to_path_buf();
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || produce(path, file_size, chunk_bytes, keys, cancel, tx))
    };

    let mut builder: Option<IndexBuilder> = None;
    while let Some(msg) = rx.recv().await {
        match msg? {
            Produced::Opened { mapping, delimiter } => {
                builder = Some(IndexBuilder::new(
                    &cfg.scan,
                    &mapping,
                    delimiter,
                    chunk_bytes,
                    file_size,
                    keys_requested,
                    &source,
                ));
            }
            Produced::Chunk(chunk) => {
                if let Some(b) = builder.as_mut() {
                    b.absorb(chunk, progress);
                }
            }
        }

        if cancel.is_cancelled() {
            drop(rx);
            if let Err(e) = producer.await {
                warn!(error = %e, "parser task failed during cancellation");
            }
            let rows_seen = builder.as_ref().map_or(0, |b| b.stats.rows_seen);
            warn!(rows_seen, "ledger scan cancelled; partial index discarded");
            return Err(IngestError::Cancelled { rows_seen });
        }

        pause_at_chunk_boundary(cfg.scan.yield_pause_ms).await;
    }

    producer
        .await
        .map_err(|e| IngestError::io(&source, file_size, format!("parser task failed: {e}")))?;

    let builder = builder.ok_or(IngestError::MissingHeader { file_size })?;
    Ok(builder.finish(cfg, progress))
}

async fn pause_at_chunk_boundary(pause_ms: u64) {
    if pause_ms == 0 {
        tokio::task::yield_now().await;
    } else {
        tokio::time::sleep(Duration::from_millis(pause_ms)).await;
    }
}

/// Blocking producer. Errors go down the channel; a closed channel means the
/// consumer stopped listening and parsing ends quietly.
fn produce(
    path: PathBuf,
    file_size: u64,
    chunk_bytes: u64,
    keys: Arc<CandidateKeySet>,
    cancel: ScanCancel,
    tx: mpsc::Sender<Result<Produced, IngestError>>,
) {
    if let Err(e) = produce_chunks(&path, file_size, chunk_bytes, keys, &cancel, &tx) {
        let _ = tx.blocking_send(Err(e));
    }
}

fn produce_chunks(
    path: &Path,
    file_size: u64,
    chunk_bytes: u64,
    keys: Arc<CandidateKeySet>,
    cancel: &ScanCancel,
    tx: &mpsc::Sender<Result<Produced, IngestError>>,
) -> Result<(), IngestError> {
    let source = path.display().to_string();
    let file =
        std::fs::File::open(path).map_err(|e| IngestError::io(&source, file_size, e))?;
    let (mut chunks, delimiter) = open_chunks(file, keys, chunk_bytes, &source, file_size)?;

    let opened = Produced::Opened {
        mapping: chunks.mapping().clone(),
        delimiter,
    };
    if tx.blocking_send(Ok(opened)).is_err() {
        return Ok(());
    }

    while let Some(chunk) = chunks.next_chunk()? {
        if cancel.is_cancelled() || tx.blocking_send(Ok(Produced::Chunk(chunk))).is_err() {
            return Ok(());
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
