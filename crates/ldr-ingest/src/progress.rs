use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Receiver of `(percent, status text)` updates.
///
/// Cadence is bounded but unspecified; the last call of a successful stage
/// always reports 100.
pub trait ProgressSink {
    fn report(&mut self, percent: u8, status: &str);
}

impl<F> ProgressSink for F
where
    F: FnMut(u8, &str),
{
    fn report(&mut self, percent: u8, status: &str) {
        self(percent, status)
    }
}

/// Discards updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _percent: u8, _status: &str) {}
}

/// Cancellation handle shared between the caller and a running scan.
///
/// Checked at chunk boundaries only.
#[derive(Debug, Default, Clone)]
pub struct ScanCancel(Arc<AtomicBool>);

impl ScanCancel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
