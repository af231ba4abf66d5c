//! Observation sink: the append-only side channel for mirrored traffic.
//!
//! # Responsibilities
//! - Accept raw bytes and formatted banners from concurrent requests
//! - Keep every single `write` call atomic (no torn writes)
//! - Never fail the real data path: see [`mirror`]
//!
//! # Design Decisions
//! - Each implementation holds its lock for exactly one call
//! - Ordering across requests is not guaranteed, only within one request

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::observability::metrics;

/// Destination for mirrored bytes.
pub trait ObservationSink: Send + Sync {
    /// Append `buf` as one atomic unit.
    fn write(&self, buf: &[u8]) -> io::Result<()>;
}

/// Sink shared by every in-flight request.
pub type SharedSink = Arc<dyn ObservationSink>;

/// Writes to process standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl ObservationSink for StdoutSink {
    fn write(&self, buf: &[u8]) -> io::Result<()> {
        let mut out = io::stdout().lock();
        out.write_all(buf)?;
        out.flush()
    }
}

/// Appends to a file opened once at startup.
#[derive(Debug)]
pub struct FileSink {
    file: Mutex<File>,
}

impl FileSink {
    /// Open (or create) `path` in append mode.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl ObservationSink for FileSink {
    fn write(&self, buf: &[u8]) -> io::Result<()> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::other("file sink lock poisoned"))?;
        file.write_all(buf)
    }
}

/// In-memory sink, mostly useful for tests and embedding.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far.
    pub fn contents(&self) -> Vec<u8> {
        self.buf.lock().map(|b| b.clone()).unwrap_or_default()
    }

    /// Everything written so far, lossily decoded.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.contents()).into_owned()
    }
}

impl ObservationSink for MemorySink {
    fn write(&self, buf: &[u8]) -> io::Result<()> {
        let mut inner = self
            .buf
            .lock()
            .map_err(|_| io::Error::other("memory sink lock poisoned"))?;
        inner.extend_from_slice(buf);
        Ok(())
    }
}

/// Best-effort write. Sink failures are logged and counted, never returned.
pub fn mirror(sink: &dyn ObservationSink, buf: &[u8]) {
    if buf.is_empty() {
        return;
    }
    if let Err(e) = sink.write(buf) {
        metrics::record_mirror_error();
        tracing::warn!(error = %e, bytes = buf.len(), "Observation sink write failed");
    }
}
