//! In-memory and discarding sinks

use crate::core::{Result, Sink};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Collects everything written to it; handy for tests and for embedders
/// that ship log output elsewhere themselves.
///
/// # Examples
///
/// ```
/// use sitelog::sinks::MemorySink;
/// use sitelog::Sink;
///
/// let sink = MemorySink::new();
/// sink.write(b"I hello\n").unwrap();
/// assert_eq!(sink.contents_string(), "I hello\n");
/// assert_eq!(sink.write_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemorySink {
    buffer: Mutex<Vec<u8>>,
    writes: AtomicUsize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Vec<u8> {
        self.buffer.lock().clone()
    }

    /// Contents decoded as UTF-8, replacing invalid sequences
    pub fn contents_string(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents_string().lines().map(str::to_string).collect()
    }

    /// Number of `write` calls received
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.lock().is_empty()
    }

    pub fn clear(&self) {
        self.buffer.lock().clear();
        self.writes.store(0, Ordering::Relaxed);
    }
}

impl Sink for MemorySink {
    fn write(&self, buf: &[u8]) -> Result<()> {
        self.buffer.lock().extend_from_slice(buf);
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Accepts and drops every write
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardSink;

impl Sink for DiscardSink {
    fn write(&self, _buf: &[u8]) -> Result<()> {
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "discard"
    }
}
