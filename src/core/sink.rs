//! Sink trait for log output destinations

use super::error::Result;

/// Destination for formatted log bytes.
///
/// `write` hands one complete log statement (header, message and trailing
/// newline, or one whole stack trace) to the destination and returns once
/// the bytes have been passed on, or fails with the I/O error. Sinks are
/// shared between threads, so every method takes `&self`; a destination
/// that needs exclusive access must synchronize internally or be wrapped in
/// a [`SerializingSink`](crate::sinks::SerializingSink).
pub trait Sink: Send + Sync {
    fn write(&self, buf: &[u8]) -> Result<()>;
    fn flush(&self) -> Result<()>;
    fn name(&self) -> &str;
}

impl<S: Sink + ?Sized> Sink for std::sync::Arc<S> {
    fn write(&self, buf: &[u8]) -> Result<()> {
        (**self).write(buf)
    }

    fn flush(&self) -> Result<()> {
        (**self).flush()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn write(&self, buf: &[u8]) -> Result<()> {
        (**self).write(buf)
    }

    fn flush(&self) -> Result<()> {
        (**self).flush()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
