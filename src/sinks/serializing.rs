//! Serializing sink
//!
//! Puts one mutex in front of a destination so that concurrent `write`
//! calls are delivered one at a time and the bytes of a single call are
//! never split by another thread's write.

use crate::core::{Result, Sink};
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;

enum Target {
    /// A plain writer; only this sink ever touches it
    Writer(Box<dyn Write + Send>),
    /// A sink whose own writes may interleave
    Sink(Arc<dyn Sink>),
}

/// # Examples
///
/// ```
/// use sitelog::sinks::SerializingSink;
/// use sitelog::Sink;
///
/// // Any `io::Write` becomes a thread-safe sink
/// let sink = SerializingSink::new(Vec::<u8>::new());
/// sink.write(b"I serialized\n").unwrap();
/// ```
pub struct SerializingSink {
    target: Mutex<Target>,
}

impl SerializingSink {
    /// Own `writer` and serialize every write to it
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            target: Mutex::new(Target::Writer(Box::new(writer))),
        }
    }

    /// Serialize writes to an existing sink
    pub fn wrap<S: Sink + 'static>(sink: S) -> Self {
        Self {
            target: Mutex::new(Target::Sink(Arc::new(sink))),
        }
    }
}

impl Sink for SerializingSink {
    fn write(&self, buf: &[u8]) -> Result<()> {
        match &mut *self.target.lock() {
            Target::Writer(writer) => writer.write_all(buf)?,
            Target::Sink(sink) => sink.write(buf)?,
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        match &mut *self.target.lock() {
            Target::Writer(writer) => writer.flush()?,
            Target::Sink(sink) => sink.flush()?,
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "SerializingSink"
    }
}
