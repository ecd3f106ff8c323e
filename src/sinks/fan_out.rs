//! Fan-out sink
//!
//! Forwards every write to an ordered list of sinks. Each sink gets the
//! write attempt no matter what earlier ones returned; failures are reported
//! per sink through [`Diagnostics`] and the fan-out write itself succeeds.

use crate::core::{Diagnostics, Result, Sink};
use std::sync::Arc;

/// # Examples
///
/// ```
/// use sitelog::sinks::{FanOutSink, MemorySink};
/// use sitelog::Sink;
/// use std::sync::Arc;
///
/// let a = Arc::new(MemorySink::new());
/// let b = Arc::new(MemorySink::new());
/// let fan_out = FanOutSink::new(vec![a.clone(), b.clone()]);
///
/// fan_out.write(b"I both\n").unwrap();
/// assert_eq!(a.contents_string(), b.contents_string());
/// ```
pub struct FanOutSink {
    targets: Vec<Arc<dyn Sink>>,
    diagnostics: Diagnostics,
}

impl FanOutSink {
    /// Fan out to `targets`, in order
    pub fn new<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = Arc<S>>,
        S: Sink + ?Sized + 'static,
    {
        Self {
            targets: targets
                .into_iter()
                .map(|target| Arc::new(target) as Arc<dyn Sink>)
                .collect(),
            diagnostics: Diagnostics::default(),
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Append one more target
    #[must_use = "builder methods return a new value"]
    pub fn with_target<S: Sink + 'static>(mut self, target: S) -> Self {
        self.targets.push(Arc::new(target));
        self
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl Sink for FanOutSink {
    fn write(&self, buf: &[u8]) -> Result<()> {
        for target in &self.targets {
            if let Err(e) = target.write(buf) {
                self.diagnostics.report(target.name(), e);
            }
        }
        Ok(())
    }

    /// Flushes every target and returns the first failure, if any
    fn flush(&self) -> Result<()> {
        let mut first_error = None;
        for target in &self.targets {
            if let Err(e) = target.flush() {
                if first_error.is_none() {
                    first_error = Some(e);
                } else {
                    self.diagnostics.report(target.name(), e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "FanOutSink"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LoggerError;
    use crate::sinks::MemorySink;

    struct BrokenSink;

    impl Sink for BrokenSink {
        fn write(&self, _buf: &[u8]) -> Result<()> {
            Err(LoggerError::writer("broken pipe"))
        }

        fn flush(&self) -> Result<()> {
            Err(LoggerError::writer("broken pipe"))
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    #[test]
    fn test_every_target_receives_write() {
        let first = Arc::new(MemorySink::new());
        let second = Arc::new(MemorySink::new());
        let fan_out = FanOutSink::new(vec![Arc::clone(&first), Arc::clone(&second)]);

        fan_out.write(b"W both\n").unwrap();

        assert_eq!(first.contents_string(), "W both\n");
        assert_eq!(second.contents_string(), "W both\n");
    }

    #[test]
    fn test_failure_does_not_stop_later_targets() {
        let (diagnostics, receiver) = Diagnostics::channel(8);
        let survivor = Arc::new(MemorySink::new());
        let fan_out = FanOutSink::new(vec![Arc::new(BrokenSink) as Arc<dyn Sink>])
            .with_target(Arc::clone(&survivor))
            .with_diagnostics(diagnostics);

        assert!(fan_out.write(b"E still delivered\n").is_ok());
        assert_eq!(survivor.contents_string(), "E still delivered\n");

        let report = receiver.try_recv().unwrap();
        assert_eq!(report.component, "broken");
        assert_eq!(fan_out.len(), 2);
    }

    #[test]
    fn test_flush_returns_first_failure() {
        let fan_out = FanOutSink::new(vec![Arc::new(BrokenSink) as Arc<dyn Sink>])
            .with_diagnostics(Diagnostics::Silent);
        assert!(fan_out.flush().is_err());
    }

    #[test]
    fn test_empty_fan_out() {
        let fan_out = FanOutSink::new(Vec::<Arc<MemorySink>>::new());
        assert!(fan_out.is_empty());
        assert!(fan_out.write(b"nowhere\n").is_ok());
    }
}
