//! Diagnostic side channel for failures inside the logger
//!
//! Logging must never fail its caller, so sink write errors, symlink
//! failures and similar problems are reported here instead of being
//! returned. Reporting is always best effort and never blocks.

use super::error::LoggerError;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::fmt;
use std::sync::Arc;

/// Callback invoked with the reporting component's name and the error
pub type DiagnosticCallback = Arc<dyn Fn(&str, &LoggerError) + Send + Sync>;

/// One reported failure, as delivered through [`Diagnostics::channel`]
#[derive(Debug)]
pub struct Diagnostic {
    pub component: String,
    pub error: LoggerError,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.component, self.error)
    }
}

/// Where internal failures go
///
/// # Example
///
/// ```
/// use sitelog::{Diagnostics, LoggerError};
///
/// let (diagnostics, receiver) = Diagnostics::channel(16);
/// diagnostics.report("file", LoggerError::writer("disk full"));
///
/// let diagnostic = receiver.try_recv().unwrap();
/// assert_eq!(diagnostic.component, "file");
/// ```
#[derive(Clone, Default)]
pub enum Diagnostics {
    /// Print `[LOGGER ERROR] ...` lines to standard error (default)
    #[default]
    Stderr,

    /// Drop every report
    Silent,

    /// Hand every report to a callback
    Callback(DiagnosticCallback),

    /// Queue reports on a bounded channel; reports are dropped when full
    Channel(Sender<Diagnostic>),
}

impl Diagnostics {
    /// Bounded channel pair; the receiver side is for the embedder to drain
    pub fn channel(capacity: usize) -> (Self, Receiver<Diagnostic>) {
        let (sender, receiver) = bounded(capacity);
        (Diagnostics::Channel(sender), receiver)
    }

    pub fn callback(callback: impl Fn(&str, &LoggerError) + Send + Sync + 'static) -> Self {
        Diagnostics::Callback(Arc::new(callback))
    }

    pub fn report(&self, component: &str, error: LoggerError) {
        match self {
            Diagnostics::Stderr => eprintln!("[LOGGER ERROR] {}: {}", component, error),
            Diagnostics::Silent => {}
            Diagnostics::Callback(callback) => callback(component, &error),
            Diagnostics::Channel(sender) => {
                let diagnostic = Diagnostic {
                    component: component.to_string(),
                    error,
                };
                match sender.try_send(diagnostic) {
                    Ok(()) | Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {}
                }
            }
        }
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostics::Stderr => write!(f, "Stderr"),
            Diagnostics::Silent => write!(f, "Silent"),
            Diagnostics::Callback(_) => write!(f, "Callback"),
            Diagnostics::Channel(_) => write!(f, "Channel"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_callback_receives_reports() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        let diagnostics = Diagnostics::callback(move |component, _error| {
            assert_eq!(component, "fan-out");
            count_clone.fetch_add(1, Ordering::Relaxed);
        });

        diagnostics.report("fan-out", LoggerError::other("boom"));
        diagnostics.report("fan-out", LoggerError::other("boom"));
        assert_eq!(count.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_full_channel_never_blocks() {
        let (diagnostics, receiver) = Diagnostics::channel(1);
        diagnostics.report("a", LoggerError::other("first"));
        diagnostics.report("a", LoggerError::other("second"));

        assert_eq!(receiver.len(), 1);
        let diagnostic = receiver.try_recv().unwrap();
        assert_eq!(diagnostic.to_string(), "a: first");
    }

    #[test]
    fn test_disconnected_channel_is_ignored() {
        let (diagnostics, receiver) = Diagnostics::channel(1);
        drop(receiver);
        diagnostics.report("a", LoggerError::other("lost"));
    }

    #[test]
    fn test_silent() {
        Diagnostics::Silent.report("a", LoggerError::other("ignored"));
    }
}
