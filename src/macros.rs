//! Logging macros for ergonomic log message formatting.
//!
//! These macros take `println!`-style arguments and hand them to the
//! logger as `fmt::Arguments`, so a message that is filtered out is never
//! formatted. The reported call site is the macro invocation.
//!
//! # Examples
//!
//! ```
//! use sitelog::prelude::*;
//! use sitelog::info;
//!
//! let logger = Logger::new(DiscardSink);
//!
//! // Basic logging
//! info!(logger, "Server started");
//!
//! // With format arguments
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port);
//! ```

/// Log a message at an explicit level.
///
/// `log!(logger, LogLevel::Fatal, ..)` writes a fatal line without
/// exiting; use [`fatal!`] to terminate.
///
/// # Examples
///
/// ```
/// # use sitelog::prelude::*;
/// # let logger = Logger::new(DiscardSink);
/// use sitelog::log;
/// log!(logger, LogLevel::Info, "Simple message");
/// log!(logger, LogLevel::Error, "Error code: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.log($level, format_args!($($arg)+))
    };
}

/// Log a debug-level message.
///
/// # Examples
///
/// ```
/// # use sitelog::prelude::*;
/// # let logger = Logger::new(DiscardSink);
/// use sitelog::debug;
/// debug!(logger, "Counter value: {}", 10);
/// ```
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $logger.debugf(format_args!($($arg)+))
    };
}

/// Log an info-level message.
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $logger.infof(format_args!($($arg)+))
    };
}

/// Log a warning-level message.
///
/// # Examples
///
/// ```
/// # use sitelog::prelude::*;
/// # let logger = Logger::new(DiscardSink);
/// use sitelog::warn;
/// warn!(logger, "Retry attempt {} of {}", 3, 5);
/// ```
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $logger.warnf(format_args!($($arg)+))
    };
}

/// Log an error-level message.
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $logger.errorf(format_args!($($arg)+))
    };
}

/// Log a fatal-level message, flush, and exit the process.
///
/// # Examples
///
/// ```no_run
/// # use sitelog::prelude::*;
/// # let logger = Logger::new(DiscardSink);
/// use sitelog::fatal;
/// fatal!(logger, "Unable to recover from error: {}", "disk full");
/// ```
#[macro_export]
macro_rules! fatal {
    ($logger:expr, $($arg:tt)+) => {
        $logger.fatalf(format_args!($($arg)+))
    };
}

#[cfg(test)]
mod tests {
    use crate::core::{FilterState, HeaderFlags, LevelMask, LogLevel, Logger};
    use crate::sinks::MemorySink;
    use std::sync::Arc;

    fn test_logger() -> (Logger, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let filters = Arc::new(FilterState::new());
        filters.set_global_mask(LevelMask::ALL);
        let logger = Logger::builder()
            .sink(Arc::clone(&sink))
            .flags(HeaderFlags::LEVEL | HeaderFlags::SHORT_FILE)
            .filter_state(filters)
            .build();
        (logger, sink)
    }

    #[test]
    fn test_level_macros() {
        let (logger, sink) = test_logger();
        info!(logger, "Items: {}", 100);
        warn!(logger, "Retry {} of {}", 1, 3);
        error!(logger, "Code: {}", 500);
        debug!(logger, "Count: {}", 5);
        log!(logger, LogLevel::Fatal, "Not exiting");

        let lines = sink.lines();
        let messages: Vec<(&str, &str)> = lines
            .iter()
            .map(|line| {
                let (header, message) = line.split_once(' ').unwrap();
                let (_, message) = message.split_once(' ').unwrap();
                (header, message)
            })
            .collect();
        assert_eq!(
            messages,
            vec![
                ("I", "Items: 100"),
                ("W", "Retry 1 of 3"),
                ("E", "Code: 500"),
                ("D", "Count: 5"),
                ("F", "Not exiting"),
            ]
        );
    }

    #[test]
    fn test_macro_reports_invocation_line() {
        let (logger, sink) = test_logger();
        let expected_line = line!() + 1;
        info!(logger, "here");
        assert_eq!(
            sink.contents_string(),
            format!("I macros.rs:{} here\n", expected_line)
        );
    }
}
