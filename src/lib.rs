//! # sitelog
//!
//! A leveled logger that knows where it was called from.
//!
//! ## Features
//!
//! - **Per-file filtering**: a global level mask plus overrides keyed by
//!   source file name, changeable at runtime without stalling log calls
//! - **Trace points**: arm a `file:line` and every log call there also
//!   writes a stack trace of the calling thread
//! - **Composable sinks**: rotating log directory, fan-out, serialized
//!   writers, console and in-memory sinks
//! - **Thread safe**: one line per write, no torn statements
//!
//! ## Example
//!
//! ```
//! use sitelog::prelude::*;
//! use std::sync::Arc;
//!
//! let filters = Arc::new(FilterState::new());
//! let sink = Arc::new(MemorySink::new());
//! let logger = Logger::builder()
//!     .sink(Arc::clone(&sink))
//!     .flags(HeaderFlags::LEVEL | HeaderFlags::SHORT_FILE)
//!     .filter_state(Arc::clone(&filters))
//!     .build();
//!
//! sitelog::info!(logger, "listening on port {}", 8080);
//! sitelog::debug!(logger, "hidden by the default mask");
//!
//! let here = CallSite::caller();
//! filters.set_file_mask(here.file_name(), LevelMask::from(LogLevel::Debug));
//! sitelog::debug!(logger, "now visible");
//!
//! assert_eq!(sink.lines().len(), 2);
//! assert!(sink.lines()[1].starts_with(&format!("D {}:", here.file_name())));
//! ```

pub mod core;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        CallSite, CallSiteKey, Diagnostics, FileFilter, FilterState, HeaderFlags, HeaderFormat,
        LevelMask, LogConfig, LogLevel, Logger, LoggerBuilder, LoggerError, LoggerMetrics,
        MaskPolicy, Result, Sink,
    };
    pub use crate::sinks::{
        ConsoleSink, DiscardSink, FanOutSink, MemorySink, RotatingFileSink, RotationPolicy,
        SerializingSink,
    };
}

pub use crate::core::{
    CallSite, CallSiteKey, Diagnostic, Diagnostics, FileFilter, FilterState, HeaderFlags,
    HeaderFormat, LevelMask, LogConfig, LogLevel, Logger, LoggerBuilder, LoggerError,
    LoggerMetrics, MaskPolicy, Result, Sink, FATAL_EXIT_CODE,
};
pub use crate::sinks::{
    ConsoleSink, DiscardSink, FanOutSink, MemorySink, RotatingFileSink, RotationPolicy,
    SerializingSink,
};
