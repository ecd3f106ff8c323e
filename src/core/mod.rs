//! Core logger types and traits

pub mod call_site;
pub mod config;
pub mod cow;
pub mod diagnostics;
pub mod error;
pub mod filter_state;
pub mod header;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod sink;
pub mod stack_trace;

pub use call_site::{resolve, short_file_name, CallSite, CallSiteKey, UNKNOWN_FILE};
pub use config::{parse_trace_points, FileFilter, LogConfig};
pub use cow::CowCell;
pub use diagnostics::{Diagnostic, DiagnosticCallback, Diagnostics};
pub use error::{LoggerError, Result};
pub use filter_state::{FilterState, MaskPolicy};
pub use header::{HeaderFlags, HeaderFormat};
pub use log_level::{LevelMask, LogLevel};
pub use logger::{Clock, Logger, LoggerBuilder, FATAL_EXIT_CODE, TRACE_SKIP_FRAMES};
pub use metrics::LoggerMetrics;
pub use sink::Sink;
