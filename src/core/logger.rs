//! Main logger implementation
//!
//! Every entry point funnels into one private `dispatch` function that, per
//! call:
//!
//! 1. resolves the caller's file and line,
//! 2. writes a stack trace if that call site is an armed trace point (even
//!    when the message itself is filtered out),
//! 3. decides from the global mask and the file override whether the
//!    message is emitted,
//! 4. renders header + message + newline and hands it to the sink in a
//!    single write.
//!
//! Sink failures never reach the caller; they are counted and reported
//! through [`Diagnostics`].

use super::{
    call_site::CallSite,
    diagnostics::Diagnostics,
    error::Result,
    filter_state::{FilterState, MaskPolicy},
    header::{HeaderFlags, HeaderFormat},
    log_level::LogLevel,
    metrics::LoggerMetrics,
    sink::Sink,
    stack_trace,
};
use crate::sinks::ConsoleSink;
use chrono::{DateTime, Utc};
use std::fmt::{self, Write as _};
use std::sync::Arc;

/// Frames between a trace capture and user code: the public entry point and
/// `dispatch`. Any entry point that stops calling `dispatch` directly breaks
/// this count.
pub const TRACE_SKIP_FRAMES: usize = 2;

/// Process exit status used by [`Logger::fatal`]
pub const FATAL_EXIT_CODE: i32 = 1;

/// Time source for line headers
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct Logger {
    sink: Arc<dyn Sink>,
    header: HeaderFormat,
    filters: Arc<FilterState>,
    policy: MaskPolicy,
    diagnostics: Diagnostics,
    clock: Option<Clock>,
    metrics: LoggerMetrics,
}

impl Logger {
    /// Logger over `sink` using the process-wide [`FilterState`] and the
    /// standard header.
    pub fn new<S: Sink + 'static>(sink: S) -> Self {
        Self::builder().sink(sink).build()
    }

    /// Create a builder for Logger
    ///
    /// # Example
    /// ```
    /// use sitelog::prelude::*;
    /// use std::sync::Arc;
    ///
    /// let sink = Arc::new(MemorySink::new());
    /// let logger = Logger::builder()
    ///     .sink(Arc::clone(&sink))
    ///     .flags(HeaderFlags::LEVEL)
    ///     .filter_state(Arc::new(FilterState::new()))
    ///     .build();
    ///
    /// logger.info("ready");
    /// assert_eq!(sink.contents_string(), "I ready\n");
    /// ```
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    /// Swap the destination; calls already in flight finish on the old sink
    pub fn set_sink<S: Sink + 'static>(&mut self, sink: S) {
        self.sink = Arc::new(sink);
    }

    pub fn filter_state(&self) -> &Arc<FilterState> {
        &self.filters
    }

    pub fn header_format(&self) -> &HeaderFormat {
        &self.header
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }

    pub fn flush(&self) -> Result<()> {
        self.sink.flush()
    }

    /// Log at an explicit level.
    ///
    /// `log(LogLevel::Fatal, ..)` writes a fatal line but does not exit; only
    /// [`Logger::fatal`] terminates the process.
    #[inline(never)]
    #[track_caller]
    pub fn log(&self, level: LogLevel, message: impl fmt::Display) {
        self.dispatch(level, &message);
    }

    #[inline(never)]
    #[track_caller]
    pub fn info(&self, message: impl fmt::Display) {
        self.dispatch(LogLevel::Info, &message);
    }

    #[inline(never)]
    #[track_caller]
    pub fn infof(&self, args: fmt::Arguments<'_>) {
        self.dispatch(LogLevel::Info, &args);
    }

    #[inline(never)]
    #[track_caller]
    pub fn warn(&self, message: impl fmt::Display) {
        self.dispatch(LogLevel::Warn, &message);
    }

    #[inline(never)]
    #[track_caller]
    pub fn warnf(&self, args: fmt::Arguments<'_>) {
        self.dispatch(LogLevel::Warn, &args);
    }

    #[inline(never)]
    #[track_caller]
    pub fn error(&self, message: impl fmt::Display) {
        self.dispatch(LogLevel::Error, &message);
    }

    #[inline(never)]
    #[track_caller]
    pub fn errorf(&self, args: fmt::Arguments<'_>) {
        self.dispatch(LogLevel::Error, &args);
    }

    #[inline(never)]
    #[track_caller]
    pub fn debug(&self, message: impl fmt::Display) {
        self.dispatch(LogLevel::Debug, &message);
    }

    #[inline(never)]
    #[track_caller]
    pub fn debugf(&self, args: fmt::Arguments<'_>) {
        self.dispatch(LogLevel::Debug, &args);
    }

    /// Log at fatal level, flush the sink and exit with [`FATAL_EXIT_CODE`].
    ///
    /// If fatal is filtered out by the masks nothing is written, but the
    /// process still exits.
    #[inline(never)]
    #[track_caller]
    pub fn fatal(&self, message: impl fmt::Display) -> ! {
        self.dispatch(LogLevel::Fatal, &message);
        self.terminate()
    }

    #[inline(never)]
    #[track_caller]
    pub fn fatalf(&self, args: fmt::Arguments<'_>) -> ! {
        self.dispatch(LogLevel::Fatal, &args);
        self.terminate()
    }

    #[inline(never)]
    #[track_caller]
    fn dispatch(&self, level: LogLevel, message: &dyn fmt::Display) {
        let site = CallSite::caller();

        if self.filters.has_trace_points() && self.filters.check_trace_point(site.key().as_str()) {
            let trace = stack_trace::capture(TRACE_SKIP_FRAMES);
            self.metrics.record_trace();
            self.write(trace.as_bytes());
        }

        if !self.filters.should_emit(level, site.file_name(), &self.policy) {
            self.metrics.record_suppressed();
            return;
        }

        let mut line = String::with_capacity(128);
        // Formatting into a String only fails if the message's own Display
        // impl does; whatever was produced is still written.
        let _ = self
            .header
            .write_header(&mut line, level, self.now(), site.path(), site.line());
        let _ = write!(line, "{}", message);
        if !line.ends_with('\n') {
            line.push('\n');
        }

        self.metrics.record_emitted();
        self.write(line.as_bytes());
    }

    fn write(&self, buf: &[u8]) {
        if let Err(e) = self.sink.write(buf) {
            self.metrics.record_write_failure();
            self.diagnostics.report(self.sink.name(), e);
        }
    }

    fn now(&self) -> DateTime<Utc> {
        match self.clock {
            Some(ref clock) => clock(),
            None => Utc::now(),
        }
    }

    fn terminate(&self) -> ! {
        if let Err(e) = self.sink.flush() {
            self.diagnostics.report(self.sink.name(), e);
        }
        std::process::exit(FATAL_EXIT_CODE)
    }
}

/// Builder for constructing Logger with a fluent API
///
/// # Example
/// ```
/// use sitelog::prelude::*;
///
/// let logger = Logger::builder()
///     .sink(DiscardSink)
///     .flags(HeaderFlags::STD | HeaderFlags::MICROSECONDS | HeaderFlags::UTC)
///     .mask_policy(MaskPolicy::FileReplacesGlobal)
///     .diagnostics(Diagnostics::Silent)
///     .build();
/// logger.warn("disk almost full");
/// ```
pub struct LoggerBuilder {
    sink: Option<Arc<dyn Sink>>,
    flags: HeaderFlags,
    path_prefix: Option<String>,
    filters: Option<Arc<FilterState>>,
    policy: MaskPolicy,
    diagnostics: Diagnostics,
    clock: Option<Clock>,
}

impl LoggerBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            sink: None,
            flags: HeaderFlags::STD,
            path_prefix: None,
            filters: None,
            policy: MaskPolicy::Union,
            diagnostics: Diagnostics::Stderr,
            clock: None,
        }
    }

    /// Set the destination (standard error if never called)
    #[must_use = "builder methods return a new value"]
    pub fn sink<S: Sink + 'static>(mut self, sink: S) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn flags(mut self, flags: HeaderFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Prefix stripped from file paths rendered with `LONG_FILE`
    #[must_use = "builder methods return a new value"]
    pub fn skip_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = Some(prefix.into());
        self
    }

    /// Use a private filter state instead of [`FilterState::shared`]
    #[must_use = "builder methods return a new value"]
    pub fn filter_state(mut self, filters: Arc<FilterState>) -> Self {
        self.filters = Some(filters);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn mask_policy(mut self, policy: MaskPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Override the time source used for headers
    #[must_use = "builder methods return a new value"]
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the Logger
    pub fn build(self) -> Logger {
        let mut header = HeaderFormat::new(self.flags);
        if let Some(prefix) = self.path_prefix {
            header = header.with_path_prefix(prefix);
        }

        Logger {
            sink: self
                .sink
                .unwrap_or_else(|| Arc::new(ConsoleSink::stderr())),
            header,
            filters: self.filters.unwrap_or_else(FilterState::shared),
            policy: self.policy,
            diagnostics: self.diagnostics,
            clock: self.clock,
            metrics: LoggerMetrics::new(),
        }
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
