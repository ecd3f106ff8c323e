//! Logger configuration
//!
//! [`LogConfig`] gathers everything a program usually exposes as flags or a
//! config file section: the global mask, per-file filters, trace points,
//! where output goes and how lines are headed. It deserializes with serde
//! and every field has a default, so partial documents are fine:
//!
//! ```
//! use sitelog::LogConfig;
//!
//! let config: LogConfig = serde_json::from_str(r#"{
//!     "mode": "info|warn|error|fatal|debug",
//!     "filters": [{ "pattern": "db.rs", "mask": "error" }],
//!     "backtrace_at": ["main.rs:42"]
//! }"#).unwrap();
//! assert_eq!(config.filters.len(), 1);
//! ```
//!
//! The same settings have compact text forms for command lines: masks are
//! `info|debug`, filter lists `db.rs:info|debug,net.rs:warn` and trace
//! point lists `main.rs:42,lib.rs:7`.

use super::call_site::CallSiteKey;
use super::diagnostics::Diagnostics;
use super::error::{LoggerError, Result};
use super::filter_state::FilterState;
use super::header::HeaderFlags;
use super::log_level::LevelMask;
use super::logger::Logger;
use super::sink::Sink;
use crate::sinks::{ConsoleSink, DiscardSink, FanOutSink, RotatingFileSink, RotationPolicy, SerializingSink};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Mask override for one file name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFilter {
    /// Short file name, matched verbatim
    pub pattern: String,
    pub mask: LevelMask,
}

impl FileFilter {
    pub fn new(pattern: impl Into<String>, mask: LevelMask) -> Self {
        Self {
            pattern: pattern.into(),
            mask,
        }
    }

    /// Parse a comma separated list such as `db.rs:info|debug,net.rs:warn`.
    ///
    /// # Errors
    ///
    /// Returns error if an entry has no `:` or names an unknown level
    pub fn parse_list(s: &str) -> Result<Vec<FileFilter>> {
        s.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(FileFilter::from_str)
            .collect()
    }
}

impl FromStr for FileFilter {
    type Err = LoggerError;

    /// The last `:` separates pattern and mask.
    fn from_str(s: &str) -> Result<Self> {
        let (pattern, mask) = s.rsplit_once(':').ok_or_else(|| {
            LoggerError::config("file filter", format!("expected '<file>:<levels>', got '{}'", s))
        })?;
        Ok(FileFilter::new(pattern.trim(), mask.parse()?))
    }
}

impl fmt::Display for FileFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.pattern, self.mask)
    }
}

/// Parse a comma separated list of call-site keys such as `main.rs:42,lib.rs:7`
pub fn parse_trace_points(s: &str) -> Vec<CallSiteKey> {
    s.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(CallSiteKey::from)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Global level mask
    pub mode: LevelMask,
    /// Per-file overrides, applied in order (later entries win)
    pub filters: Vec<FileFilter>,
    /// Call sites that dump a stack trace when reached
    pub backtrace_at: Vec<CallSiteKey>,
    /// Directory for a [`RotatingFileSink`]; no files are written if unset
    pub log_dir: Option<PathBuf>,
    /// Also write to standard error
    pub to_stderr: bool,
    /// Serialize all writes through one lock
    pub synchronize: bool,
    pub flags: HeaderFlags,
    /// Prefix stripped from long file names
    pub skip_path_prefix: Option<String>,
    pub rotation: RotationPolicy,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            mode: LevelMask::DEFAULT,
            filters: Vec::new(),
            backtrace_at: Vec::new(),
            log_dir: None,
            to_stderr: false,
            synchronize: false,
            flags: HeaderFlags::STD,
            skip_path_prefix: None,
            rotation: RotationPolicy::default(),
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_mode(mut self, mode: LevelMask) -> Self {
        self.mode = mode;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_filter(mut self, pattern: impl Into<String>, mask: LevelMask) -> Self {
        self.filters.push(FileFilter::new(pattern, mask));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_backtrace_at(mut self, key: impl Into<CallSiteKey>) -> Self {
        self.backtrace_at.push(key.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_stderr(mut self, enabled: bool) -> Self {
        self.to_stderr = enabled;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_synchronize(mut self, enabled: bool) -> Self {
        self.synchronize = enabled;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_flags(mut self, flags: HeaderFlags) -> Self {
        self.flags = flags;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_rotation(mut self, rotation: RotationPolicy) -> Self {
        self.rotation = rotation;
        self
    }

    /// Reject settings that can never work
    ///
    /// # Errors
    ///
    /// Returns error for a zero size limit or a zero file count
    pub fn validate(&self) -> Result<()> {
        if self.rotation.max_bytes == Some(0) {
            return Err(LoggerError::config("rotation", "max_bytes must be greater than 0"));
        }
        if self.rotation.max_files == Some(0) {
            return Err(LoggerError::config("rotation", "max_files must be greater than 0"));
        }
        Ok(())
    }

    /// Load mask, filters and trace points into `filters`
    pub fn apply(&self, filters: &FilterState) {
        filters.set_global_mask(self.mode);
        for filter in &self.filters {
            filters.set_file_mask(filter.pattern.clone(), filter.mask);
        }
        for key in &self.backtrace_at {
            filters.set_trace_point(key.clone());
        }
    }

    /// Build the output chain: rotating file and/or stderr, optionally
    /// serialized. With neither a directory nor stderr, output is discarded.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid or the log file cannot
    /// be created
    pub fn build_sink(&self, diagnostics: &Diagnostics) -> Result<Arc<dyn Sink>> {
        self.validate()?;

        let file: Option<Arc<dyn Sink>> = match &self.log_dir {
            Some(dir) => Some(Arc::new(
                RotatingFileSink::builder(dir)
                    .policy(self.rotation.clone())
                    .diagnostics(diagnostics.clone())
                    .open()?,
            )),
            None => None,
        };

        let sink: Arc<dyn Sink> = match (file, self.to_stderr) {
            (Some(file), true) => Arc::new(
                FanOutSink::new(vec![file, Arc::new(ConsoleSink::stderr()) as Arc<dyn Sink>])
                    .with_diagnostics(diagnostics.clone()),
            ),
            (Some(file), false) => file,
            (None, true) => Arc::new(ConsoleSink::stderr()),
            (None, false) => Arc::new(DiscardSink),
        };

        if self.synchronize {
            Ok(Arc::new(SerializingSink::wrap(sink)))
        } else {
            Ok(sink)
        }
    }

    /// Apply this configuration to `filters` and build a logger over it
    ///
    /// # Errors
    ///
    /// See [`LogConfig::build_sink`]
    pub fn build_logger(&self, filters: Arc<FilterState>) -> Result<Logger> {
        self.build_logger_with_diagnostics(filters, Diagnostics::default())
    }

    pub fn build_logger_with_diagnostics(
        &self,
        filters: Arc<FilterState>,
        diagnostics: Diagnostics,
    ) -> Result<Logger> {
        let sink = self.build_sink(&diagnostics)?;
        self.apply(&filters);

        let mut builder = Logger::builder()
            .sink(sink)
            .flags(self.flags)
            .filter_state(filters)
            .diagnostics(diagnostics);
        if let Some(prefix) = &self.skip_path_prefix {
            builder = builder.skip_path_prefix(prefix.clone());
        }
        Ok(builder.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LogLevel;
    use tempfile::TempDir;

    #[test]
    fn test_parse_filter_list() {
        let filters = FileFilter::parse_list("db.rs:info|debug, net.rs:warn,").unwrap();
        assert_eq!(
            filters,
            vec![
                FileFilter::new("db.rs", LogLevel::Info | LogLevel::Debug),
                FileFilter::new("net.rs", LevelMask::from(LogLevel::Warn)),
            ]
        );
    }

    #[test]
    fn test_filter_splits_on_last_colon() {
        let filter: FileFilter = "odd:name.rs:e".parse().unwrap();
        assert_eq!(filter.pattern, "odd:name.rs");
        assert_eq!(filter.mask, LevelMask::from(LogLevel::Error));
        assert_eq!(filter.to_string(), "odd:name.rs:error");
    }

    #[test]
    fn test_filter_errors() {
        assert!(matches!(
            "db.rs".parse::<FileFilter>(),
            Err(LoggerError::InvalidConfiguration { .. })
        ));
        assert!(matches!(
            "db.rs:chatty".parse::<FileFilter>(),
            Err(LoggerError::InvalidLevel(_))
        ));
    }

    #[test]
    fn test_parse_trace_points() {
        let keys = parse_trace_points(" main.rs:42 ,lib.rs:7,,");
        assert_eq!(keys, vec![CallSiteKey::from("main.rs:42"), CallSiteKey::from("lib.rs:7")]);
    }

    #[test]
    fn test_apply() {
        let config = LogConfig::new()
            .with_mode(LevelMask::ALL)
            .with_filter("db.rs", LevelMask::DISABLED)
            .with_filter("db.rs", LevelMask::from(LogLevel::Error))
            .with_backtrace_at("main.rs:42");
        let filters = FilterState::new();
        config.apply(&filters);

        assert_eq!(filters.global_mask(), LevelMask::ALL);
        assert_eq!(filters.file_mask("db.rs"), Some(LevelMask::from(LogLevel::Error)));
        assert!(filters.check_trace_point("main.rs:42"));
    }

    #[test]
    fn test_deserialize_defaults() {
        let config: LogConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, LogConfig::default());
        assert_eq!(config.flags, HeaderFlags::STD);
    }

    #[test]
    fn test_deserialize_rejects_unknown_level() {
        let result = serde_json::from_str::<LogConfig>(r#"{ "mode": "info|loud" }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate() {
        let config = LogConfig::new().with_rotation(RotationPolicy::new().with_max_files(0));
        assert!(config.validate().is_err());
        assert!(config.build_sink(&Diagnostics::Silent).is_err());
    }

    #[test]
    fn test_build_sink_variants() {
        let sink = LogConfig::new().build_sink(&Diagnostics::Silent).unwrap();
        assert_eq!(sink.name(), "discard");

        let sink = LogConfig::new()
            .with_stderr(true)
            .build_sink(&Diagnostics::Silent)
            .unwrap();
        assert_eq!(sink.name(), "stderr");

        let sink = LogConfig::new()
            .with_synchronize(true)
            .build_sink(&Diagnostics::Silent)
            .unwrap();
        assert_eq!(sink.name(), "SerializingSink");
    }

    #[test]
    fn test_build_logger_writes_to_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config = LogConfig::new()
            .with_log_dir(temp_dir.path())
            .with_stderr(true)
            .with_flags(HeaderFlags::LEVEL);
        let logger = config
            .build_logger_with_diagnostics(Arc::new(FilterState::new()), Diagnostics::Silent)
            .unwrap();

        logger.info("to file");
        logger.flush().unwrap();

        let written: Vec<String> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| !path.is_symlink())
            .map(|path| std::fs::read_to_string(path).unwrap())
            .collect();
        assert_eq!(written, vec!["I to file\n".to_string()]);
    }
}
