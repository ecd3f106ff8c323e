//! Integration tests for sitelog
//!
//! These tests verify:
//! - Line layout and call-site reporting through the public API
//! - Global and per-file filtering
//! - Trace points
//! - Sink composition and the rotating log directory
//! - Configuration
//! - Fatal termination

use regex::Regex;
use sitelog::core::call_site;
use sitelog::prelude::*;
use sitelog::FATAL_EXIT_CODE;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use tempfile::TempDir;

const FATAL_CHILD_ENV: &str = "SITELOG_FATAL_CHILD_DIR";

fn logger_with(flags: HeaderFlags) -> (Logger, Arc<MemorySink>, Arc<FilterState>) {
    let sink = Arc::new(MemorySink::new());
    let filters = Arc::new(FilterState::new());
    let logger = Logger::builder()
        .sink(Arc::clone(&sink))
        .flags(flags)
        .filter_state(Arc::clone(&filters))
        .diagnostics(Diagnostics::Silent)
        .build();
    (logger, sink, filters)
}

/// Regular files (not the alias) in `dir`
fn log_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .expect("Failed to read log dir")
        .map(|entry| entry.expect("Failed to read entry").path())
        .filter(|path| !path.is_symlink() && path.is_file())
        .collect();
    files.sort();
    files
}

#[test]
fn test_standard_line_layout() {
    let (logger, sink, _filters) = logger_with(HeaderFlags::STD | HeaderFlags::MICROSECONDS);

    logger.info("hello");

    let re = Regex::new(
        r"^I \d{6} \d{2}:\d{2}:\d{2}\.\d{6} integration_tests\.rs:\d+ hello\n$",
    )
    .unwrap();
    assert!(re.is_match(&sink.contents_string()), "got {:?}", sink.contents_string());
}

#[test]
fn test_reported_line_is_callers() {
    let (logger, sink, _filters) = logger_with(HeaderFlags::SHORT_FILE);

    let expected_line = line!() + 1;
    logger.error("boom");

    assert_eq!(
        sink.contents_string(),
        format!("integration_tests.rs:{} boom\n", expected_line)
    );
}

#[test]
fn test_long_file_with_prefix() {
    let sink = Arc::new(MemorySink::new());
    let logger = Logger::builder()
        .sink(Arc::clone(&sink))
        .flags(HeaderFlags::LONG_FILE)
        .skip_path_prefix("tests")
        .filter_state(Arc::new(FilterState::new()))
        .build();

    let expected_line = line!() + 1;
    logger.warn("trimmed");

    assert_eq!(
        sink.contents_string(),
        format!("integration_tests.rs:{} trimmed\n", expected_line)
    );
}

#[test]
fn test_debug_needs_opt_in() {
    let (logger, sink, filters) = logger_with(HeaderFlags::LEVEL);

    logger.debug("x");
    assert!(sink.is_empty());

    filters.set_global_mask(LevelMask::DEFAULT | LogLevel::Debug);
    logger.debug("x");
    assert_eq!(sink.contents_string(), "D x\n");
}

#[test]
fn test_file_filter_scopes_to_one_file() {
    let (logger, sink, filters) = logger_with(HeaderFlags::LEVEL);
    filters.set_file_mask("some_other_file.rs", LevelMask::ALL);

    logger.debug("still hidden");
    assert!(sink.is_empty());

    filters.set_file_mask("integration_tests.rs", LevelMask::ALL);
    logger.debug("visible");
    assert_eq!(sink.contents_string(), "D visible\n");

    filters.remove_file_mask("integration_tests.rs");
    logger.debug("hidden again");
    assert_eq!(sink.lines().len(), 1);
}

#[test]
fn test_disabled_mask_suppresses_everything() {
    let (logger, sink, filters) = logger_with(HeaderFlags::STD);
    filters.set_global_mask(LevelMask::DISABLED);

    logger.info("a");
    logger.warn("b");
    logger.error("c");
    logger.debug("d");

    assert!(sink.is_empty());
    assert_eq!(logger.metrics().suppressed(), 4);
}

fn backtraces_supported() -> bool {
    Backtrace::force_capture().status() == BacktraceStatus::Captured
}

/// Logs from a traced call site. Out of line, with work after the call, so
/// its frame survives optimized builds.
#[inline(never)]
fn log_at_trace_point(logger: &Logger, filters: &FilterState) -> u32 {
    let line = line!() + 2;
    filters.set_trace_point(CallSiteKey::new("integration_tests.rs", line));
    logger.info("never printed");
    std::hint::black_box(line)
}

#[test]
fn test_trace_point_on_suppressed_call() {
    let (logger, sink, filters) = logger_with(HeaderFlags::STD);
    filters.set_global_mask(LevelMask::DISABLED);

    log_at_trace_point(&logger, &filters);

    let output = sink.contents_string();
    let header = Regex::new(r"^thread '[^']*' \[running\]:\n").unwrap();
    assert!(header.is_match(&output), "got {:?}", output);
    assert!(!output.contains("never printed"));
    assert_eq!(logger.metrics().traces_emitted(), 1);

    if backtraces_supported() {
        let first_frame = output.lines().nth(1).unwrap();
        assert!(
            first_frame.ends_with("log_at_trace_point"),
            "first frame should be the caller, got {:?}",
            first_frame
        );
    }
}

#[test]
fn test_trace_precedes_message() {
    let (logger, sink, filters) = logger_with(HeaderFlags::LEVEL);

    let line = line!() + 2;
    filters.set_trace_point(format!("integration_tests.rs:{}", line));
    logger.warn("after the trace");

    let output = sink.contents_string();
    assert!(output.starts_with("thread '"));
    assert!(output.ends_with("W after the trace\n"));
    assert_eq!(logger.metrics().traces_emitted(), 1);

    assert!(filters.clear_trace_point(&format!("integration_tests.rs:{}", line)));
}

#[test]
fn test_resolve_from_caller() {
    let expected_line = line!() + 1;
    let site = call_site::resolve(0);

    if !site.is_unknown() {
        assert_eq!(site.file_name(), "integration_tests.rs");
        assert_eq!(site.line(), i64::from(expected_line));
    }
}

#[test]
fn test_fan_out_to_memory_and_discard() {
    let sink = Arc::new(MemorySink::new());
    let fan_out = FanOutSink::new(vec![Arc::new(DiscardSink) as Arc<dyn Sink>])
        .with_target(Arc::clone(&sink))
        .with_diagnostics(Diagnostics::Silent);
    let logger = Logger::builder()
        .sink(fan_out)
        .flags(HeaderFlags::LEVEL)
        .filter_state(Arc::new(FilterState::new()))
        .build();

    logger.info("copied");
    assert_eq!(sink.contents_string(), "I copied\n");
}

#[test]
fn test_rotating_directory_logging() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let sink = RotatingFileSink::builder(temp_dir.path())
        .program("svc")
        .policy(RotationPolicy::new().with_max_bytes(64))
        .diagnostics(Diagnostics::Silent)
        .open()
        .expect("Failed to create sink");
    let logger = Logger::builder()
        .sink(sink)
        .flags(HeaderFlags::LEVEL)
        .filter_state(Arc::new(FilterState::new()))
        .build();

    for i in 0..10 {
        logger.info(format!("message number {:02} with some padding", i));
    }
    logger.flush().expect("Failed to flush");

    let files = log_files(temp_dir.path());
    assert!(files.len() > 1, "expected rotation, got {:?}", files);

    let mut lines: Vec<String> = files
        .iter()
        .flat_map(|path| {
            fs::read_to_string(path)
                .expect("Failed to read log file")
                .lines()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect();
    lines.sort();
    let expected: Vec<String> = (0..10)
        .map(|i| format!("I message number {:02} with some padding", i))
        .collect();
    assert_eq!(lines, expected);

    let name = Regex::new(r"^svc\..+\.\d{8}-\d{6}\.\d{6}\.\d+(\.\d+)?\.log$").unwrap();
    for file in &files {
        let file_name = file.file_name().unwrap().to_string_lossy();
        assert!(name.is_match(&file_name), "unexpected file name {}", file_name);
    }
}

#[cfg(unix)]
#[test]
fn test_alias_follows_latest_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let sink = Arc::new(
        RotatingFileSink::builder(temp_dir.path())
            .program("svc")
            .diagnostics(Diagnostics::Silent)
            .open()
            .expect("Failed to create sink"),
    );

    sink.write(b"I first file\n").unwrap();
    sink.roll().unwrap();
    sink.write(b"I second file\n").unwrap();

    let alias = temp_dir.path().join("svc.log");
    assert_eq!(sink.alias_path(), alias);
    assert_eq!(fs::read_to_string(&alias).unwrap(), "I second file\n");
}

#[test]
fn test_config_from_json() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let json = serde_json::json!({
        "mode": "error|fatal",
        "filters": [{ "pattern": "integration_tests.rs", "mask": "info|debug" }],
        "log_dir": temp_dir.path(),
        "flags": HeaderFlags::LEVEL.bits(),
    });
    let config: LogConfig = serde_json::from_value(json).expect("Failed to parse config");

    let logger = config
        .build_logger(Arc::new(FilterState::new()))
        .expect("Failed to build logger");
    logger.debug("from config");
    logger.warn("filtered out");
    logger.error("kept");
    logger.flush().unwrap();

    let files = log_files(temp_dir.path());
    assert_eq!(files.len(), 1);
    assert_eq!(
        fs::read_to_string(&files[0]).unwrap(),
        "D from config\nE kept\n"
    );
}

#[test]
fn test_synchronized_config_from_text_forms() {
    let config = LogConfig::new()
        .with_mode("info|warn".parse().unwrap())
        .with_synchronize(true);
    let config = LogConfig {
        filters: FileFilter::parse_list("integration_tests.rs:debug").unwrap(),
        backtrace_at: sitelog::core::parse_trace_points("nowhere.rs:1"),
        ..config
    };

    let filters = Arc::new(FilterState::new());
    let logger = config.build_logger(Arc::clone(&filters)).unwrap();

    assert_eq!(filters.global_mask(), LogLevel::Info | LogLevel::Warn);
    assert!(filters.check_trace_point("nowhere.rs:1"));
    logger.debug("discarded without error");
    assert_eq!(logger.metrics().emitted(), 1);
}

#[test]
fn test_default_logger_uses_shared_state() {
    let logger = Logger::new(DiscardSink);
    assert!(Arc::ptr_eq(logger.filter_state(), &FilterState::shared()));
}

#[test]
fn test_fatal_exits_after_writing() {
    if let Ok(dir) = std::env::var(FATAL_CHILD_ENV) {
        let logger = LogConfig::new()
            .with_log_dir(dir)
            .with_flags(HeaderFlags::LEVEL)
            .build_logger_with_diagnostics(Arc::new(FilterState::new()), Diagnostics::Silent)
            .expect("Failed to build logger");
        logger.fatal("unrecoverable");
    }

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let status = Command::new(std::env::current_exe().expect("Failed to locate test binary"))
        .args(["--exact", "test_fatal_exits_after_writing", "--nocapture"])
        .env(FATAL_CHILD_ENV, temp_dir.path())
        .status()
        .expect("Failed to run child");

    assert_eq!(status.code(), Some(FATAL_EXIT_CODE));
    let files = log_files(temp_dir.path());
    assert_eq!(files.len(), 1);
    assert_eq!(fs::read_to_string(&files[0]).unwrap(), "F unrecoverable\n");
}
