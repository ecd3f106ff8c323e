//! Command-line demo: configure the logger from flags and log a few lines.
//!
//! ```text
//! cargo run --example logger_cli -- --log-to-stderr --log-mode 'info|debug'
//! cargo run --example logger_cli -- --log-dir /tmp/logs --log-filter 'logger_cli.rs:debug'
//! cargo run --example logger_cli -- --log-to-stderr --log-backtrace-at 'logger_cli.rs:NN'
//! ```

use clap::Parser;
use sitelog::core::parse_trace_points;
use sitelog::prelude::*;
use sitelog::{debug, error, info, warn};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "logger_cli", about = "Exercise sitelog from the command line")]
struct Args {
    /// Write log files into this directory
    #[arg(long = "log-dir")]
    log_dir: Option<PathBuf>,

    /// Also write to standard error
    #[arg(long = "log-to-stderr")]
    log_to_stderr: bool,

    /// Global level mask, e.g. `info|warn|error|fatal`
    #[arg(long = "log-mode", default_value = "default")]
    log_mode: LevelMask,

    /// Per-file overrides, e.g. `db.rs:info|debug,net.rs:warn`
    #[arg(long = "log-filter", default_value = "")]
    log_filter: String,

    /// Call sites that print a stack trace, e.g. `main.rs:42,lib.rs:7`
    #[arg(long = "log-backtrace-at", default_value = "")]
    log_backtrace_at: String,

    /// Serialize writes through a single lock
    #[arg(long = "log-sync")]
    log_sync: bool,

    /// Roll log files at this size
    #[arg(long = "log-max-bytes")]
    log_max_bytes: Option<u64>,
}

fn run(args: Args) -> Result<()> {
    let mut rotation = RotationPolicy::new();
    rotation.max_bytes = args.log_max_bytes;

    let config = LogConfig {
        mode: args.log_mode,
        filters: FileFilter::parse_list(&args.log_filter)?,
        backtrace_at: parse_trace_points(&args.log_backtrace_at),
        log_dir: args.log_dir,
        to_stderr: args.log_to_stderr,
        synchronize: args.log_sync,
        rotation,
        ..LogConfig::default()
    };

    let logger = config.build_logger(Arc::new(FilterState::new()))?;

    info!(logger, "starting with mode {}", config.mode);
    for (i, filter) in config.filters.iter().enumerate() {
        debug!(logger, "filter {}: {}", i, filter);
    }
    warn!(logger, "{} trace point(s) armed", config.backtrace_at.len());
    error!(logger, "this is what an error looks like");

    let m = logger.metrics();
    info!(
        logger,
        "emitted={} suppressed={} traces={}",
        m.emitted(),
        m.suppressed(),
        m.traces_emitted()
    );
    logger.flush()
}

fn main() -> ExitCode {
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("logger_cli: {}", e);
            ExitCode::FAILURE
        }
    }
}
