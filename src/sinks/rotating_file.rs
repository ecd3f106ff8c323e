//! Rotating directory sink
//!
//! Each sink writes into one uniquely named file inside a log directory:
//!
//! ```text
//! <program>.<host>.<user>.<YYYYmmdd-HHMMSS.ffffff>.<pid>.log
//! ```
//!
//! and keeps `<program>.log` pointing at the newest one. With a
//! [`RotationPolicy`] size limit, a write that would push a non-empty file
//! past the limit first rolls to a fresh file; the finished file can be
//! gzip-compressed and old files pruned.
//!
//! Alias, compression and pruning failures never fail a write. They are
//! reported through [`Diagnostics`].

use crate::core::diagnostics::Diagnostics;
use crate::core::error::{LoggerError, Result};
use crate::core::sink::Sink;
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Give up on unique names after this many collisions in one instant
const MAX_NAME_ATTEMPTS: usize = 1000;

/// When and how a [`RotatingFileSink`] moves to a new file
///
/// # Examples
///
/// ```
/// use sitelog::sinks::RotationPolicy;
///
/// // Roll every 50 MB, keep the newest 7 files, gzip finished ones
/// let policy = RotationPolicy::new()
///     .with_max_bytes(50 * 1024 * 1024)
///     .with_max_files(7)
///     .with_compression(true);
/// assert_eq!(policy.max_files, Some(7));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationPolicy {
    /// Size limit of one file; `None` never rolls
    pub max_bytes: Option<u64>,
    /// Files kept per program/host/user, active file included; `None` keeps all
    pub max_files: Option<usize>,
    /// Gzip finished files to `<name>.gz`
    pub compress: bool,
}

impl RotationPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_files(mut self, count: usize) -> Self {
        self.max_files = Some(count);
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }
}

/// The fixed parts of every file name a sink creates
#[derive(Debug, Clone, PartialEq, Eq)]
struct FileIdentity {
    program: String,
    host: String,
    user: String,
    pid: u32,
}

impl FileIdentity {
    fn detect() -> Self {
        Self {
            program: program_name(),
            host: host_name(),
            user: user_name(),
            pid: std::process::id(),
        }
    }

    /// Shared by every file of this program, host and user
    fn prefix(&self) -> String {
        format!("{}.{}.{}.", self.program, self.host, self.user)
    }

    fn file_name(&self, now: DateTime<Local>, attempt: usize) -> String {
        let stamp = now.format("%Y%m%d-%H%M%S%.6f");
        if attempt == 0 {
            format!("{}{}.{}.log", self.prefix(), stamp, self.pid)
        } else {
            format!("{}{}.{}.{}.log", self.prefix(), stamp, self.pid, attempt)
        }
    }

    fn alias(&self) -> String {
        format!("{}.log", self.program)
    }
}

fn program_name() -> String {
    std::env::args_os()
        .next()
        .as_deref()
        .map(Path::new)
        .and_then(Path::file_name)
        .map(|name| sanitize(&name.to_string_lossy()))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "?".to_string())
}

#[cfg(unix)]
fn host_name() -> String {
    let uname = rustix::system::uname();
    let host = sanitize(&uname.nodename().to_string_lossy());
    if host.is_empty() {
        "?".to_string()
    } else {
        host
    }
}

#[cfg(not(unix))]
fn host_name() -> String {
    std::env::var("COMPUTERNAME")
        .map(|host| sanitize(&host))
        .unwrap_or_else(|_| "?".to_string())
}

fn user_name() -> String {
    ["USER", "LOGNAME", "USERNAME"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .map(|user| sanitize(&user))
        .find(|user| !user.is_empty())
        .unwrap_or_else(|| "?".to_string())
}

/// Keep name components from introducing path separators
fn sanitize(component: &str) -> String {
    component
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect()
}

#[cfg(feature = "compression")]
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = std::ffi::OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

struct ActiveFile {
    path: PathBuf,
    file: File,
    size: u64,
}

/// Builder for [`RotatingFileSink`]
#[derive(Debug, Clone)]
pub struct RotatingFileSinkBuilder {
    dir: PathBuf,
    policy: RotationPolicy,
    program: Option<String>,
    diagnostics: Diagnostics,
}

impl RotatingFileSinkBuilder {
    #[must_use = "builder methods return a new value"]
    pub fn policy(mut self, policy: RotationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Override the program component of file names (defaults to the
    /// executable's file name)
    #[must_use = "builder methods return a new value"]
    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = Some(program.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Create the directory and the first log file.
    ///
    /// # Errors
    ///
    /// Returns error if the directory or the file cannot be created
    pub fn open(self) -> Result<RotatingFileSink> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            LoggerError::io_operation(
                "create log directory",
                format!("Failed to create directory '{}'", self.dir.display()),
                e,
            )
        })?;

        let mut identity = FileIdentity::detect();
        if let Some(program) = self.program {
            identity.program = sanitize(&program);
        }

        let active = create_unique(&self.dir, &identity)?;
        let sink = RotatingFileSink {
            dir: self.dir,
            identity,
            policy: self.policy,
            diagnostics: self.diagnostics,
            active: Mutex::new(active),
        };
        let path = sink.active.lock().path.clone();
        sink.refresh_alias(&path);
        Ok(sink)
    }
}

/// File sink that owns one log file at a time inside a directory
///
/// # Examples
///
/// ```no_run
/// use sitelog::sinks::{RotatingFileSink, RotationPolicy};
///
/// // One file per run, `/var/log/app/<program>.log` points at it
/// let sink = RotatingFileSink::new("/var/log/app").unwrap();
///
/// // Roll every 10 MB and keep the newest 5 files, compressed
/// let sink = RotatingFileSink::builder("/var/log/app")
///     .policy(
///         RotationPolicy::new()
///             .with_max_bytes(10 * 1024 * 1024)
///             .with_max_files(5)
///             .with_compression(true),
///     )
///     .open()
///     .unwrap();
/// ```
pub struct RotatingFileSink {
    dir: PathBuf,
    identity: FileIdentity,
    policy: RotationPolicy,
    diagnostics: Diagnostics,
    active: Mutex<ActiveFile>,
}

impl RotatingFileSink {
    /// Open a sink in `dir` with no rotation limits
    ///
    /// # Errors
    ///
    /// Returns error if the directory or the file cannot be created
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Self::builder(dir).open()
    }

    /// Open a sink in `dir` with a custom policy
    ///
    /// # Errors
    ///
    /// Returns error if the directory or the file cannot be created
    pub fn with_policy<P: AsRef<Path>>(dir: P, policy: RotationPolicy) -> Result<Self> {
        Self::builder(dir).policy(policy).open()
    }

    pub fn builder<P: AsRef<Path>>(dir: P) -> RotatingFileSinkBuilder {
        RotatingFileSinkBuilder {
            dir: dir.as_ref().to_path_buf(),
            policy: RotationPolicy::default(),
            program: None,
            diagnostics: Diagnostics::default(),
        }
    }

    /// Path of the file currently written to
    pub fn current_path(&self) -> PathBuf {
        self.active.lock().path.clone()
    }

    /// Path of the `<program>.log` alias
    pub fn alias_path(&self) -> PathBuf {
        self.dir.join(self.identity.alias())
    }

    pub fn directory(&self) -> &Path {
        &self.dir
    }

    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    /// Bytes written to the current file
    pub fn current_size(&self) -> u64 {
        self.active.lock().size
    }

    /// Start a new file now, regardless of the size limit
    ///
    /// # Errors
    ///
    /// Returns error if the new file cannot be created; the sink keeps
    /// writing to the current file in that case
    pub fn roll(&self) -> Result<()> {
        let mut active = self.active.lock();
        self.roll_locked(&mut active)
    }

    fn roll_locked(&self, active: &mut ActiveFile) -> Result<()> {
        let next = create_unique(&self.dir, &self.identity).map_err(|e| {
            LoggerError::file_rotation(active.path.display().to_string(), e.to_string())
        })?;
        let finished = std::mem::replace(active, next);

        if let Err(e) = finished.file.sync_all() {
            self.report(LoggerError::io_operation(
                "sync finished log file",
                finished.path.display().to_string(),
                e,
            ));
        }
        drop(finished.file);

        self.refresh_alias(&active.path);
        if self.policy.compress {
            self.compress_finished(&finished.path);
        }
        if let Some(max_files) = self.policy.max_files {
            if let Err(e) = self.prune(max_files, &active.path) {
                self.report(e);
            }
        }
        Ok(())
    }

    #[cfg(unix)]
    fn refresh_alias(&self, target: &Path) {
        let link = self.alias_path();
        let Some(target_name) = target.file_name() else {
            return;
        };

        match fs::remove_file(&link) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                self.report(LoggerError::symlink(
                    link.display().to_string(),
                    format!("Failed to remove stale alias: {}", e),
                ));
                return;
            }
        }

        if let Err(e) = std::os::unix::fs::symlink(target_name, &link) {
            self.report(LoggerError::symlink(
                link.display().to_string(),
                e.to_string(),
            ));
        }
    }

    #[cfg(not(unix))]
    fn refresh_alias(&self, _target: &Path) {}

    #[cfg(feature = "compression")]
    fn compress_finished(&self, path: &Path) {
        if let Err(e) = compress_file(path) {
            self.report(e);
        }
    }

    #[cfg(not(feature = "compression"))]
    fn compress_finished(&self, _path: &Path) {
        self.report(LoggerError::config(
            "RotationPolicy",
            "compression requested but the `compression` feature is disabled",
        ));
    }

    /// Delete the oldest files of this program/host/user until at most
    /// `max_files` remain. The active file is never deleted.
    fn prune(&self, max_files: usize, active: &Path) -> Result<()> {
        let prefix = self.identity.prefix();
        let entries = fs::read_dir(&self.dir).map_err(|e| {
            LoggerError::io_operation(
                "prune log directory",
                format!("Failed to list '{}'", self.dir.display()),
                e,
            )
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter(|entry| {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                name.starts_with(&prefix) && (name.ends_with(".log") || name.ends_with(".log.gz"))
            })
            .map(|entry| entry.path())
            .collect();

        if files.len() <= max_files {
            return Ok(());
        }

        files.sort_by_cached_key(|path| creation_key(path, &prefix));
        let excess = files.len() - max_files.max(1);
        for path in files.into_iter().filter(|p| p != active).take(excess) {
            if let Err(e) = fs::remove_file(&path) {
                self.report(LoggerError::io_operation(
                    "prune log directory",
                    format!("Failed to remove '{}'", path.display()),
                    e,
                ));
            }
        }
        Ok(())
    }

    fn report(&self, error: LoggerError) {
        self.diagnostics.report(self.name(), error);
    }
}

impl Sink for RotatingFileSink {
    fn write(&self, buf: &[u8]) -> Result<()> {
        let mut active = self.active.lock();

        if let Some(max_bytes) = self.policy.max_bytes {
            if active.size > 0 && active.size.saturating_add(buf.len() as u64) > max_bytes {
                // Keep logging to the old file rather than lose the line.
                if let Err(e) = self.roll_locked(&mut active) {
                    self.report(e);
                }
            }
        }

        active.file.write_all(buf).map_err(|e| {
            LoggerError::io_operation(
                "write log file",
                active.path.display().to_string(),
                e,
            )
        })?;
        active.size += buf.len() as u64;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        let mut active = self.active.lock();
        active.file.flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "RotatingFileSink"
    }
}

/// Create a file that did not exist before, adding `.N` on name collisions
/// Orders files by `(stamp, pid, attempt)`. A byte-wise name sort would put
/// a `.N.log` collision retry before the base `.log` it followed.
fn creation_key(path: &Path, prefix: &str) -> (String, u64, u64) {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let rest = name.strip_prefix(prefix).unwrap_or(&name);
    let rest = rest.strip_suffix(".gz").unwrap_or(rest);
    let rest = rest.strip_suffix(".log").unwrap_or(rest);

    // <YYYYmmdd-HHMMSS>.<ffffff>.<pid>[.<attempt>]
    let mut parts = rest.splitn(4, '.');
    let seconds = parts.next().unwrap_or_default();
    let micros = parts.next().unwrap_or_default();
    let pid = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    let attempt = parts.next().and_then(|a| a.parse().ok()).unwrap_or(0);
    (format!("{}.{}", seconds, micros), pid, attempt)
}

fn create_unique(dir: &Path, identity: &FileIdentity) -> Result<ActiveFile> {
    let now = Local::now();
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let path = dir.join(identity.file_name(now, attempt));
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok(ActiveFile { path, file, size: 0 }),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => {
                return Err(LoggerError::file_sink(
                    path.display().to_string(),
                    format!("Failed to create: {}", e),
                ))
            }
        }
    }
    Err(LoggerError::file_sink(
        dir.display().to_string(),
        format!("No free log file name after {} attempts", MAX_NAME_ATTEMPTS),
    ))
}

/// Gzip `path` to `<path>.gz` using streaming I/O.
///
/// The output goes to a temporary file that is renamed into place once
/// complete; the original is removed only after that succeeds.
#[cfg(feature = "compression")]
fn compress_file(path: &Path) -> Result<()> {
    use std::io::{BufReader, BufWriter};

    let gz_path = with_suffix(path, ".gz");
    let temp_gz_path = with_suffix(path, ".gz.tmp");

    let input = File::open(path).map_err(|e| {
        LoggerError::io_operation(
            "compress log file",
            format!("Failed to open file for compression: {}", path.display()),
            e,
        )
    })?;
    let mut reader = BufReader::with_capacity(64 * 1024, input);

    let output = File::create(&temp_gz_path).map_err(|e| {
        LoggerError::io_operation(
            "compress log file",
            format!(
                "Failed to create temporary compressed file: {}",
                temp_gz_path.display()
            ),
            e,
        )
    })?;
    let mut encoder = flate2::write::GzEncoder::new(
        BufWriter::with_capacity(64 * 1024, output),
        flate2::Compression::default(),
    );

    let streamed = io::copy(&mut reader, &mut encoder)
        .and_then(|_| encoder.finish())
        .and_then(|mut writer| writer.flush());
    if let Err(e) = streamed {
        let _ = fs::remove_file(&temp_gz_path);
        return Err(LoggerError::io_operation(
            "compress log file",
            format!("Failed to compress: {}", path.display()),
            e,
        ));
    }

    fs::rename(&temp_gz_path, &gz_path).map_err(|e| {
        let _ = fs::remove_file(&temp_gz_path);
        LoggerError::io_operation(
            "compress log file",
            format!("Failed to rename compressed file to: {}", gz_path.display()),
            e,
        )
    })?;

    fs::remove_file(path).map_err(|e| {
        LoggerError::io_operation(
            "compress log file",
            format!(
                "Compressed but failed to remove original: {}",
                path.display()
            ),
            e,
        )
    })
}
