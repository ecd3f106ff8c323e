//! Process-wide filtering state
//!
//! [`FilterState`] holds the three pieces of mutable configuration every log
//! call consults:
//!
//! 1. the global level mask (one atomic byte),
//! 2. per-file mask overrides keyed by short file name,
//! 3. the set of armed trace points.
//!
//! The override table and trace-point set are published through
//! [`CowCell`]: a writer copies the whole table, changes one entry and swaps
//! the new table in. Writes cost O(table size) and are expected at
//! configuration time only; reads on the logging hot path never wait for
//! them. Reads are not linearized with writes, so a reader racing an update
//! may act on the previous configuration.

use super::call_site::CallSiteKey;
use super::cow::CowCell;
use super::log_level::{LevelMask, LogLevel};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

static SHARED: Lazy<Arc<FilterState>> = Lazy::new(|| Arc::new(FilterState::new()));

/// How the global mask and a per-file override combine into the mask that
/// decides whether a message is emitted.
///
/// # Example
///
/// ```
/// use sitelog::{LevelMask, LogLevel, MaskPolicy};
///
/// let global = LevelMask::DEFAULT;
/// let file = Some(LevelMask::from(LogLevel::Error));
///
/// assert!(MaskPolicy::Union.effective(global, file).contains(LogLevel::Info));
/// assert!(!MaskPolicy::FileReplacesGlobal.effective(global, file).contains(LogLevel::Info));
/// ```
#[derive(Clone, Copy, Default)]
pub enum MaskPolicy {
    /// `global | file`: an override can only add visibility (default)
    #[default]
    Union,

    /// An override, when present, replaces the global mask for that file
    FileReplacesGlobal,

    /// Caller-supplied combination
    Custom(fn(LevelMask, Option<LevelMask>) -> LevelMask),
}

impl MaskPolicy {
    #[inline]
    pub fn effective(&self, global: LevelMask, file: Option<LevelMask>) -> LevelMask {
        match self {
            MaskPolicy::Union => match file {
                Some(file) => global | file,
                None => global,
            },
            MaskPolicy::FileReplacesGlobal => file.unwrap_or(global),
            MaskPolicy::Custom(combine) => combine(global, file),
        }
    }
}

impl fmt::Debug for MaskPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaskPolicy::Union => write!(f, "Union"),
            MaskPolicy::FileReplacesGlobal => write!(f, "FileReplacesGlobal"),
            MaskPolicy::Custom(_) => write!(f, "Custom"),
        }
    }
}

pub struct FilterState {
    global: AtomicU8,
    files: CowCell<HashMap<String, LevelMask>>,
    trace_points: CowCell<HashSet<CallSiteKey>>,
}

impl FilterState {
    /// Fresh state: default mask, no overrides, no trace points
    pub fn new() -> Self {
        Self {
            global: AtomicU8::new(LevelMask::DEFAULT.bits()),
            files: CowCell::default(),
            trace_points: CowCell::default(),
        }
    }

    /// The process-wide instance used by loggers that are not given one
    pub fn shared() -> Arc<FilterState> {
        Arc::clone(&SHARED)
    }

    pub fn set_global_mask(&self, mask: LevelMask) {
        self.global.store(mask.bits(), Ordering::Release);
    }

    #[inline]
    pub fn global_mask(&self) -> LevelMask {
        LevelMask::from_bits(self.global.load(Ordering::Acquire))
    }

    /// Insert or overwrite the override for `pattern`.
    ///
    /// `pattern` is matched verbatim against the short file name of a call
    /// site; it is never validated.
    pub fn set_file_mask(&self, pattern: impl Into<String>, mask: LevelMask) {
        let pattern = pattern.into();
        self.files.update(move |files| {
            files.insert(pattern, mask);
        });
    }

    /// Drop the override for `pattern`, returning it if one existed
    pub fn remove_file_mask(&self, pattern: &str) -> Option<LevelMask> {
        if !self.files.with(|files| files.contains_key(pattern)) {
            return None;
        }
        self.files.update(|files| files.remove(pattern))
    }

    #[inline]
    pub fn file_mask(&self, file: &str) -> Option<LevelMask> {
        self.files.with(|files| files.get(file).copied())
    }

    /// Snapshot of every override
    pub fn file_masks(&self) -> Arc<HashMap<String, LevelMask>> {
        self.files.load()
    }

    pub fn set_trace_point(&self, key: impl Into<CallSiteKey>) {
        let key = key.into();
        self.trace_points.update(move |points| {
            points.insert(key);
        });
    }

    pub fn clear_trace_point(&self, key: &str) -> bool {
        if !self.check_trace_point(key) {
            return false;
        }
        self.trace_points.update(|points| points.remove(key))
    }

    #[inline]
    pub fn check_trace_point(&self, key: &str) -> bool {
        self.trace_points.with(|points| points.contains(key))
    }

    /// Cheap pre-check so callers can skip building a key
    #[inline]
    pub fn has_trace_points(&self) -> bool {
        self.trace_points.with(|points| !points.is_empty())
    }

    /// Snapshot of every armed trace point
    pub fn trace_points(&self) -> Arc<HashSet<CallSiteKey>> {
        self.trace_points.load()
    }

    /// Whether a message at `level` from `file` passes the filters
    #[inline]
    pub fn should_emit(&self, level: LogLevel, file: &str, policy: &MaskPolicy) -> bool {
        let global = self.global_mask();
        let file_mask = self.file_mask(file);
        policy.effective(global, file_mask).contains(level)
    }

    /// Restore the initial configuration.
    ///
    /// Each of the three pieces is swapped atomically, but not all three
    /// together; calling this while other threads reconfigure the state may
    /// leave a mix of old and new settings.
    pub fn reset(&self) {
        self.set_global_mask(LevelMask::DEFAULT);
        self.files.store(HashMap::new());
        self.trace_points.store(HashSet::new());
    }
}

impl Default for FilterState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FilterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterState")
            .field("global", &self.global_mask())
            .field("files", &self.files.load())
            .field("trace_points", &self.trace_points.load())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_initial_state() {
        let state = FilterState::new();
        assert_eq!(state.global_mask(), LevelMask::DEFAULT);
        assert!(state.file_masks().is_empty());
        assert!(!state.has_trace_points());
    }

    #[test]
    fn test_global_mask_roundtrip() {
        let state = FilterState::new();
        state.set_global_mask(LogLevel::Info | LogLevel::Debug);
        assert_eq!(state.global_mask(), LogLevel::Info | LogLevel::Debug);
    }

    #[test]
    fn test_file_mask_last_write_wins() {
        let state = FilterState::new();
        state.set_file_mask("db.rs", LevelMask::from(LogLevel::Debug));
        state.set_file_mask("db.rs", LevelMask::from(LogLevel::Warn));

        assert_eq!(state.file_mask("db.rs"), Some(LevelMask::from(LogLevel::Warn)));
        assert_eq!(state.file_mask("net.rs"), None);
        assert_eq!(state.file_masks().len(), 1);
    }

    #[test]
    fn test_remove_file_mask() {
        let state = FilterState::new();
        state.set_file_mask("db.rs", LevelMask::ALL);
        assert_eq!(state.remove_file_mask("db.rs"), Some(LevelMask::ALL));
        assert_eq!(state.remove_file_mask("db.rs"), None);
        assert_eq!(state.file_mask("db.rs"), None);
    }

    #[test]
    fn test_trace_points() {
        let state = FilterState::new();
        state.set_trace_point("t.rs:42");

        assert!(state.check_trace_point("t.rs:42"));
        assert!(!state.check_trace_point("t.rs:43"));
        assert!(state.clear_trace_point("t.rs:42"));
        assert!(!state.clear_trace_point("t.rs:42"));
        assert!(!state.has_trace_points());
    }

    #[test]
    fn test_union_policy_only_adds_visibility() {
        let state = FilterState::new();
        state.set_global_mask(LevelMask::from(LogLevel::Info));
        state.set_file_mask("db.rs", LevelMask::from(LogLevel::Debug));

        let policy = MaskPolicy::Union;
        assert!(state.should_emit(LogLevel::Debug, "db.rs", &policy));
        assert!(state.should_emit(LogLevel::Info, "db.rs", &policy));
        assert!(!state.should_emit(LogLevel::Debug, "net.rs", &policy));
    }

    #[test]
    fn test_replace_policy_narrows() {
        let state = FilterState::new();
        state.set_file_mask("db.rs", LevelMask::from(LogLevel::Error));

        let policy = MaskPolicy::FileReplacesGlobal;
        assert!(!state.should_emit(LogLevel::Info, "db.rs", &policy));
        assert!(state.should_emit(LogLevel::Error, "db.rs", &policy));
        assert!(state.should_emit(LogLevel::Info, "net.rs", &policy));
    }

    #[test]
    fn test_custom_policy() {
        fn debug_everywhere(global: LevelMask, _file: Option<LevelMask>) -> LevelMask {
            global | LogLevel::Debug
        }
        let policy = MaskPolicy::Custom(debug_everywhere);
        assert!(policy
            .effective(LevelMask::DISABLED, None)
            .contains(LogLevel::Debug));
    }

    #[test]
    fn test_reset() {
        let state = FilterState::new();
        state.set_global_mask(LevelMask::DISABLED);
        state.set_file_mask("a.rs", LevelMask::ALL);
        state.set_trace_point("a.rs:1");

        state.reset();

        assert_eq!(state.global_mask(), LevelMask::DEFAULT);
        assert_eq!(state.file_mask("a.rs"), None);
        assert!(!state.check_trace_point("a.rs:1"));
    }

    #[test]
    fn test_readers_see_whole_tables_during_writes() {
        let state = Arc::new(FilterState::new());
        let writer = {
            let state = Arc::clone(&state);
            thread::spawn(move || {
                for i in 0..200 {
                    state.set_file_mask(format!("f{}.rs", i), LevelMask::ALL);
                }
            })
        };

        // Every snapshot must contain a prefix f0..fN with no gaps.
        for _ in 0..200 {
            let snapshot = state.file_masks();
            let n = snapshot.len();
            for i in 0..n {
                assert!(snapshot.contains_key(&format!("f{}.rs", i)));
            }
        }
        writer.join().unwrap();
        assert_eq!(state.file_masks().len(), 200);
    }
}
