//! Call-site resolution
//!
//! The hot path uses `#[track_caller]`: every logging entry point and the
//! shared dispatch function carry the attribute, so [`CallSite::caller`]
//! observes the user's source location no matter how many tracked frames sit
//! in between. An untracked wrapper anywhere in that chain silently turns the
//! reported location into the wrapper's own; the regression tests in
//! `logger.rs` pin the reported line for each entry point.
//!
//! [`resolve`] is the stack-walking variant for code that cannot carry the
//! attribute. It is far slower and depends on debug symbols.

use super::stack_trace;
use serde::{Deserialize, Serialize};
use std::borrow::{Borrow, Cow};
use std::convert::Infallible;
use std::fmt;
use std::panic::Location;
use std::str::FromStr;

/// File name reported when the call site cannot be determined
pub const UNKNOWN_FILE: &str = "[???]";

/// Last path segment of `path`, accepting both separators
pub fn short_file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    path: Cow<'static, str>,
    line: i64,
}

impl CallSite {
    /// Sentinel for an unknown location
    pub const UNKNOWN: CallSite = CallSite {
        path: Cow::Borrowed(UNKNOWN_FILE),
        line: -1,
    };

    /// Location of the (tracked) caller
    #[track_caller]
    #[inline]
    pub fn caller() -> Self {
        Self::from_location(Location::caller())
    }

    pub fn from_location(location: &'static Location<'static>) -> Self {
        Self {
            path: Cow::Borrowed(location.file()),
            line: i64::from(location.line()),
        }
    }

    pub fn new(path: impl Into<Cow<'static, str>>, line: i64) -> Self {
        Self {
            path: path.into(),
            line,
        }
    }

    /// Path as recorded by the compiler (or the debug info)
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last path segment, as used in keys and file filters
    pub fn file_name(&self) -> &str {
        short_file_name(&self.path)
    }

    pub fn line(&self) -> i64 {
        self.line
    }

    pub fn is_unknown(&self) -> bool {
        self.line < 0
    }

    pub fn key(&self) -> CallSiteKey {
        CallSiteKey::new(self.file_name(), self.line)
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file_name(), self.line)
    }
}

/// Walk the stack `skip` frames above the caller of this function.
///
/// `resolve(0)` reports the line in the calling function where `resolve` was
/// invoked. Returns [`CallSite::UNKNOWN`] when the stack cannot be captured
/// or the frame carries no location.
#[inline(never)]
pub fn resolve(skip: usize) -> CallSite {
    let frame = stack_trace::frames_above("call_site::resolve", skip)
        .and_then(|frames| frames.into_iter().next());

    match frame {
        Some(frame) => match (frame.file, frame.line) {
            (Some(file), Some(line)) => CallSite::new(file, i64::from(line)),
            _ => CallSite::UNKNOWN,
        },
        None => CallSite::UNKNOWN,
    }
}

/// Normalized `<short-file-name>:<line>` identifier of a call site.
///
/// Keys are opaque once built: a string that does not look like
/// `file:line` is accepted and simply never matches a real call site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallSiteKey(String);

impl CallSiteKey {
    pub fn new(file: &str, line: impl fmt::Display) -> Self {
        CallSiteKey(format!("{}:{}", short_file_name(file), line))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CallSiteKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallSiteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CallSiteKey {
    fn from(s: &str) -> Self {
        CallSiteKey(s.trim().to_string())
    }
}

impl From<String> for CallSiteKey {
    fn from(s: String) -> Self {
        CallSiteKey::from(s.as_str())
    }
}

impl FromStr for CallSiteKey {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(CallSiteKey::from(s))
    }
}
