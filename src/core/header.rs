//! Line header formatting
//!
//! A header is built from optional segments, each followed by one space:
//!
//! ```text
//! <level-letter> <YYMMDD> <HH:MM:SS[.ffffff]> <file:line> <message>
//! ```
//!
//! Which segments appear is controlled by [`HeaderFlags`]. Dates render the
//! year as `year - 2000`; years before 2000 are clamped to 2000 so the date
//! never goes negative or short.

use super::call_site::short_file_name;
use super::log_level::LogLevel;
use chrono::{DateTime, Datelike, Local, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};
use std::ops::{BitOr, BitOrAssign};

/// Selects the segments of a line header.
///
/// # Examples
///
/// ```
/// use sitelog::HeaderFlags;
///
/// let flags = HeaderFlags::LEVEL | HeaderFlags::TIME | HeaderFlags::UTC;
/// assert!(flags.contains(HeaderFlags::TIME));
/// assert!(!flags.contains(HeaderFlags::DATE));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeaderFlags(u16);

impl HeaderFlags {
    pub const NONE: HeaderFlags = HeaderFlags(0);
    /// Single-letter level code
    pub const LEVEL: HeaderFlags = HeaderFlags(1);
    /// `YYMMDD`
    pub const DATE: HeaderFlags = HeaderFlags(1 << 1);
    /// `HH:MM:SS`
    pub const TIME: HeaderFlags = HeaderFlags(1 << 2);
    /// `.ffffff` after the time; implies `TIME`
    pub const MICROSECONDS: HeaderFlags = HeaderFlags(1 << 3);
    /// Full path of the calling file
    pub const LONG_FILE: HeaderFlags = HeaderFlags(1 << 4);
    /// Last path segment of the calling file; overrides `LONG_FILE`
    pub const SHORT_FILE: HeaderFlags = HeaderFlags(1 << 5);
    /// Render times in UTC instead of local time
    pub const UTC: HeaderFlags = HeaderFlags(1 << 6);

    pub const STD: HeaderFlags =
        HeaderFlags(Self::LEVEL.0 | Self::DATE.0 | Self::TIME.0 | Self::SHORT_FILE.0);

    #[inline]
    pub const fn contains(self, other: HeaderFlags) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn intersects(self, other: HeaderFlags) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub const fn bits(self) -> u16 {
        self.0
    }
}

impl Default for HeaderFlags {
    fn default() -> Self {
        HeaderFlags::STD
    }
}

impl BitOr for HeaderFlags {
    type Output = HeaderFlags;

    fn bitor(self, rhs: HeaderFlags) -> HeaderFlags {
        HeaderFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for HeaderFlags {
    fn bitor_assign(&mut self, rhs: HeaderFlags) {
        self.0 |= rhs.0;
    }
}

/// Header layout shared by every line a logger writes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderFormat {
    flags: HeaderFlags,
    path_prefix: Option<String>,
}

impl HeaderFormat {
    pub fn new(flags: HeaderFlags) -> Self {
        Self {
            flags,
            path_prefix: None,
        }
    }

    /// Strip `prefix` (and the separator after it) from long file names
    #[must_use]
    pub fn with_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.path_prefix = if prefix.is_empty() { None } else { Some(prefix) };
        self
    }

    pub fn flags(&self) -> HeaderFlags {
        self.flags
    }

    /// Render the header for one line.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use sitelog::{HeaderFlags, HeaderFormat, LogLevel};
    ///
    /// let format = HeaderFormat::new(HeaderFlags::STD | HeaderFlags::UTC);
    /// let now = Utc.with_ymd_and_hms(2018, 3, 9, 7, 5, 1).unwrap();
    /// assert_eq!(
    ///     format.render(LogLevel::Warn, now, "src/db/pool.rs", 17),
    ///     "W 180309 07:05:01 pool.rs:17 "
    /// );
    /// ```
    pub fn render(&self, level: LogLevel, now: DateTime<Utc>, path: &str, line: i64) -> String {
        let mut out = String::with_capacity(48);
        // Writing into a String cannot fail.
        let _ = self.write_header(&mut out, level, now, path, line);
        out
    }

    pub(crate) fn write_header(
        &self,
        out: &mut impl fmt::Write,
        level: LogLevel,
        now: DateTime<Utc>,
        path: &str,
        line: i64,
    ) -> fmt::Result {
        let flags = self.flags;

        if flags.contains(HeaderFlags::LEVEL) {
            out.write_char(level.letter())?;
            out.write_char(' ')?;
        }

        if flags.intersects(HeaderFlags::DATE | HeaderFlags::TIME | HeaderFlags::MICROSECONDS) {
            let local = self.civil_time(now);

            if flags.contains(HeaderFlags::DATE) {
                let year = local.year().max(2000) - 2000;
                write!(out, "{:02}{:02}{:02} ", year, local.month(), local.day())?;
            }

            if flags.intersects(HeaderFlags::TIME | HeaderFlags::MICROSECONDS) {
                write!(
                    out,
                    "{:02}:{:02}:{:02}",
                    local.hour(),
                    local.minute(),
                    local.second()
                )?;
                if flags.contains(HeaderFlags::MICROSECONDS) {
                    // Leap seconds report nanoseconds past 1e9.
                    let micros = (local.nanosecond() / 1_000).min(999_999);
                    write!(out, ".{:06}", micros)?;
                }
                out.write_char(' ')?;
            }
        }

        if flags.intersects(HeaderFlags::SHORT_FILE | HeaderFlags::LONG_FILE) {
            let file = if flags.contains(HeaderFlags::SHORT_FILE) {
                short_file_name(path)
            } else {
                self.trim_prefix(path)
            };
            write!(out, "{}:{} ", file, line)?;
        }

        Ok(())
    }

    fn civil_time(&self, now: DateTime<Utc>) -> NaiveDateTime {
        if self.flags.contains(HeaderFlags::UTC) {
            now.naive_utc()
        } else {
            now.with_timezone(&Local).naive_local()
        }
    }

    fn trim_prefix<'a>(&self, path: &'a str) -> &'a str {
        let Some(prefix) = self.path_prefix.as_deref() else {
            return path;
        };
        match path.strip_prefix(prefix) {
            Some(rest) => rest.trim_start_matches(['/', '\\']),
            None => path,
        }
    }
}
