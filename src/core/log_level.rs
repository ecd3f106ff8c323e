//! Log level and level mask definitions
//!
//! Levels are not ordered. Each [`LogLevel`] owns one bit and a [`LevelMask`]
//! is any combination of those bits; a level is active under a mask when its
//! bit is set.

use super::error::LoggerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info = 1,
    Warn = 1 << 1,
    Error = 1 << 2,
    Fatal = 1 << 3,
    Debug = 1 << 4,
}

impl LogLevel {
    /// Every level, in bit order
    pub const ALL: [LogLevel; 5] = [
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Fatal,
        LogLevel::Debug,
    ];

    #[inline]
    pub const fn bit(self) -> u8 {
        self as u8
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
            LogLevel::Debug => "DEBUG",
        }
    }

    /// Single-letter code used in line headers
    pub fn letter(&self) -> char {
        match self {
            LogLevel::Info => 'I',
            LogLevel::Warn => 'W',
            LogLevel::Error => 'E',
            LogLevel::Fatal => 'F',
            LogLevel::Debug => 'D',
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

impl FromStr for LogLevel {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "INFO" | "I" => Ok(LogLevel::Info),
            "WARN" | "WARNING" | "W" => Ok(LogLevel::Warn),
            "ERROR" | "E" => Ok(LogLevel::Error),
            "FATAL" | "F" => Ok(LogLevel::Fatal),
            "DEBUG" | "D" => Ok(LogLevel::Debug),
            _ => Err(LoggerError::invalid_level(s)),
        }
    }
}

/// A set of active levels.
///
/// Nothing stops a caller from building a mask without [`LogLevel::Fatal`];
/// keeping fatal enabled is a convention, not an invariant.
///
/// # Examples
///
/// ```
/// use sitelog::{LevelMask, LogLevel};
///
/// let mask = LogLevel::Info | LogLevel::Debug;
/// assert!(mask.contains(LogLevel::Debug));
/// assert!(!mask.contains(LogLevel::Warn));
/// assert!(!LevelMask::DEFAULT.contains(LogLevel::Debug));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LevelMask(u8);

impl LevelMask {
    pub const DISABLED: LevelMask = LevelMask(0);
    pub const DEFAULT: LevelMask = LevelMask(
        LogLevel::Info.bit() | LogLevel::Warn.bit() | LogLevel::Error.bit() | LogLevel::Fatal.bit(),
    );
    pub const ALL: LevelMask = LevelMask(Self::DEFAULT.0 | LogLevel::Debug.bit());

    /// Build a mask from raw bits; bits outside the known levels are kept
    /// but never match a level.
    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        LevelMask(bits)
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn contains(self, level: LogLevel) -> bool {
        self.0 & level.bit() != 0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn with(self, level: LogLevel) -> Self {
        LevelMask(self.0 | level.bit())
    }

    #[must_use]
    pub const fn without(self, level: LogLevel) -> Self {
        LevelMask(self.0 & !level.bit())
    }

    /// Active levels, in bit order
    pub fn levels(self) -> impl Iterator<Item = LogLevel> {
        LogLevel::ALL.into_iter().filter(move |l| self.contains(*l))
    }
}

impl Default for LevelMask {
    fn default() -> Self {
        LevelMask::DEFAULT
    }
}

impl From<LogLevel> for LevelMask {
    fn from(level: LogLevel) -> Self {
        LevelMask(level.bit())
    }
}

impl BitOr for LevelMask {
    type Output = LevelMask;

    fn bitor(self, rhs: LevelMask) -> LevelMask {
        LevelMask(self.0 | rhs.0)
    }
}

impl BitOr<LogLevel> for LevelMask {
    type Output = LevelMask;

    fn bitor(self, rhs: LogLevel) -> LevelMask {
        self.with(rhs)
    }
}

impl BitOr for LogLevel {
    type Output = LevelMask;

    fn bitor(self, rhs: LogLevel) -> LevelMask {
        LevelMask(self.bit() | rhs.bit())
    }
}

impl BitOrAssign for LevelMask {
    fn bitor_assign(&mut self, rhs: LevelMask) {
        self.0 |= rhs.0;
    }
}

impl BitOrAssign<LogLevel> for LevelMask {
    fn bitor_assign(&mut self, rhs: LogLevel) {
        self.0 |= rhs.bit();
    }
}

impl BitAnd for LevelMask {
    type Output = LevelMask;

    fn bitand(self, rhs: LevelMask) -> LevelMask {
        LevelMask(self.0 & rhs.0)
    }
}

impl fmt::Display for LevelMask {
    /// Known levels by name, then any unknown bits as one hex term, so the
    /// text form parses back to the same mask.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("disabled");
        }
        let mut terms: Vec<String> = self.levels().map(|l| l.to_str().to_lowercase()).collect();
        let unknown = self.0 & !LevelMask::ALL.0;
        if unknown != 0 {
            terms.push(format!("{:#04x}", unknown));
        }
        f.write_str(&terms.join("|"))
    }
}

impl FromStr for LevelMask {
    type Err = LoggerError;

    /// Parses `info|debug`, `info,debug`, single letters, raw hex bits such
    /// as `0x40`, or one of the keywords `default`, `all`, `disabled`, `none`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_lowercase().as_str() {
            "" | "disabled" | "none" => return Ok(LevelMask::DISABLED),
            "default" => return Ok(LevelMask::DEFAULT),
            "all" => return Ok(LevelMask::ALL),
            _ => {}
        }

        let mut mask = LevelMask::DISABLED;
        for part in trimmed.split(['|', ',']) {
            let part = part.trim();
            match part.strip_prefix("0x").or_else(|| part.strip_prefix("0X")) {
                Some(hex) => {
                    let bits = u8::from_str_radix(hex, 16)
                        .map_err(|_| LoggerError::invalid_level(part))?;
                    mask = mask | LevelMask(bits);
                }
                None => mask |= part.parse::<LogLevel>()?,
            }
        }
        Ok(mask)
    }
}

impl TryFrom<String> for LevelMask {
    type Error = LoggerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LevelMask> for String {
    fn from(mask: LevelMask) -> Self {
        mask.to_string()
    }
}
