//! Lock kinds and timed-lock durations.
//!
//! A [`LockKind`] selects which resolver on the server handles a request.
//! Timed locks carry a [`LockDuration`], a signed magnitude plus a
//! [`TimeUnit`], converted to a [`std::time::Duration`] on the server.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The lock variant a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockKind {
    /// Plain mutual exclusion, no re-entrancy.
    Simple,
    /// The same owner may re-acquire; released when the hold count hits zero.
    Reentrant,
    /// Released automatically once its duration elapses.
    Timeout,
}

impl LockKind {
    /// All kinds, in a stable order.
    pub const ALL: [LockKind; 3] = [LockKind::Simple, LockKind::Reentrant, LockKind::Timeout];

    pub fn as_str(&self) -> &'static str {
        match self {
            LockKind::Simple => "simple",
            LockKind::Reentrant => "reentrant",
            LockKind::Timeout => "timeout",
        }
    }
}

impl fmt::Display for LockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LockKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "simple" => Ok(LockKind::Simple),
            "reentrant" => Ok(LockKind::Reentrant),
            "timeout" => Ok(LockKind::Timeout),
            other => Err(format!(
                "invalid lock kind '{}': expected 'simple', 'reentrant' or 'timeout'",
                other
            )),
        }
    }
}

/// Unit of a [`LockDuration`] magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    /// Nanoseconds in one unit.
    fn nanos(&self) -> u64 {
        match self {
            TimeUnit::Nanoseconds => 1,
            TimeUnit::Microseconds => 1_000,
            TimeUnit::Milliseconds => 1_000_000,
            TimeUnit::Seconds => 1_000_000_000,
            TimeUnit::Minutes => 60 * 1_000_000_000,
            TimeUnit::Hours => 60 * 60 * 1_000_000_000,
            TimeUnit::Days => 24 * 60 * 60 * 1_000_000_000,
        }
    }
}

impl FromStr for TimeUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ns" | "nanoseconds" => Ok(TimeUnit::Nanoseconds),
            "us" | "microseconds" => Ok(TimeUnit::Microseconds),
            "ms" | "milliseconds" => Ok(TimeUnit::Milliseconds),
            "s" | "seconds" => Ok(TimeUnit::Seconds),
            "m" | "minutes" => Ok(TimeUnit::Minutes),
            "h" | "hours" => Ok(TimeUnit::Hours),
            "d" | "days" => Ok(TimeUnit::Days),
            other => Err(format!("invalid time unit '{}'", other)),
        }
    }
}

/// How long a timed lock may be held before the server reclaims it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockDuration {
    pub magnitude: i64,
    pub unit: TimeUnit,
}

impl LockDuration {
    pub fn new(magnitude: i64, unit: TimeUnit) -> Self {
        LockDuration { magnitude, unit }
    }

    pub fn seconds(magnitude: i64) -> Self {
        Self::new(magnitude, TimeUnit::Seconds)
    }

    pub fn millis(magnitude: i64) -> Self {
        Self::new(magnitude, TimeUnit::Milliseconds)
    }

    /// Converts to a [`Duration`]. Non-positive magnitudes mean "already
    /// expired" and map to zero; overflow saturates.
    pub fn to_std(&self) -> Duration {
        if self.magnitude <= 0 {
            return Duration::ZERO;
        }
        let nanos = (self.magnitude as u128).saturating_mul(self.unit.nanos() as u128);
        let secs = nanos / 1_000_000_000;
        if secs > u64::MAX as u128 {
            return Duration::MAX;
        }
        Duration::new(secs as u64, (nanos % 1_000_000_000) as u32)
    }
}

impl fmt::Display for LockDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.magnitude, self.unit)
    }
}
