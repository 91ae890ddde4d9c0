//! Timestamps and time providers for I/O point state
//!
//! State commits never read the clock themselves. The scheduler supplies the
//! cycle's logical timestamp through the execution context, and tools that
//! act as a scheduler pick a [`TimeProvider`].

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

/// Point in time used for update and change time stamps
///
/// The default value is [`Timestamp::MIN`], the "never updated" marker used
/// by freshly prepared state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Earliest representable time stamp
    pub const MIN: Timestamp = Timestamp(DateTime::<Utc>::MIN_UTC);

    /// Current wall clock time
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Create a time stamp from milliseconds since the Unix epoch
    ///
    /// Values outside chrono's range saturate to the nearest bound.
    pub fn from_millis(millis: i64) -> Self {
        match DateTime::<Utc>::from_timestamp_millis(millis) {
            Some(dt) => Self(dt),
            None if millis < 0 => Self::MIN,
            None => Self(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Milliseconds since the Unix epoch
    pub fn as_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Whether this is the "never updated" marker
    pub fn is_min(&self) -> bool {
        *self == Self::MIN
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::MIN
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_min() {
            f.write_str("-")
        } else {
            f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::Millis, true))
        }
    }
}

/// Time provider trait for generating scheduled time stamps
///
/// This trait abstracts time acquisition, allowing:
/// - System time for production use
/// - Manually driven time for deterministic tests and simulation
pub trait TimeProvider: Send + Sync + 'static {
    /// Get the current time stamp
    fn now(&self) -> Timestamp;
}

/// System time provider using the local clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Manually driven time provider
///
/// Returns a predetermined time stamp until it is advanced.
#[derive(Debug)]
pub struct ManualTimeProvider {
    millis: AtomicI64,
}

impl ManualTimeProvider {
    /// Create a new manual time provider starting at the given milliseconds
    pub fn new(millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(millis),
        }
    }

    /// Move the clock forward and return the new time stamp
    pub fn advance(&self, millis: i64) -> Timestamp {
        let now = self.millis.fetch_add(millis, Ordering::SeqCst) + millis;
        Timestamp::from_millis(now)
    }
}

impl TimeProvider for ManualTimeProvider {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.millis.load(Ordering::SeqCst))
    }
}
