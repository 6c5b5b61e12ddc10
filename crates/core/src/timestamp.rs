//! Nanosecond-precision timestamp type
//!
//! The store keeps time as whole seconds plus a nanosecond remainder relative
//! to the Unix epoch (1970-01-01 00:00:00 UTC). Seconds are signed so dates
//! before the epoch survive a round trip.
//!
//! ## Normalization
//!
//! The nanosecond part is always in `0..1_000_000_000`. A moment before the
//! epoch is stored as a negative `seconds` with a non-negative remainder
//! (e.g. -0.25s is `seconds = -1, nanos = 750_000_000`), so the derived
//! ordering on `(seconds, nanos)` is chronological.
//!
//! ```
//! use dualstore_core::Timestamp;
//!
//! let ts = Timestamp::new(1_700_000_000, 5);
//! let dt = ts.to_datetime().unwrap();
//! assert_eq!(Timestamp::from(dt), ts);
//! ```

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Seconds + nanoseconds since the Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    seconds: i64,
    nanos: u32,
}

impl Timestamp {
    /// Unix epoch (1970-01-01 00:00:00 UTC)
    pub const EPOCH: Timestamp = Timestamp {
        seconds: 0,
        nanos: 0,
    };

    // =========================================================================
    // Constructors
    // =========================================================================

    /// Create a timestamp, normalizing an out-of-range nanosecond part into
    /// the seconds field.
    pub fn new(seconds: i64, nanos: i64) -> Self {
        let carry = nanos.div_euclid(NANOS_PER_SEC);
        let rem = nanos.rem_euclid(NANOS_PER_SEC);
        Timestamp {
            seconds: seconds.saturating_add(carry),
            nanos: rem as u32,
        }
    }

    /// Create a timestamp for the current moment
    pub fn now() -> Self {
        Timestamp::from(SystemTime::now())
    }

    /// Create a timestamp from whole seconds since epoch
    pub const fn from_secs(seconds: i64) -> Self {
        Timestamp { seconds, nanos: 0 }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Whole seconds since the epoch (floor for pre-epoch values)
    #[inline]
    pub const fn seconds(&self) -> i64 {
        self.seconds
    }

    /// Nanosecond remainder, always in `0..1_000_000_000`
    #[inline]
    pub const fn nanos(&self) -> u32 {
        self.nanos
    }

    /// Convert to a chrono UTC datetime
    ///
    /// Returns `None` when the value lies outside chrono's supported range.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.seconds, self.nanos).single()
    }

    /// Convert to `SystemTime`
    ///
    /// Returns `None` when the platform clock cannot represent the value.
    pub fn to_system_time(&self) -> Option<SystemTime> {
        let nanos = Duration::from_nanos(u64::from(self.nanos));
        if self.seconds >= 0 {
            UNIX_EPOCH.checked_add(Duration::from_secs(self.seconds as u64))?.checked_add(nanos)
        } else {
            UNIX_EPOCH
                .checked_sub(Duration::from_secs(self.seconds.unsigned_abs()))?
                .checked_add(nanos)
        }
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp::EPOCH
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.to_rfc3339()),
            None => write!(f, "{}.{:09}", self.seconds, self.nanos),
        }
    }
}

// ============================================================================
// From Implementations
// ============================================================================

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Timestamp::new(dt.timestamp(), i64::from(dt.timestamp_subsec_nanos()))
    }
}

impl From<SystemTime> for Timestamp {
    fn from(t: SystemTime) -> Self {
        match t.duration_since(UNIX_EPOCH) {
            Ok(d) => Timestamp::new(
                i64::try_from(d.as_secs()).unwrap_or(i64::MAX),
                i64::from(d.subsec_nanos()),
            ),
            Err(e) => {
                let d = e.duration();
                // 2^63 seconds back is i64::MIN, which has no positive counterpart.
                let seconds = i64::try_from(d.as_secs()).map_or(i64::MIN, |s| -s);
                Timestamp::new(seconds, -i64::from(d.subsec_nanos()))
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
