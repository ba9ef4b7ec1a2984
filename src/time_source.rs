//! Injectable wall clock
//!
//! The synchronizer never reads the system clock directly; it asks a
//! [`TimeSource`] for "now" and for the local hour of an instant. Tests
//! drive a [`ManualTimeSource`] instead.

use chrono::{DateTime, FixedOffset, Local, Offset, TimeZone, Timelike, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Milliseconds in one hour
pub const MS_PER_HOUR: i64 = 3_600_000;

/// Source of wall-clock time
pub trait TimeSource: Send + Sync {
    /// Current Unix time in milliseconds
    fn now_ms(&self) -> i64;

    /// Local hour of day (0-23) of a Unix instant in milliseconds
    fn hour_of_day(&self, epoch_ms: i64) -> u32;
}

/// Type alias for a shared time source
pub type SharedTimeSource = Arc<dyn TimeSource>;

/// Device clock in the device's local timezone
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn hour_of_day(&self, epoch_ms: i64) -> u32 {
        match Local.timestamp_millis_opt(epoch_ms).earliest() {
            Some(dt) => dt.hour(),
            None => utc_hour(epoch_ms),
        }
    }
}

fn utc_hour(epoch_ms: i64) -> u32 {
    DateTime::<Utc>::from_timestamp_millis(epoch_ms)
        .map(|dt| dt.hour())
        .unwrap_or(0)
}

/// Hand-driven clock with a fixed UTC offset
#[derive(Debug)]
pub struct ManualTimeSource {
    now_ms: AtomicI64,
    offset: FixedOffset,
}

impl ManualTimeSource {
    /// Clock at `start_ms` in UTC
    pub fn new(start_ms: i64) -> Self {
        Self::with_offset(start_ms, 0)
    }

    /// Clock at `start_ms` whose local time is `offset_secs` east of UTC.
    ///
    /// Offsets beyond ±24h fall back to UTC.
    pub fn with_offset(start_ms: i64, offset_secs: i32) -> Self {
        let offset = FixedOffset::east_opt(offset_secs).unwrap_or_else(|| Utc.fix());
        Self {
            now_ms: AtomicI64::new(start_ms),
            offset,
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        self.now_ms
            .fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }

    /// Jump to an absolute instant
    pub fn set(&self, epoch_ms: i64) {
        self.now_ms.store(epoch_ms, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }

    fn hour_of_day(&self, epoch_ms: i64) -> u32 {
        match self.offset.timestamp_millis_opt(epoch_ms).single() {
            Some(dt) => dt.hour(),
            None => utc_hour(epoch_ms),
        }
    }
}
