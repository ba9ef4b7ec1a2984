//! Server-synchronized day/night clock
//!
//! ## Table of Contents
//! - **ClockState**: Anchor pair, time scale and debug offset
//! - **SyncState**: UNSYNCED until the first sync completes
//! - **ClockSynchronizer**: `sync`, `tick`, `toggle_debug_time`
//!
//! The displayed hour is
//! `(local_hour(base_epoch + (now - base_client) * scale) + debug_offset) % 24`.
//! A failed sync anchors on device time at scale 1, so the clock never stalls.
//! Scaled time saturates instead of overflowing on extreme server values.

use crate::api::TimeApi;
use crate::joseon::{lookup, JoseonTime, Phase};
use crate::time_source::SharedTimeSource;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Hours the debug toggle shifts the display by
pub const DEBUG_OFFSET_HOURS: u32 = 12;

/// Server time paired with the local time it was observed at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    /// Server time in Unix milliseconds
    pub base_epoch_ms: i64,
    /// Local time in Unix milliseconds when the server time was received
    pub base_client_ms: i64,
}

/// Whether an anchor exists yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No sync has completed; ticks do nothing
    Unsynced,
    /// Anchored and ticking
    Synced,
}

/// How the last sync anchored the clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SyncOutcome {
    /// Anchored on server time
    Server {
        /// Server time in milliseconds
        epoch_ms: i64,
        /// Applied time scale
        time_scale: f64,
    },
    /// Backend unreachable; anchored on device time at scale 1
    LocalFallback,
}

/// Mutable clock state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockState {
    /// Set by the first sync, replaced by every later one
    pub anchor: Option<Anchor>,
    /// Multiplier on local elapsed time
    pub time_scale: f64,
    /// Hours added to the displayed hour: 0 or [`DEBUG_OFFSET_HOURS`]
    pub debug_offset_hours: u32,
}

impl Default for ClockState {
    fn default() -> Self {
        Self {
            anchor: None,
            time_scale: 1.0,
            debug_offset_hours: 0,
        }
    }
}

impl ClockState {
    /// UNSYNCED or SYNCED
    pub fn sync_state(&self) -> SyncState {
        match self.anchor {
            Some(_) => SyncState::Synced,
            None => SyncState::Unsynced,
        }
    }

    /// Scaled server time at local instant `now_ms`, if anchored
    pub fn scaled_epoch_ms(&self, now_ms: i64) -> Option<i64> {
        let anchor = self.anchor?;
        let elapsed = now_ms.saturating_sub(anchor.base_client_ms) as f64;
        // f64 -> i64 casts saturate
        let scaled = (elapsed * self.time_scale).round() as i64;
        Some(anchor.base_epoch_ms.saturating_add(scaled))
    }
}

/// Keeps the in-game double-hour in step with the backend clock
pub struct ClockSynchronizer {
    api: Arc<dyn TimeApi>,
    time: SharedTimeSource,
    state: Mutex<ClockState>,
    current: watch::Sender<JoseonTime>,
    syncs: AtomicU64,
}

impl ClockSynchronizer {
    /// New UNSYNCED clock showing the device-local hour
    pub fn new(api: Arc<dyn TimeApi>, time: SharedTimeSource) -> Self {
        let initial = *lookup(time.hour_of_day(time.now_ms()));
        let (current, _) = watch::channel(initial);
        Self {
            api,
            time,
            state: Mutex::new(ClockState::default()),
            current,
            syncs: AtomicU64::new(0),
        }
    }

    /// Snapshot of the clock state
    pub fn state(&self) -> ClockState {
        *self.state.lock()
    }

    /// UNSYNCED or SYNCED
    pub fn sync_state(&self) -> SyncState {
        self.state.lock().sync_state()
    }

    /// Number of completed syncs
    pub fn sync_count(&self) -> u64 {
        self.syncs.load(Ordering::SeqCst)
    }

    /// Last computed double-hour
    pub fn current_time(&self) -> JoseonTime {
        *self.current.borrow()
    }

    /// Whether the last computed double-hour is night
    pub fn is_night(&self) -> bool {
        self.current.borrow().is_night
    }

    /// Watch the double-hour; receivers wake only when the block changes
    pub fn subscribe(&self) -> watch::Receiver<JoseonTime> {
        self.current.subscribe()
    }

    /// Re-anchor on server time, or on device time if the backend fails.
    ///
    /// Never returns an error. A sample with an unusable epoch or scale is
    /// treated like a failed fetch. The display is recomputed before returning.
    pub async fn sync(&self) -> SyncOutcome {
        let fetched = self
            .api
            .fetch_server_time()
            .await
            .and_then(|sample| sample.validate().map(|()| sample));
        let now = self.time.now_ms();

        let (anchor, time_scale, outcome) = match fetched {
            Ok(sample) => {
                let epoch_ms = sample.epoch_ms();
                let time_scale = sample.scale();
                (
                    Anchor {
                        base_epoch_ms: epoch_ms,
                        base_client_ms: now,
                    },
                    time_scale,
                    SyncOutcome::Server {
                        epoch_ms,
                        time_scale,
                    },
                )
            }
            Err(e) => {
                if e.is_transport() {
                    warn!(error = %e, "Backend unreachable, using device time");
                } else {
                    warn!(error = %e, "Server time unusable, using device time");
                }
                (
                    Anchor {
                        base_epoch_ms: now,
                        base_client_ms: now,
                    },
                    1.0,
                    SyncOutcome::LocalFallback,
                )
            }
        };

        let previous = {
            let mut state = self.state.lock();
            let previous = state.sync_state();
            state.anchor = Some(anchor);
            state.time_scale = time_scale;
            previous
        };
        self.syncs.fetch_add(1, Ordering::SeqCst);

        if previous == SyncState::Unsynced {
            info!(epoch_ms = anchor.base_epoch_ms, time_scale, "Clock synced");
        } else {
            debug!(epoch_ms = anchor.base_epoch_ms, time_scale, "Clock resynced");
        }

        self.tick();
        outcome
    }

    /// Displayed hour of day including the debug offset; `None` while UNSYNCED
    pub fn current_hour(&self) -> Option<u32> {
        let state = self.state();
        let scaled = state.scaled_epoch_ms(self.time.now_ms())?;
        Some((self.time.hour_of_day(scaled) + state.debug_offset_hours) % 24)
    }

    /// Recompute and publish the double-hour; `None` while UNSYNCED
    pub fn tick(&self) -> Option<JoseonTime> {
        let hour = self.current_hour()?;
        let next = *lookup(hour);
        let changed = self.current.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        if changed {
            debug!(hour, name = next.name, phase = %next.phase(), "Double-hour changed");
        }
        Some(next)
    }

    /// Phase of the hour without the debug offset
    fn real_phase(&self) -> Phase {
        let now = self.time.now_ms();
        let instant = self.state().scaled_epoch_ms(now).unwrap_or(now);
        lookup(self.time.hour_of_day(instant)).phase()
    }

    /// Flip the debug offset and tell the backend which phase it now is.
    ///
    /// Turning the offset on announces the opposite of the real phase,
    /// turning it off announces the real phase. The notification runs in
    /// the background and its failure is only logged.
    pub fn toggle_debug_time(&self) -> Phase {
        let offset = {
            let mut state = self.state.lock();
            state.debug_offset_hours = if state.debug_offset_hours == 0 {
                DEBUG_OFFSET_HOURS
            } else {
                0
            };
            state.debug_offset_hours
        };

        let real = self.real_phase();
        let announced = if offset == 0 { real } else { real.opposite() };
        info!(offset, phase = %announced, "Debug time toggled");

        self.notify_phase(announced);
        self.tick();
        announced
    }

    /// Force a resync
    pub async fn toggle_time(&self) -> SyncOutcome {
        self.sync().await
    }

    fn notify_phase(&self, phase: Phase) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!(%phase, "No async runtime, phase notification dropped");
                return;
            }
        };

        let api = Arc::clone(&self.api);
        handle.spawn(async move {
            match api.notify_phase(phase).await {
                Ok(()) => debug!(%phase, "Phase notification delivered"),
                Err(e) => warn!(%phase, error = %e, "Phase notification failed"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MockTimeApi, ServerTimeSample};
    use crate::error::{ClockError, Result};
    use crate::time_source::{ManualTimeSource, TimeSource, MS_PER_HOUR};
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::mpsc;

    // 2023-11-14 22:13:20 UTC
    const EPOCH: f64 = 1_700_000_000.0;

    fn failing_api() -> MockTimeApi {
        let mut api = MockTimeApi::new();
        api.expect_fetch_server_time()
            .returning(|| Err(ClockError::network("connection refused")));
        api
    }

    fn clock_with(api: MockTimeApi, time: Arc<ManualTimeSource>) -> ClockSynchronizer {
        ClockSynchronizer::new(Arc::new(api), time)
    }

    /// Records phase notifications on a channel
    struct PhaseRecorder {
        tx: mpsc::UnboundedSender<Phase>,
    }

    #[async_trait]
    impl TimeApi for PhaseRecorder {
        async fn fetch_server_time(&self) -> Result<ServerTimeSample> {
            Ok(ServerTimeSample::new(EPOCH, 1.0))
        }

        async fn notify_phase(&self, phase: Phase) -> Result<()> {
            let _ = self.tx.send(phase);
            Err(ClockError::network("backend down"))
        }
    }

    #[test]
    fn test_scaled_epoch() {
        let state = ClockState {
            anchor: Some(Anchor {
                base_epoch_ms: 1_000,
                base_client_ms: 500,
            }),
            time_scale: 3.0,
            debug_offset_hours: 0,
        };
        assert_eq!(state.scaled_epoch_ms(1_500), Some(4_000));
        assert_eq!(ClockState::default().scaled_epoch_ms(1_500), None);
        assert_eq!(ClockState::default().sync_state(), SyncState::Unsynced);
    }

    #[tokio::test]
    async fn test_unsynced_tick_is_noop() {
        let time = Arc::new(ManualTimeSource::new(0));
        let clock = clock_with(MockTimeApi::new(), time);

        assert_eq!(clock.sync_state(), SyncState::Unsynced);
        assert!(clock.tick().is_none());
        assert!(clock.current_hour().is_none());
        // 00:00 UTC
        assert_eq!(clock.current_time().name, "자시");
    }

    #[tokio::test]
    async fn test_sync_success_uses_server_hour() {
        let mut api = MockTimeApi::new();
        api.expect_fetch_server_time()
            .times(1)
            .returning(|| Ok(ServerTimeSample::new(EPOCH, 1.0)));

        // Device clock is 5 hours off the server
        let time = Arc::new(ManualTimeSource::new(1_700_000_000_000 - 5 * MS_PER_HOUR));
        let clock = clock_with(api, time.clone());

        let outcome = clock.sync().await;
        assert_eq!(
            outcome,
            SyncOutcome::Server {
                epoch_ms: 1_700_000_000_000,
                time_scale: 1.0
            }
        );
        assert_eq!(clock.sync_state(), SyncState::Synced);
        assert_eq!(clock.current_hour(), Some(time.hour_of_day(1_700_000_000_000)));
        assert_eq!(clock.current_time(), *lookup(22));
        assert!(clock.is_night());
    }

    #[tokio::test]
    async fn test_missing_scale_defaults_to_one() {
        let mut api = MockTimeApi::new();
        api.expect_fetch_server_time().returning(|| {
            Ok(ServerTimeSample {
                epoch_seconds: EPOCH,
                time_scale: None,
            })
        });
        let clock = clock_with(api, Arc::new(ManualTimeSource::new(0)));
        clock.sync().await;
        assert_eq!(clock.state().time_scale, 1.0);
    }

    #[tokio::test]
    async fn test_sync_failure_falls_back_to_device_time() {
        // 10:00 UTC on the device
        let start = 10 * MS_PER_HOUR;
        let time = Arc::new(ManualTimeSource::new(start));
        let clock = clock_with(failing_api(), time.clone());

        assert_eq!(clock.sync().await, SyncOutcome::LocalFallback);

        let state = clock.state();
        assert_eq!(
            state.anchor,
            Some(Anchor {
                base_epoch_ms: start,
                base_client_ms: start
            })
        );
        assert_eq!(state.time_scale, 1.0);
        assert_eq!(clock.current_time().name, "사시");

        time.advance(Duration::from_secs(3 * 3600));
        assert_eq!(clock.tick().map(|t| t.name), Some("미시"));
        assert_eq!(clock.current_hour(), Some(13));
    }

    #[tokio::test]
    async fn test_scaled_scenario() {
        let mut api = MockTimeApi::new();
        api.expect_fetch_server_time()
            .returning(|| Ok(ServerTimeSample::new(EPOCH, 2.0)));

        let local_start = 42_000;
        let time = Arc::new(ManualTimeSource::with_offset(local_start, 9 * 3600));
        let clock = clock_with(api, time.clone());
        clock.sync().await;

        time.advance(Duration::from_secs(1800));
        let scaled = clock.state().scaled_epoch_ms(time.now_ms());
        assert_eq!(scaled, Some(1_700_003_600_000));
        assert_eq!(clock.current_hour(), Some(time.hour_of_day(1_700_003_600_000)));
        // 23:13 UTC is 08:13 in UTC+9
        assert_eq!(clock.tick().map(|t| t.name), Some("진시"));
    }

    #[tokio::test]
    async fn test_resync_never_returns_to_unsynced() {
        let mut api = MockTimeApi::new();
        let mut calls = 0;
        api.expect_fetch_server_time().times(2).returning(move || {
            calls += 1;
            if calls == 1 {
                Ok(ServerTimeSample::new(EPOCH, 1.0))
            } else {
                Err(ClockError::Http {
                    status: 502,
                    path: "/time".to_string(),
                })
            }
        });
        let clock = clock_with(api, Arc::new(ManualTimeSource::new(0)));

        clock.sync().await;
        assert_eq!(clock.toggle_time().await, SyncOutcome::LocalFallback);
        assert_eq!(clock.sync_state(), SyncState::Synced);
        assert_eq!(clock.sync_count(), 2);
    }

    #[tokio::test]
    async fn test_toggle_debug_twice_announces_opposite_phases() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        // Server says 22:13 UTC, night
        let clock = ClockSynchronizer::new(
            Arc::new(PhaseRecorder { tx }),
            Arc::new(ManualTimeSource::new(0)),
        );
        clock.sync().await;
        let before = clock.state().debug_offset_hours;
        assert!(clock.is_night());

        assert_eq!(clock.toggle_debug_time(), Phase::Day);
        assert_eq!(clock.state().debug_offset_hours, 12);
        // 22 + 12 = 10:00, 사시
        assert_eq!(clock.current_time().name, "사시");
        assert!(!clock.is_night());

        assert_eq!(clock.toggle_debug_time(), Phase::Night);
        assert_eq!(clock.state().debug_offset_hours, before);
        assert!(clock.is_night());

        let first = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
        let second = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
        let mut seen = vec![first.unwrap(), second.unwrap()];
        seen.sort_by_key(|p| *p == Phase::Night);
        assert_eq!(seen, vec![Phase::Day, Phase::Night]);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_toggle_without_runtime_does_not_panic() {
        let clock = clock_with(MockTimeApi::new(), Arc::new(ManualTimeSource::new(0)));
        clock.toggle_debug_time();
        assert_eq!(clock.state().debug_offset_hours, 12);
    }

    #[tokio::test]
    async fn test_debug_offset_shifts_by_twelve_hours() {
        // 05:00 and 17:00 are both day; turning debug on still announces night
        let time = Arc::new(ManualTimeSource::new(5 * MS_PER_HOUR));
        let mut api = failing_api();
        api.expect_notify_phase().returning(|_| Ok(()));
        let clock = clock_with(api, time);
        clock.sync().await;
        assert!(!clock.is_night());

        assert_eq!(clock.toggle_debug_time(), Phase::Night);
        assert_eq!(clock.current_hour(), Some(17));
        assert_eq!(clock.toggle_debug_time(), Phase::Day);
        assert_eq!(clock.current_hour(), Some(5));
    }

    #[test]
    fn test_scaled_epoch_saturates() {
        let state = ClockState {
            anchor: Some(Anchor {
                base_epoch_ms: 1_700_000_000_000,
                base_client_ms: 0,
            }),
            time_scale: 1e16,
            debug_offset_hours: 0,
        };
        assert_eq!(state.scaled_epoch_ms(1_000_000), Some(i64::MAX));

        let backwards = ClockState {
            anchor: Some(Anchor {
                base_epoch_ms: i64::MIN + 1,
                base_client_ms: i64::MAX,
            }),
            time_scale: 1.0,
            debug_offset_hours: 0,
        };
        assert_eq!(backwards.scaled_epoch_ms(i64::MIN), Some(i64::MIN));
    }

    #[tokio::test]
    async fn test_huge_time_scale_keeps_ticking() {
        let mut api = MockTimeApi::new();
        api.expect_fetch_server_time()
            .returning(|| Ok(ServerTimeSample::new(EPOCH, 1e16)));
        let time = Arc::new(ManualTimeSource::new(0));
        let clock = clock_with(api, time.clone());

        assert!(matches!(clock.sync().await, SyncOutcome::Server { .. }));
        time.advance(Duration::from_secs(1000));
        assert!(clock.tick().is_some());
        assert!(clock.current_hour().is_some());
    }

    #[tokio::test]
    async fn test_unusable_sample_falls_back() {
        for sample in [
            ServerTimeSample::new(f64::NAN, 1.0),
            ServerTimeSample::new(1e300, 1.0),
            ServerTimeSample::new(EPOCH, f64::INFINITY),
            ServerTimeSample::new(EPOCH, -2.0),
        ] {
            let mut api = MockTimeApi::new();
            api.expect_fetch_server_time().returning(move || Ok(sample));
            let time = Arc::new(ManualTimeSource::new(10 * MS_PER_HOUR));
            let clock = clock_with(api, time);

            assert_eq!(clock.sync().await, SyncOutcome::LocalFallback, "{:?}", sample);
            assert_eq!(clock.state().time_scale, 1.0);
            assert_eq!(clock.current_hour(), Some(10));
        }
    }

    #[tokio::test]
    async fn test_subscribers_see_block_changes() {
        let time = Arc::new(ManualTimeSource::new(10 * MS_PER_HOUR));
        let clock = clock_with(failing_api(), time.clone());
        clock.sync().await;

        let mut rx = clock.subscribe();
        rx.borrow_and_update();

        time.advance(Duration::from_secs(60));
        clock.tick();
        assert!(!rx.has_changed().unwrap());

        time.advance(Duration::from_secs(3600));
        clock.tick();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().name, "오시");
    }
}
