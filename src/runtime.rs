//! Day/night provider
//!
//! ## Table of Contents
//! - **DayNightProvider**: Owns the clock and its two background tasks
//! - **DayNightHandle**: Read-only accessor handed to UI consumers
//!
//! Two independent triggers feed one synchronizer: a fixed-interval tick
//! and the foreground listener. Both stop on `shutdown()` or drop.

use crate::api::{ApiClient, TimeApi};
use crate::clock::{ClockState, ClockSynchronizer, SyncOutcome};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::joseon::{JoseonTime, Phase};
use crate::lifecycle::{is_foreground_transition, AppState, AppStateBus};
use crate::storage::open_store;
use crate::time_source::{SharedTimeSource, SystemTimeSource};
use crate::token::TokenStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// Running day/night clock with its tick and foreground tasks
pub struct DayNightProvider {
    clock: Arc<ClockSynchronizer>,
    shutdown_tx: broadcast::Sender<()>,
    tasks: Vec<JoinHandle<()>>,
}

impl DayNightProvider {
    /// Build the backend client from configuration and start the clock.
    pub async fn from_config(config: &ClientConfig, app_state: &AppStateBus) -> Result<Self> {
        config.validate()?;
        let store = open_store(config.store_path.as_deref())?;
        let api = ApiClient::new(config)?.with_tokens(TokenStore::new(store));

        let api: Arc<dyn TimeApi> = Arc::new(api);
        let time: SharedTimeSource = Arc::new(SystemTimeSource);
        let clock = ClockSynchronizer::new(api, time);

        Ok(Self::start(Arc::new(clock), app_state, config.tick_interval()).await)
    }

    /// Start ticking `clock` every `tick_interval` and resync on foreground.
    ///
    /// Performs the initial sync before returning.
    pub async fn start(
        clock: Arc<ClockSynchronizer>,
        app_state: &AppStateBus,
        tick_interval: Duration,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        // Subscribe before the first sync so no transition is missed
        let foreground = spawn_foreground_listener(
            Arc::clone(&clock),
            app_state.subscribe(),
            shutdown_tx.subscribe(),
        );

        let outcome = clock.sync().await;
        info!(?outcome, "Day/night provider mounted");

        let ticker = spawn_ticker(Arc::clone(&clock), tick_interval, shutdown_tx.subscribe());

        Self {
            clock,
            shutdown_tx,
            tasks: vec![foreground, ticker],
        }
    }

    /// Accessor for UI consumers
    pub fn handle(&self) -> DayNightHandle {
        DayNightHandle {
            clock: Arc::clone(&self.clock),
        }
    }

    /// Stop both background tasks and wait for them to finish
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(());
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!(error = %e, "Day/night task ended abnormally");
                }
            }
        }
        info!("Day/night provider stopped");
    }
}

impl Drop for DayNightProvider {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
        for task in &self.tasks {
            task.abort();
        }
    }
}

fn spawn_ticker(
    clock: Arc<ClockSynchronizer>,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    clock.tick();
                }
                _ = shutdown.recv() => break,
            }
        }
    })
}

fn spawn_foreground_listener(
    clock: Arc<ClockSynchronizer>,
    mut events: broadcast::Receiver<AppState>,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last = AppState::Active;

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(next) => {
                        if is_foreground_transition(last, next) {
                            info!("App returned to foreground, resyncing clock");
                            clock.sync().await;
                        }
                        last = next;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "App state events dropped");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = shutdown.recv() => break,
            }
        }
    })
}

/// What UI code sees of the clock
#[derive(Clone)]
pub struct DayNightHandle {
    clock: Arc<ClockSynchronizer>,
}

impl DayNightHandle {
    /// Whether the current double-hour is night
    pub fn is_night(&self) -> bool {
        self.clock.is_night()
    }

    /// Current double-hour
    pub fn current_time(&self) -> JoseonTime {
        self.clock.current_time()
    }

    /// Force a resync
    pub async fn toggle_time(&self) -> SyncOutcome {
        self.clock.toggle_time().await
    }

    /// Flip the debug offset; see [`ClockSynchronizer::toggle_debug_time`]
    pub fn toggle_debug_time(&self) -> Phase {
        self.clock.toggle_debug_time()
    }

    /// Watch for double-hour changes
    pub fn subscribe(&self) -> watch::Receiver<JoseonTime> {
        self.clock.subscribe()
    }

    /// Snapshot of the clock state
    pub fn state(&self) -> ClockState {
        self.clock.state()
    }
}
