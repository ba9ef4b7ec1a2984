//! # Joseon Day/Night
//!
//! Server-synchronized day/night clock for the minsim game client. The
//! backend owns game time: it reports its epoch and a time-scale multiplier
//! that speeds up the cycle. The client anchors on that report, advances
//! with local elapsed time, and maps the result onto the twelve Joseon
//! double-hours (십이시).
//!
//! ## Features
//!
//! - **Clock**: Anchor on `GET /time`, fall back to device time when offline
//! - **Provider**: 1-second tick plus resync when the app returns to the foreground
//! - **Debug toggle**: Shift the display by 12 hours and announce the phase
//! - **API client**: Bearer-token HTTP client for the game backend
//! - **Local state**: Access token and once-per-day action flags
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use joseon_daynight::{AppState, AppStateBus, ClientConfig, DayNightProvider};
//!
//! #[tokio::main]
//! async fn main() -> joseon_daynight::Result<()> {
//!     let bus = AppStateBus::new();
//!     let provider = DayNightProvider::from_config(&ClientConfig::from_env()?, &bus).await?;
//!     let clock = provider.handle();
//!
//!     println!("{}", clock.current_time());
//!     bus.publish(AppState::Background);
//!     bus.publish(AppState::Active);
//!
//!     provider.shutdown().await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod api;
pub mod clock;
pub mod config;
pub mod daily;
pub mod error;
pub mod joseon;
pub mod lifecycle;
pub mod runtime;
pub mod storage;
pub mod telemetry;
pub mod time_source;
pub mod token;

pub use api::{ApiClient, ServerTimeSample, TimeApi};
pub use clock::{ClockState, ClockSynchronizer, SyncOutcome, SyncState};
pub use config::ClientConfig;
pub use daily::{DailyActionFlags, DailyFlagStore};
pub use error::{ClockError, Result};
pub use joseon::{is_day_time, lookup, JoseonTime, Phase};
pub use lifecycle::{AppState, AppStateBus};
pub use runtime::{DayNightHandle, DayNightProvider};
pub use storage::{FileStore, MemoryStore, StateStore};
pub use time_source::{ManualTimeSource, SystemTimeSource, TimeSource};
pub use token::TokenStore;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::clock::ClockSynchronizer;
    pub use crate::config::ClientConfig;
    pub use crate::error::Result;
    pub use crate::joseon::{JoseonTime, Phase};
    pub use crate::lifecycle::{AppState, AppStateBus};
    pub use crate::runtime::{DayNightHandle, DayNightProvider};
}
