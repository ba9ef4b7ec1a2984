//! App lifecycle events
//!
//! The host shell publishes foreground/background changes here. Timers do
//! not fire while a mobile app is suspended, so the clock resyncs whenever
//! the app comes back to the foreground.

use tokio::sync::broadcast;
use tracing::debug;

/// Capacity of the lifecycle channel
const BUS_CAPACITY: usize = 16;

/// Host app state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppState {
    /// In the foreground and receiving input
    Active,
    /// Backgrounded
    Background,
    /// Transitioning or interrupted (calls, app switcher)
    Inactive,
}

/// True when `next` brings the app back to the foreground
pub fn is_foreground_transition(prev: AppState, next: AppState) -> bool {
    next == AppState::Active && prev != AppState::Active
}

/// Broadcast bus for app state changes
#[derive(Debug, Clone)]
pub struct AppStateBus {
    tx: broadcast::Sender<AppState>,
}

impl Default for AppStateBus {
    fn default() -> Self {
        Self::new()
    }
}

impl AppStateBus {
    /// Create a bus with no subscribers
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    /// Publish a state change; returns how many listeners saw it
    pub fn publish(&self, state: AppState) -> usize {
        let receivers = self.tx.send(state).unwrap_or(0);
        debug!(?state, receivers, "App state published");
        receivers
    }

    /// Listen for state changes
    pub fn subscribe(&self) -> broadcast::Receiver<AppState> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreground_transitions() {
        use AppState::*;
        assert!(is_foreground_transition(Background, Active));
        assert!(is_foreground_transition(Inactive, Active));
        assert!(!is_foreground_transition(Active, Active));
        assert!(!is_foreground_transition(Active, Background));
        assert!(!is_foreground_transition(Background, Inactive));
    }

    #[tokio::test]
    async fn test_bus_delivers_to_subscribers() {
        let bus = AppStateBus::new();
        assert_eq!(bus.publish(AppState::Active), 0);

        let mut rx = bus.subscribe();
        assert_eq!(bus.publish(AppState::Background), 1);
        assert_eq!(rx.recv().await.unwrap(), AppState::Background);
    }
}
