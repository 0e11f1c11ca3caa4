//! Connection state management
//!
//! Tracks the lifecycle of the client's single transport and owns the
//! reconnection strategy together with its retry counter.
//!
//! # Connection States
//!
//! ```text
//! Disconnected → Connecting → Open → Closing → Disconnected
//!                    ↓          ↓
//!              Reconnecting { attempt } → Open
//!                    ↓
//!              Disconnected (attempts exhausted)
//! ```
//!
//! The current state is published on a `watch` channel so callers can await
//! transitions instead of polling.

use crate::reconnect::ReconnectionStrategy;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::{watch, Mutex};

/// Lifecycle state of the client connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport; initial and terminal state
    Disconnected,
    /// First handshake in progress
    Connecting,
    /// Transport open, calls allowed
    Open,
    /// Transport lost, waiting for or performing attempt `attempt` (1-based)
    Reconnecting { attempt: u32 },
    /// `close()` in progress
    Closing,
}

impl ConnectionState {
    /// Numeric encoding used by the connection state gauge
    pub fn as_metric(&self) -> i64 {
        match self {
            ConnectionState::Disconnected => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Open => 2,
            ConnectionState::Reconnecting { .. } => 3,
            ConnectionState::Closing => 4,
        }
    }
}

/// Owns connection state and reconnection bookkeeping
pub struct ConnectionManager {
    state: watch::Sender<ConnectionState>,
    strategy: Mutex<Option<Box<dyn ReconnectionStrategy>>>,
    attempts: AtomicU32,
}

impl ConnectionManager {
    /// Create a manager; `strategy = None` disables reconnection
    pub fn new(strategy: Option<Box<dyn ReconnectionStrategy>>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            state,
            strategy: Mutex::new(strategy),
            attempts: AtomicU32::new(0),
        }
    }

    /// Current state
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch state transitions
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Set the state, returning the previous one
    pub fn set_state(&self, new_state: ConnectionState) -> ConnectionState {
        self.state.send_replace(new_state)
    }

    /// Transport opened: zero the retry counter and reset the strategy
    pub async fn opened(&self) {
        self.attempts.store(0, Ordering::SeqCst);
        if let Some(strategy) = self.strategy.lock().await.as_mut() {
            strategy.reset();
        }
        self.set_state(ConnectionState::Open);
    }

    /// Zero the retry counter without touching the state
    pub fn reset_attempts(&self) {
        self.attempts.store(0, Ordering::SeqCst);
    }

    /// Number of consecutive failed attempts since the last open
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// True when a reconnection strategy is configured
    pub async fn can_reconnect(&self) -> bool {
        self.strategy.lock().await.is_some()
    }

    /// Ask the strategy for the next attempt
    ///
    /// Returns the 1-based attempt number and its delay, moving to
    /// `Reconnecting { attempt }`. Returns `None` once the strategy gives up
    /// (or none is configured), leaving the state untouched.
    pub async fn next_reconnect_delay(&self) -> Option<(u32, Duration)> {
        let mut strategy = self.strategy.lock().await;
        let strategy = strategy.as_mut()?;

        let attempt = self.attempts.load(Ordering::SeqCst);
        let delay = strategy.next_delay(attempt)?;

        let attempt = attempt + 1;
        self.attempts.store(attempt, Ordering::SeqCst);
        self.set_state(ConnectionState::Reconnecting { attempt });

        Some((attempt, delay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconnect::{ExponentialBackoff, FixedDelay};

    fn manager(strategy: Option<Box<dyn ReconnectionStrategy>>) -> ConnectionManager {
        ConnectionManager::new(strategy)
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let manager = manager(None);
        assert_eq!(manager.state(), ConnectionState::Disconnected);

        assert_eq!(manager.set_state(ConnectionState::Connecting), ConnectionState::Disconnected);
        assert_eq!(manager.state(), ConnectionState::Connecting);

        manager.opened().await;
        assert_eq!(manager.state(), ConnectionState::Open);

        assert_eq!(manager.set_state(ConnectionState::Closing), ConnectionState::Open);
        assert_eq!(manager.set_state(ConnectionState::Disconnected), ConnectionState::Closing);
    }

    #[tokio::test]
    async fn test_default_backoff_schedule() {
        let manager = manager(Some(Box::new(ExponentialBackoff::default())));

        let mut schedule = Vec::new();
        while let Some((attempt, delay)) = manager.next_reconnect_delay().await {
            assert_eq!(manager.state(), ConnectionState::Reconnecting { attempt });
            schedule.push(delay.as_secs());
        }

        assert_eq!(schedule, vec![1, 2, 4, 8, 10]);
        assert_eq!(manager.attempts(), 5);
    }

    #[tokio::test]
    async fn test_open_resets_attempts() {
        let manager = manager(Some(Box::new(FixedDelay::new(Duration::from_millis(5)).with_max_attempts(2))));

        assert!(manager.next_reconnect_delay().await.is_some());
        assert!(manager.next_reconnect_delay().await.is_some());
        assert!(manager.next_reconnect_delay().await.is_none());

        manager.opened().await;
        assert_eq!(manager.attempts(), 0);
        assert_eq!(manager.next_reconnect_delay().await.map(|(n, _)| n), Some(1));
    }

    #[tokio::test]
    async fn test_without_strategy() {
        let manager = manager(None);
        assert!(!manager.can_reconnect().await);
        assert!(manager.next_reconnect_delay().await.is_none());
        assert_eq!(manager.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_subscribe_sees_transitions() {
        let manager = manager(None);
        let mut rx = manager.subscribe();

        manager.opened().await;
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), ConnectionState::Open);
    }
}
