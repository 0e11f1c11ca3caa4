//! Reconnection strategies
//!
//! When the transport drops while the client has not been closed, the
//! connection driver asks its strategy how long to wait before the next
//! attempt, or whether to give up.
//!
//! # Built-in Strategies
//!
//! - **ExponentialBackoff**: 1 s doubling up to 10 s, five attempts (default)
//! - **FixedDelay**: constant delay between attempts
//! - **NoReconnect**: give up immediately
//!
//! Implement [`ReconnectionStrategy`] for anything else.
//!
//! # Examples
//!
//! ```rust
//! use parley_client::{ExponentialBackoff, ReconnectionStrategy};
//! use std::time::Duration;
//!
//! let mut backoff = ExponentialBackoff::default();
//! let delays: Vec<_> = (0..6).map(|n| backoff.next_delay(n)).collect();
//! assert_eq!(
//!     delays,
//!     vec![
//!         Some(Duration::from_secs(1)),
//!         Some(Duration::from_secs(2)),
//!         Some(Duration::from_secs(4)),
//!         Some(Duration::from_secs(8)),
//!         Some(Duration::from_secs(10)),
//!         None,
//!     ]
//! );
//! ```

use std::time::Duration;

/// Decides the delay before each reconnection attempt
///
/// `attempt` is zero-based and counts consecutive failures since the last
/// successful connection. `reset()` is called once a connection opens.
pub trait ReconnectionStrategy: Send + Sync {
    /// Delay before attempt number `attempt`, or `None` to give up
    fn next_delay(&mut self, attempt: u32) -> Option<Duration>;

    /// Forget accumulated state after a successful connection
    fn reset(&mut self);
}

/// Exponential backoff with an upper bound and optional jitter
pub struct ExponentialBackoff {
    min_delay: Duration,
    max_delay: Duration,
    max_attempts: Option<u32>,
    jitter: bool,
    current_attempt: u32,
}

impl ExponentialBackoff {
    /// Backoff starting at `min_delay`, doubling, capped at `max_delay`
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            min_delay,
            max_delay,
            max_attempts: None,
            jitter: false,
            current_attempt: 0,
        }
    }

    /// Give up after this many attempts
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Add up to 25% random jitter to every delay
    pub fn with_jitter(mut self) -> Self {
        self.jitter = true;
        self
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(10)).with_max_attempts(5)
    }
}

impl ReconnectionStrategy for ExponentialBackoff {
    fn next_delay(&mut self, attempt: u32) -> Option<Duration> {
        self.current_attempt = attempt;

        if let Some(max) = self.max_attempts {
            if attempt >= max {
                return None;
            }
        }

        // min_delay * 2^attempt, saturating so large attempt numbers stay at the cap
        let factor = 2u64.checked_pow(attempt).unwrap_or(u64::MAX);
        let base_delay = (self.min_delay.as_millis() as u64).saturating_mul(factor);
        let delay = std::cmp::min(base_delay, self.max_delay.as_millis() as u64);

        let mut final_delay = Duration::from_millis(delay);

        if self.jitter {
            use rand::Rng;
            let jitter_ms = rand::thread_rng().gen_range(0..=(delay / 4));
            final_delay = Duration::from_millis(delay + jitter_ms);
        }

        Some(final_delay)
    }

    fn reset(&mut self) {
        self.current_attempt = 0;
    }
}

/// Constant delay between attempts
pub struct FixedDelay {
    delay: Duration,
    max_attempts: Option<u32>,
}

impl FixedDelay {
    /// Wait `delay` before every attempt
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
        }
    }

    /// Give up after this many attempts
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

impl ReconnectionStrategy for FixedDelay {
    fn next_delay(&mut self, attempt: u32) -> Option<Duration> {
        if let Some(max) = self.max_attempts {
            if attempt >= max {
                return None;
            }
        }
        Some(self.delay)
    }

    fn reset(&mut self) {}
}

/// Never reconnect
pub struct NoReconnect;

impl ReconnectionStrategy for NoReconnect {
    fn next_delay(&mut self, _attempt: u32) -> Option<Duration> {
        None
    }

    fn reset(&mut self) {}
}
