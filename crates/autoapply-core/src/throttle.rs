//! Randomised pacing between submissions.
//!
//! The pipeline sleeps for a duration drawn uniformly from
//! `[min_delay, max_delay]` between postings so the request cadence toward
//! the upstream site stays irregular and slow.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use autoapply_core::throttle::{Throttle, ThrottleConfig};
//!
//! # async fn run() {
//! let throttle = Throttle::new(ThrottleConfig::new(
//!     Duration::from_millis(500),
//!     Duration::from_millis(4000),
//! ));
//! throttle.pause().await;
//! # }
//! ```

use std::time::Duration;

use crate::config::SessionConfig;

/// Bounds of the inter-posting delay window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleConfig {
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl ThrottleConfig {
    /// Create a window; bounds given in the wrong order are swapped.
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        if min_delay <= max_delay {
            Self {
                min_delay,
                max_delay,
            }
        } else {
            Self {
                min_delay: max_delay,
                max_delay: min_delay,
            }
        }
    }

    /// No delay at all; used by tests and one-shot runs.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn from_session(config: &SessionConfig) -> Self {
        Self::new(config.min_delay, config.max_delay)
    }

    /// Draw one delay uniformly from `[min_delay, max_delay]`.
    pub fn next_delay(&self) -> Duration {
        let span_ms = (self.max_delay - self.min_delay).as_millis() as u64;
        if span_ms == 0 {
            return self.min_delay;
        }
        self.min_delay + Duration::from_millis(rand_below(span_ms.saturating_add(1)))
    }
}

impl Default for ThrottleConfig {
    /// 500ms to 4s, the same window as the configuration defaults.
    fn default() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_millis(4_000))
    }
}

/// Sleeps between postings according to a [`ThrottleConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Throttle {
    config: ThrottleConfig,
}

impl Throttle {
    pub fn new(config: ThrottleConfig) -> Self {
        Self { config }
    }

    /// Sleep for one randomly drawn delay and return how long it was.
    pub async fn pause(&self) -> Duration {
        let delay = self.config.next_delay();
        if !delay.is_zero() {
            tracing::debug!(delay_ms = %delay.as_millis(), "Throttling before next posting");
            tokio::time::sleep(delay).await;
        }
        delay
    }
}

// ---------------------------------------------------------------------------
// Jitter based on std, seeded from the clock; not for cryptographic use.
// ---------------------------------------------------------------------------

fn rand_below(bound: u64) -> u64 {
    if bound <= 1 {
        return 0;
    }
    let mut x = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
        | 1;
    // xorshift64
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    x % bound
}
