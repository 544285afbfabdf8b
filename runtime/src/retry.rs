//! Retrying reviews that lost an optimistic-concurrency race.
//!
//! When a venue write is rejected because another writer bumped its version,
//! the whole review is replayed from a fresh read. Replays are spaced out with
//! capped exponential backoff and an optional random jitter so that competing
//! writers do not collide again in lockstep.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use venue_booking_core::BookingError;

use crate::metrics::BookingMetrics;

/// Backoff settings for conflict replays.
///
/// # Default Values
///
/// - `max_retries`: 3
/// - `initial_delay`: 20ms
/// - `max_delay`: 500ms
/// - `multiplier`: 2.0
/// - `jitter`: enabled
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Replays after the first attempt; `0` disables retrying.
    pub max_retries: usize,
    /// Delay before the first replay.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Growth factor between consecutive delays.
    pub multiplier: f64,
    /// Scale each delay by a random factor in `[0.5, 1.0]`.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(20),
            max_delay: Duration::from_millis(500),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that never replays.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Set the number of replays.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the first delay.
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Disable jitter, making delays deterministic.
    #[must_use]
    pub const fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Delay before replay number `attempt` (0-based), before jitter.
    ///
    /// `initial_delay * multiplier^attempt`, capped at `max_delay`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)] // Attempts stay tiny
        let exponent = attempt.min(32) as i32;
        #[allow(clippy::cast_precision_loss)] // Delays are far below 2^52 ns
        let (initial, cap) = (
            self.initial_delay.as_nanos() as f64,
            self.max_delay.as_nanos() as f64,
        );
        let nanos = (initial * self.multiplier.powi(exponent)).clamp(0.0, cap);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // Clamped above
        let nanos = nanos as u64;
        Duration::from_nanos(nanos)
    }

    fn jittered(&self, attempt: usize) -> Duration {
        let delay = self.delay_for_attempt(attempt);
        if self.jitter {
            delay.mul_f64(rand::thread_rng().gen_range(0.5..=1.0))
        } else {
            delay
        }
    }
}

/// Run `operation` until it succeeds, fails for a non-conflict reason, or
/// the policy's replays are used up.
///
/// # Errors
///
/// Returns the last error from `operation`. Only
/// [`BookingError::Conflict`] and [`BookingError::StaleBooking`] are retried.
pub async fn retry_on_conflict<F, Fut, T>(policy: &RetryPolicy, mut operation: F) -> Result<T, BookingError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BookingError>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::debug!(attempt, "Review succeeded after conflict replay");
                }
                return Ok(value);
            }
            Err(err) if err.is_retryable() && attempt < policy.max_retries => {
                let delay = policy.jittered(attempt);
                tracing::warn!(
                    attempt,
                    delay_ms = delay.as_millis(),
                    error = %err,
                    "Review target changed concurrently, replaying"
                );
                BookingMetrics::record_conflict_retry();
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                if err.is_retryable() {
                    tracing::error!(attempt, error = %err, "Giving up after repeated conflicts");
                }
                return Err(err);
            }
        }
    }
}
