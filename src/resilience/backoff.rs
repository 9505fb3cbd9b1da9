//! Exponential reconnect backoff with jitter, driven by
//! [`ResolutionOptions`](crate::resolver::ResolutionOptions).

use std::time::Duration;
use rand::Rng;

/// Delay before reconnect attempt `attempt` (1-based).
///
/// Starts at `initial`, doubles per attempt, adds up to 10% jitter and never
/// exceeds `max` when one is set.
pub fn reconnect_delay(attempt: u32, initial: Duration, max: Option<Duration>) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let base_ms = u64::try_from(initial.as_millis()).unwrap_or(u64::MAX);
    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);

    // Apply jitter (0 to 10% of the delay)
    let jitter_range = delay_ms / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    let delay = Duration::from_millis(delay_ms.saturating_add(jitter));
    match max {
        Some(max) => delay.min(max),
        None => delay,
    }
}

/// Attempt counter producing successive [`reconnect_delay`]s.
#[derive(Debug, Clone)]
pub struct Backoff {
    attempt: u32,
    initial: Duration,
    max: Option<Duration>,
}

impl Backoff {
    pub fn new(initial: Duration, max: Option<Duration>) -> Self {
        Self {
            attempt: 0,
            initial,
            max,
        }
    }

    /// Delay before the next attempt.
    pub fn next_delay(&mut self) -> Duration {
        self.attempt = self.attempt.saturating_add(1);
        reconnect_delay(self.attempt, self.initial, self.max)
    }

    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
