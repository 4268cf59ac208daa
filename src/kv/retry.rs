//! Retry policy: computed but not executed against the abstract callback contract
//! (the host cannot sleep). Carried through for logging, and honoured by the
//! concrete redis-backed client's own internal reconnect loop.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
    pub jitter_enabled: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(2),
            backoff_factor: 2.0,
            jitter_enabled: true,
        }
    }
}

impl RetryPolicy {
    /// Geometric backoff, clamped at `max_delay`, with deterministic jitter in
    /// `[0.5, 0.9]` of the computed delay derived from `attempt` (0-indexed).
    ///
    /// Jitter is deterministic (a function of `attempt`, not wall-clock random) so the
    /// same attempt index always yields the same delay, which keeps this testable
    /// without faking time.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let raw_ms = self.initial_delay.as_secs_f64()
            * self.backoff_factor.powi(attempt as i32)
            * 1000.0;
        let clamped_ms = raw_ms.min(self.max_delay.as_secs_f64() * 1000.0);
        let factor = if self.jitter_enabled {
            0.5 + 0.4 * deterministic_unit_fraction(attempt)
        } else {
            1.0
        };
        Duration::from_secs_f64((clamped_ms * factor).max(0.0) / 1000.0)
    }
}

/// Deterministic pseudo-fraction in `[0.0, 1.0)` derived from the attempt index, used
/// in place of real randomness so jitter stays reproducible in tests.
fn deterministic_unit_fraction(attempt: u32) -> f64 {
    let seed = attempt.wrapping_mul(2654435761).wrapping_add(1);
    (seed % 1000) as f64 / 1000.0
}
