//! Retry policy configuration.
//!
//! Ceiling, backoff and budget-shrink constants are injected rather than
//! hard-coded so tests can run with millisecond delays.

use rand::Rng;
use std::time::Duration;

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt; attempt `max_retries + 1` is the last.
    pub max_retries: u32,
    /// Delay before the first rate-limit retry.
    pub initial_delay: Duration,
    /// Backoff multiplier (for exponential backoff)
    pub backoff_multiplier: f64,
    /// Upper bound of the additive jitter, as a fraction of the delay (0.0 to 1.0)
    pub jitter_factor: f64,
    /// Tokens kept free below the context limit when shrinking `max_tokens`.
    pub context_margin: u32,
    /// Floor for a shrunk `max_tokens`.
    pub min_output_tokens: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 6,
            initial_delay: Duration::from_millis(2000),
            backoff_multiplier: 2.0,
            jitter_factor: 0.2,
            context_margin: 1000,
            min_output_tokens: 1000,
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set initial delay
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set backoff multiplier
    pub const fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Set jitter factor; `0.0` makes delays deterministic.
    pub const fn with_jitter_factor(mut self, factor: f64) -> Self {
        self.jitter_factor = factor.clamp(0.0, 1.0);
        self
    }

    pub const fn with_context_margin(mut self, margin: u32) -> Self {
        self.context_margin = margin;
        self
    }

    /// Smallest output budget an overflow retry may shrink to; at least 1.
    pub const fn with_min_output_tokens(mut self, floor: u32) -> Self {
        self.min_output_tokens = if floor == 0 { 1 } else { floor };
        self
    }

    /// Backoff for a 1-based attempt: `initial × multiplier^(attempt−1) × (1 + U[0, jitter))`.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let base_ms =
            self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        Duration::from_millis(self.add_jitter(base_ms) as u64)
    }

    fn add_jitter(&self, delay_ms: f64) -> f64 {
        if self.jitter_factor <= 0.0 {
            return delay_ms;
        }
        let mut rng = rand::thread_rng();
        delay_ms * (1.0 + rng.gen_range(0.0..self.jitter_factor))
    }
}
