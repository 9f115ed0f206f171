//! Retry decision engine.
//!
//! Classifies a failed attempt and decides whether the call continues. The
//! engine is pure: state changes (credential refresh, budget shrink) are
//! returned as a [`RetryAction`] and applied by the caller's attempt loop.

use super::policy::RetryPolicy;
use crate::error::{LlmError, is_overload_message};
use crate::providers::anthropic::overflow::{adjusted_budget, parse_context_overflow};
use std::time::Duration;

/// Side effect to apply before the next attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    /// Resend the unchanged request.
    Resend,
    /// Re-resolve the credential, then resend.
    RefreshCredential,
    /// Store this `max_tokens` budget for the call, then rebuild and resend.
    ShrinkBudget(u32),
}

/// Outcome of classifying one failed attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision {
    Retry { delay: Duration, action: RetryAction },
    Fail(LlmError),
}

impl RetryDecision {
    pub const fn should_retry(&self) -> bool {
        matches!(self, Self::Retry { .. })
    }

    pub fn delay_millis(&self) -> u64 {
        match self {
            Self::Retry { delay, .. } => delay.as_millis() as u64,
            Self::Fail(_) => 0,
        }
    }

    pub const fn terminal_error(&self) -> Option<&LlmError> {
        match self {
            Self::Fail(err) => Some(err),
            Self::Retry { .. } => None,
        }
    }
}

/// Applies the retry rules in order:
/// 1. no provider status → fail unchanged;
/// 2. attempt above the ceiling → `MaxRetriesExceeded`;
/// 3. 401 → refresh credential, no delay;
/// 4. 400 context overflow → shrink budget, no delay;
/// 5. 429 / 529 / overload marker → exponential backoff or `Retry-After`;
/// 6. anything else → fail unchanged.
#[derive(Debug, Clone, Default)]
pub struct RetryEngine {
    policy: RetryPolicy,
}

impl RetryEngine {
    pub const fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Decide after the 1-based `attempt` failed with `error`.
    pub fn decide(&self, attempt: u32, error: LlmError) -> RetryDecision {
        let Some(status) = error.status() else {
            return RetryDecision::Fail(error);
        };

        if attempt > self.policy.max_retries {
            return RetryDecision::Fail(LlmError::MaxRetriesExceeded {
                max_retries: self.policy.max_retries,
                last: Box::new(error),
            });
        }

        if status == 401 {
            return RetryDecision::Retry {
                delay: Duration::ZERO,
                action: RetryAction::RefreshCredential,
            };
        }

        if status == 400
            && let Some((input_tokens, context_limit)) = overflow_numbers(&error)
        {
            let budget = adjusted_budget(
                input_tokens,
                context_limit,
                self.policy.context_margin,
                self.policy.min_output_tokens,
            );
            return RetryDecision::Retry {
                delay: Duration::ZERO,
                action: RetryAction::ShrinkBudget(budget),
            };
        }

        if status == 429 || status == 529 || is_overload_message(&error.message()) {
            let delay = error
                .retry_after()
                .unwrap_or_else(|| self.policy.calculate_delay(attempt));
            return RetryDecision::Retry {
                delay,
                action: RetryAction::Resend,
            };
        }

        RetryDecision::Fail(error)
    }
}

fn overflow_numbers(error: &LlmError) -> Option<(u64, u64)> {
    match error {
        LlmError::ContextOverflow {
            input_tokens,
            context_limit,
            ..
        } => Some((*input_tokens, *context_limit)),
        other => parse_context_overflow(&other.message()).map(|o| (o.input_tokens, o.context_limit)),
    }
}
