//! Context-overflow adapter.
//!
//! Parses the provider's "prompt plus max_tokens exceeds the context window"
//! rejection and derives a smaller output budget for the next attempt.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref CONTEXT_LIMIT_RE: Regex = Regex::new(
        r"input length and `?max_tokens`? exceed context limit: (\d+) \+ (\d+) > (\d+)"
    )
    .expect("context limit pattern is valid");
}

/// The three numbers of an overflow rejection: `input + max_tokens > limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextOverflow {
    pub input_tokens: u64,
    pub max_tokens: u64,
    pub context_limit: u64,
}

/// Extract the overflow numbers from a provider message, if it is one.
pub fn parse_context_overflow(message: &str) -> Option<ContextOverflow> {
    let caps = CONTEXT_LIMIT_RE.captures(message)?;
    Some(ContextOverflow {
        input_tokens: caps[1].parse().ok()?,
        max_tokens: caps[2].parse().ok()?,
        context_limit: caps[3].parse().ok()?,
    })
}

/// `max(limit − input − margin, floor)`, computed without underflow. The
/// result is never 0, which would read as "no adjustment".
pub fn adjusted_budget(input_tokens: u64, context_limit: u64, margin: u32, floor: u32) -> u32 {
    let floor = floor.max(1);
    let raw = context_limit as i128 - input_tokens as i128 - i128::from(margin);
    raw.clamp(i128::from(floor), i128::from(u32::MAX)) as u32
}
