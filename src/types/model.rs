//! Model capability descriptor.

use serde::{Deserialize, Serialize};

/// Static facts about the target model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    /// Combined input + output token budget.
    #[serde(default)]
    pub context_window: u32,
    pub default_max_tokens: u32,
    /// Whether the model can emit a reasoning trace.
    #[serde(default)]
    pub can_reason: bool,
}

impl ModelInfo {
    pub fn new(id: impl Into<String>, default_max_tokens: u32) -> Self {
        Self {
            id: id.into(),
            context_window: 200_000,
            default_max_tokens,
            can_reason: false,
        }
    }

    pub const fn with_context_window(mut self, tokens: u32) -> Self {
        self.context_window = tokens;
        self
    }

    pub const fn with_reasoning(mut self, can_reason: bool) -> Self {
        self.can_reason = can_reason;
        self
    }
}
