//! Streaming Event Types
//!
//! Canonical events delivered to the caller of a streaming call.

use super::response::ProviderResponse;
use super::tools::ToolCall;
use crate::error::LlmError;

/// One semantic occurrence in a streamed response.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    ContentStart,
    ContentDelta(String),
    ContentStop,
    /// A tool invocation began; `finished` is false.
    ToolUseStart(ToolCall),
    /// Partial JSON arguments for the tool call `id`.
    ToolUseDelta { id: String, partial_json: String },
    ToolUseStop { id: String },
    ThinkingDelta(String),
    SignatureDelta(String),
    /// Terminal: the assembled response.
    Complete(ProviderResponse),
    /// Terminal: the call failed.
    Error(LlmError),
}

impl ProviderEvent {
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete(_) | Self::Error(_))
    }
}
