//! Anthropic streaming implementation using eventsource-stream
//!
//! SSE payloads are decoded into [`StreamEvent`]s, and a [`StreamAssembler`]
//! turns them into canonical [`ProviderEvent`]s while accumulating the final
//! [`ProviderResponse`]. Content blocks are tracked by their `index`, so
//! interleaved text, tool and thinking blocks are reassembled correctly.

use super::errors::map_stream_error;
use super::transformers::usage_from_wire;
use super::types::{ApiErrorBody, WireUsage};
use crate::error::LlmError;
use crate::types::{FinishReason, ProviderEvent, ProviderResponse, ToolCall};
use eventsource_stream::Event;
use serde::Deserialize;
use std::collections::BTreeMap;

/// `message` object of a `message_start` event.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StreamMessage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub usage: WireUsage,
}

/// `content_block` object of a `content_block_start` event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StartBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
    },
    Thinking {
        #[serde(default)]
        thinking: String,
    },
    #[serde(other)]
    Other,
}

/// `delta` object of a `content_block_delta` event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockDelta {
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
    ThinkingDelta { thinking: String },
    SignatureDelta { signature: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MessageDeltaBody {
    #[serde(default)]
    pub stop_reason: Option<String>,
}

/// One decoded SSE payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    MessageStart {
        message: StreamMessage,
    },
    ContentBlockStart {
        index: usize,
        content_block: StartBlock,
    },
    ContentBlockDelta {
        index: usize,
        delta: BlockDelta,
    },
    ContentBlockStop {
        index: usize,
    },
    MessageDelta {
        #[serde(default)]
        delta: MessageDeltaBody,
        #[serde(default)]
        usage: Option<WireUsage>,
    },
    MessageStop,
    Ping,
    Error {
        error: ApiErrorBody,
    },
    #[serde(other)]
    Unknown,
}

/// Decode one SSE event. Keep-alives and `[DONE]` markers yield `None`.
pub fn decode_sse_event(event: &Event) -> Option<Result<StreamEvent, LlmError>> {
    let data = event.data.trim();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    tracing::trace!(event = %event.event, "Anthropic SSE event");
    Some(serde_json::from_str::<StreamEvent>(data).map_err(|e| {
        tracing::warn!(error = %e, raw = %data, "Failed to parse Anthropic SSE event");
        LlmError::MalformedResponse(format!("Failed to parse Anthropic event: {e}"))
    }))
}

#[derive(Debug)]
enum BlockState {
    Text(String),
    Tool { id: String, name: String, input: String },
    Thinking,
    Other,
}

/// Incremental assembler for one streamed response.
#[derive(Debug, Default)]
pub struct StreamAssembler {
    blocks: BTreeMap<usize, BlockState>,
    usage: WireUsage,
    stop_reason: Option<String>,
    completed: bool,
}

impl StreamAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the terminal `Complete` event has been produced.
    pub const fn is_complete(&self) -> bool {
        self.completed
    }

    /// Feed one event. An `error` event is returned as `Err` and leaves the
    /// assembler untouched; events after completion are ignored.
    pub fn push(&mut self, event: StreamEvent) -> Result<Vec<ProviderEvent>, LlmError> {
        if self.completed {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        match event {
            StreamEvent::MessageStart { message } => {
                tracing::debug!(id = ?message.id, model = ?message.model, "Anthropic stream started");
                merge_usage(&mut self.usage, &message.usage);
            }
            StreamEvent::ContentBlockStart {
                index,
                content_block,
            } => {
                let state = match content_block {
                    StartBlock::Text { text } => {
                        out.push(ProviderEvent::ContentStart);
                        if !text.is_empty() {
                            out.push(ProviderEvent::ContentDelta(text.clone()));
                        }
                        BlockState::Text(text)
                    }
                    StartBlock::ToolUse { id, name } => {
                        out.push(ProviderEvent::ToolUseStart(ToolCall {
                            id: id.clone(),
                            name: name.clone(),
                            input: String::new(),
                            finished: false,
                        }));
                        BlockState::Tool {
                            id,
                            name,
                            input: String::new(),
                        }
                    }
                    StartBlock::Thinking { thinking } => {
                        if !thinking.is_empty() {
                            out.push(ProviderEvent::ThinkingDelta(thinking));
                        }
                        BlockState::Thinking
                    }
                    StartBlock::Other => BlockState::Other,
                };
                self.blocks.insert(index, state);
            }
            StreamEvent::ContentBlockDelta { index, delta } => self.apply_delta(index, delta, &mut out),
            StreamEvent::ContentBlockStop { index } => match self.blocks.get(&index) {
                Some(BlockState::Text(_)) => out.push(ProviderEvent::ContentStop),
                Some(BlockState::Tool { id, .. }) => out.push(ProviderEvent::ToolUseStop { id: id.clone() }),
                _ => {}
            },
            StreamEvent::MessageDelta { delta, usage } => {
                if let Some(reason) = delta.stop_reason {
                    self.stop_reason = Some(reason);
                }
                if let Some(usage) = usage {
                    merge_usage(&mut self.usage, &usage);
                }
            }
            StreamEvent::MessageStop => {
                let response = self.response();
                self.completed = true;
                out.push(ProviderEvent::Complete(response));
            }
            StreamEvent::Error { error } => return Err(map_stream_error(error)),
            StreamEvent::Ping | StreamEvent::Unknown => {}
        }
        Ok(out)
    }

    fn apply_delta(&mut self, index: usize, delta: BlockDelta, out: &mut Vec<ProviderEvent>) {
        match delta {
            BlockDelta::TextDelta { text } => {
                if text.is_empty() {
                    return;
                }
                // Text may arrive without an explicit block start.
                let entry = self.blocks.entry(index).or_insert_with(|| {
                    out.push(ProviderEvent::ContentStart);
                    BlockState::Text(String::new())
                });
                if let BlockState::Text(buf) = entry {
                    buf.push_str(&text);
                    out.push(ProviderEvent::ContentDelta(text));
                }
            }
            BlockDelta::InputJsonDelta { partial_json } => {
                if partial_json.is_empty() {
                    return;
                }
                match self.blocks.get_mut(&index) {
                    Some(BlockState::Tool { id, input, .. }) => {
                        input.push_str(&partial_json);
                        out.push(ProviderEvent::ToolUseDelta {
                            id: id.clone(),
                            partial_json,
                        });
                    }
                    _ => tracing::warn!(index, "Tool input delta for unknown block"),
                }
            }
            BlockDelta::ThinkingDelta { thinking } => {
                if !thinking.is_empty() {
                    out.push(ProviderEvent::ThinkingDelta(thinking));
                }
            }
            BlockDelta::SignatureDelta { signature } => {
                if !signature.is_empty() {
                    out.push(ProviderEvent::SignatureDelta(signature));
                }
            }
            BlockDelta::Other => {}
        }
    }

    /// Called when the byte stream ends. Produces a `Complete` with whatever
    /// was accumulated if `message_stop` never arrived.
    pub fn finish(&mut self) -> Option<ProviderEvent> {
        if self.completed {
            return None;
        }
        tracing::debug!("Anthropic stream ended without message_stop");
        let response = self.response();
        self.completed = true;
        Some(ProviderEvent::Complete(response))
    }

    fn response(&self) -> ProviderResponse {
        let mut content = String::new();
        let mut tool_calls = Vec::new();
        for block in self.blocks.values() {
            match block {
                BlockState::Text(text) => content.push_str(text),
                BlockState::Tool { id, name, input } => {
                    let input = if input.is_empty() { "{}" } else { input.as_str() };
                    tool_calls.push(ToolCall::new(id.clone(), name.clone(), input));
                }
                BlockState::Thinking | BlockState::Other => {}
            }
        }
        let finish_reason = self
            .stop_reason
            .as_deref()
            .map(FinishReason::from_stop_reason)
            .unwrap_or_default();
        ProviderResponse {
            content,
            tool_calls,
            usage: usage_from_wire(&self.usage),
            finish_reason,
        }
    }
}

fn merge_usage(into: &mut WireUsage, from: &WireUsage) {
    if from.input_tokens.is_some() {
        into.input_tokens = from.input_tokens;
    }
    if from.output_tokens.is_some() {
        into.output_tokens = from.output_tokens;
    }
    if from.cache_creation_input_tokens.is_some() {
        into.cache_creation_input_tokens = from.cache_creation_input_tokens;
    }
    if from.cache_read_input_tokens.is_some() {
        into.cache_read_input_tokens = from.cache_read_input_tokens;
    }
}
