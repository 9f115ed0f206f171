//! Anthropic Utility Functions
//!
//! Conversion of generic conversation history and tool schema into Messages
//! API content blocks.

use super::types::*;
use crate::types::{ConversationMessage, MessageRole, ToolDefinition};
use base64::Engine;

/// Messages (counted from the end) whose text blocks get a cache marker.
const CACHED_TAIL: usize = 2;

/// Convert messages to Anthropic format.
///
/// Returns system blocks taken from `System` messages and the wire messages.
/// Text blocks of the last two messages are cache-marked unless
/// `disable_cache` is set.
pub fn convert_messages(
    messages: &[ConversationMessage],
    disable_cache: bool,
) -> (Vec<SystemBlock>, Vec<WireMessage>) {
    let mut system = Vec::new();
    let mut wire = Vec::with_capacity(messages.len());
    let tail_start = messages.len().saturating_sub(CACHED_TAIL);

    for (i, message) in messages.iter().enumerate() {
        let cache = !disable_cache && i >= tail_start;
        match message.role {
            MessageRole::System => {
                let text = message.text();
                if !text.is_empty() {
                    system.push(SystemBlock::new(text));
                }
            }
            MessageRole::User => {
                let text = message.text();
                let mut blocks = Vec::new();
                if !text.is_empty() || message.images().next().is_none() {
                    blocks.push(cached_text(text, cache));
                }
                for (media_type, data) in message.images() {
                    blocks.push(WireContentBlock::Image {
                        source: ImageSource {
                            r#type: "base64".to_string(),
                            media_type: media_type.to_string(),
                            data: base64::engine::general_purpose::STANDARD.encode(data),
                        },
                    });
                }
                wire.push(WireMessage {
                    role: "user".to_string(),
                    content: blocks,
                });
            }
            MessageRole::Assistant => {
                let blocks = convert_assistant(message, cache);
                if !blocks.is_empty() {
                    wire.push(WireMessage {
                        role: "assistant".to_string(),
                        content: blocks,
                    });
                }
            }
            MessageRole::Tool => {
                let results: Vec<_> = message
                    .tool_results_iter()
                    .map(|r| WireContentBlock::ToolResult {
                        tool_use_id: r.tool_call_id.clone(),
                        content: r.content.clone(),
                        is_error: r.is_error,
                    })
                    .collect();
                if !results.is_empty() {
                    wire.push(WireMessage {
                        role: "user".to_string(),
                        content: results,
                    });
                }
            }
        }
    }

    (system, wire)
}

fn cached_text(text: String, cache: bool) -> WireContentBlock {
    WireContentBlock::Text {
        text,
        cache_control: cache.then(CacheControl::ephemeral),
    }
}

fn convert_assistant(message: &ConversationMessage, cache: bool) -> Vec<WireContentBlock> {
    let mut blocks = Vec::new();

    // Reasoning must precede text and tool use when thinking is combined with tools.
    for (thinking, signature) in message.reasoning() {
        if !thinking.is_empty() {
            blocks.push(WireContentBlock::Thinking {
                thinking: thinking.to_string(),
                signature: signature.to_string(),
            });
        }
    }

    let text = message.text();
    if !text.is_empty() {
        blocks.push(cached_text(text, cache));
    }

    for call in message.tool_calls() {
        match serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(&call.input) {
            Ok(input) => blocks.push(WireContentBlock::ToolUse {
                id: call.id.clone(),
                name: call.name.clone(),
                input: serde_json::Value::Object(input),
            }),
            Err(e) => {
                tracing::warn!(tool_call_id = %call.id, error = %e, "Skipping tool call with invalid JSON input");
            }
        }
    }

    blocks
}

/// Convert tool definitions; the last one is cache-marked unless caching is disabled.
pub fn convert_tools(tools: &[ToolDefinition], disable_cache: bool) -> Vec<WireTool> {
    let last = tools.len().saturating_sub(1);
    tools
        .iter()
        .enumerate()
        .map(|(i, tool)| WireTool {
            name: tool.name.clone(),
            description: tool.description.clone(),
            input_schema: InputSchema {
                r#type: "object".to_string(),
                properties: if tool.properties.is_null() {
                    serde_json::json!({})
                } else {
                    tool.properties.clone()
                },
                required: tool.required.clone(),
            },
            cache_control: (i == last && !disable_cache).then(CacheControl::ephemeral),
        })
        .collect()
}
