//! Translate completed Anthropic Messages responses into generic chat responses.

use super::anthropic_types::{MessagesResponse, ResponseContentBlock, Usage};
use super::chat_types::{
    ChatResponse, ChatToolCall, ChatToolCallFunction, ChatUsage, Choice, ChoiceMessage,
};

/// Translate a completed provider response into a single-choice chat response.
///
/// Only a leading text block becomes the message's top-level `content`; any
/// later text block is dropped rather than merged. Every `tool_use` block
/// becomes one `tool_calls` entry, in content order.
pub fn to_chat_response(resp: &MessagesResponse) -> ChatResponse {
    let first_is_text = matches!(resp.content.first(), Some(ResponseContentBlock::Text { .. }));

    let content = match resp.content.first() {
        Some(ResponseContentBlock::Text { text }) => Some(text.clone()),
        _ => None,
    };

    let rest = if first_is_text {
        &resp.content[1..]
    } else {
        &resp.content[..]
    };

    let mut tool_calls: Vec<ChatToolCall> = Vec::new();
    for block in rest {
        if let ResponseContentBlock::ToolUse { id, name, input } = block {
            tool_calls.push(ChatToolCall {
                id: id.clone(),
                call_type: "function".to_string(),
                function: ChatToolCallFunction {
                    name: name.clone(),
                    arguments: input_to_arguments(input),
                },
            });
        }
    }

    let finish_reason = if tool_calls.is_empty() {
        "stop".to_string()
    } else {
        "tool_calls".to_string()
    };

    let tool_calls = if tool_calls.is_empty() {
        None
    } else {
        Some(tool_calls)
    };

    ChatResponse {
        id: resp.id.clone(),
        object: "chat.completion".to_string(),
        created: chrono::Utc::now().timestamp() as u64,
        model: resp.model.clone(),
        choices: vec![Choice {
            index: 0,
            message: ChoiceMessage {
                role: "assistant".to_string(),
                content,
                tool_calls,
            },
            finish_reason: Some(finish_reason),
        }],
        usage: Some(to_chat_usage(&resp.usage)),
    }
}

/// The provider reports input and output tokens separately and no total.
pub fn to_chat_usage(usage: &Usage) -> ChatUsage {
    ChatUsage {
        prompt_tokens: usage.input_tokens,
        completion_tokens: usage.output_tokens,
        total_tokens: usage.input_tokens + usage.output_tokens,
    }
}

/// Render a `tool_use` input as the generic opaque argument string. A string
/// input passes through untouched; anything else is serialized to JSON text.
fn input_to_arguments(input: &serde_json::Value) -> String {
    match input {
        serde_json::Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// Map a provider stop reason onto the generic finish-reason vocabulary.
/// Unknown reasons map to `None`.
pub fn map_stop_reason(reason: &str) -> Option<String> {
    match reason {
        "end_turn" | "stop_sequence" => Some("stop".to_string()),
        "max_tokens" => Some("length".to_string()),
        "tool_use" => Some("tool_calls".to_string()),
        _ => None,
    }
}
