//! Translate Anthropic stream events into generic chat-completion chunks.
//!
//! The [`ChunkAssembler`] maps each provider event to exactly one chunk.
//! Chunks are independent and additive: text and tool-call argument
//! fragments must be merged by the consumer, for which
//! [`MessageAccumulator`] provides the documented merge contract.

use std::collections::BTreeMap;

use super::anthropic_types::{Delta, ResponseContentBlock, StreamEvent};
use super::chat_types::{
    ChatCompletionChunk, ChatResponse, ChatToolCall, ChatToolCallFunction, ChatUsage, Choice,
    ChoiceMessage, ChunkChoice, ChunkDelta, ChunkToolCall, ChunkToolCallFunction,
};
use super::response::map_stop_reason;

/// Stateless-per-event mapping from provider stream events to chat chunks.
///
/// The only retained state is the chunk envelope: the message id and model
/// adopted from `message_start`, and the creation timestamp. Content-block
/// indices pass through unchanged so a consumer can correlate fragments of
/// concurrently open blocks.
#[derive(Debug)]
pub struct ChunkAssembler {
    model: String,
    msg_id: String,
    created: u64,
}

impl ChunkAssembler {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            // Replaced by the provider's message id once message_start arrives.
            msg_id: format!("chatcmpl-{}", uuid::Uuid::new_v4().simple()),
            created: chrono::Utc::now().timestamp() as u64,
        }
    }

    /// Map one stream event to one chunk.
    pub fn process_event(&mut self, event: &StreamEvent) -> ChatCompletionChunk {
        match event {
            StreamEvent::MessageStart { message } => {
                self.msg_id = message.id.clone();
                self.model = message.model.clone();

                let finish_reason = message
                    .stop_reason
                    .as_deref()
                    .and_then(map_stop_reason);

                self.make_chunk(
                    vec![ChunkChoice {
                        index: 0,
                        delta: ChunkDelta {
                            role: Some("assistant".to_string()),
                            content: Some(String::new()),
                            tool_calls: None,
                        },
                        finish_reason,
                    }],
                    None,
                )
            }
            StreamEvent::MessageDelta { delta, usage } => {
                let finish_reason = delta.stop_reason.as_deref().and_then(map_stop_reason);

                // Input tokens are unknown at this layer; the provider only
                // reports output tokens on the delta.
                let usage = usage.as_ref().map(|u| ChatUsage {
                    prompt_tokens: 0,
                    completion_tokens: u.output_tokens,
                    total_tokens: u.output_tokens,
                });

                self.make_chunk(
                    vec![ChunkChoice {
                        index: 0,
                        delta: ChunkDelta::default(),
                        finish_reason,
                    }],
                    usage,
                )
            }
            StreamEvent::ContentBlockStart {
                index,
                content_block,
            } => match content_block {
                ResponseContentBlock::Text { text } => self.make_chunk(
                    vec![ChunkChoice {
                        index: *index as u64,
                        delta: ChunkDelta {
                            role: None,
                            content: Some(text.clone()),
                            tool_calls: None,
                        },
                        finish_reason: None,
                    }],
                    None,
                ),
                ResponseContentBlock::ToolUse { id, name, .. } => self.make_chunk(
                    vec![ChunkChoice {
                        index: *index as u64,
                        delta: ChunkDelta {
                            role: None,
                            content: None,
                            tool_calls: Some(vec![ChunkToolCall {
                                index: *index as u64,
                                id: Some(id.clone()),
                                call_type: Some("function".to_string()),
                                function: Some(ChunkToolCallFunction {
                                    name: Some(name.clone()),
                                    arguments: Some(String::new()),
                                }),
                            }]),
                        },
                        finish_reason: None,
                    }],
                    None,
                ),
            },
            StreamEvent::ContentBlockDelta { index, delta } => match delta {
                Delta::TextDelta { text } => self.make_chunk(
                    vec![ChunkChoice {
                        index: *index as u64,
                        delta: ChunkDelta {
                            role: None,
                            content: Some(text.clone()),
                            tool_calls: None,
                        },
                        finish_reason: None,
                    }],
                    None,
                ),
                // Id and name were already sent at block start; only the raw
                // argument fragment travels here.
                Delta::InputJsonDelta { partial_json } => self.make_chunk(
                    vec![ChunkChoice {
                        index: *index as u64,
                        delta: ChunkDelta {
                            role: None,
                            content: None,
                            tool_calls: Some(vec![ChunkToolCall {
                                index: *index as u64,
                                id: None,
                                call_type: None,
                                function: Some(ChunkToolCallFunction {
                                    name: None,
                                    arguments: Some(partial_json.clone()),
                                }),
                            }]),
                        },
                        finish_reason: None,
                    }],
                    None,
                ),
            },
            StreamEvent::ContentBlockStop { .. }
            | StreamEvent::MessageStop
            | StreamEvent::Ping => self.empty_chunk(),
        }
    }

    /// A no-op chunk: one choice at index 0 with an empty assistant delta.
    /// Also used for event types this vocabulary does not know.
    pub fn empty_chunk(&self) -> ChatCompletionChunk {
        self.make_chunk(
            vec![ChunkChoice {
                index: 0,
                delta: ChunkDelta::default(),
                finish_reason: None,
            }],
            None,
        )
    }

    fn make_chunk(
        &self,
        choices: Vec<ChunkChoice>,
        usage: Option<ChatUsage>,
    ) -> ChatCompletionChunk {
        ChatCompletionChunk {
            id: self.msg_id.clone(),
            object: "chat.completion.chunk".to_string(),
            created: self.created,
            model: self.model.clone(),
            choices,
            usage,
        }
    }
}

#[derive(Debug, Default, Clone)]
struct ToolCallParts {
    id: String,
    name: String,
    arguments: String,
}

/// Consumer-side accumulator that merges a chunk sequence back into one
/// complete message.
///
/// Merge contract: text content and tool-call argument fragments are
/// concatenated in arrival order; scalar fields (role, tool-call id and
/// name, finish reason, usage, envelope fields) are last-write-wins.
/// Tool calls are keyed by their chunk index, which the assembler keeps
/// stable across all fragments of the same call.
#[derive(Debug, Default)]
pub struct MessageAccumulator {
    id: String,
    model: String,
    created: u64,
    role: String,
    content: String,
    tool_calls: BTreeMap<u64, ToolCallParts>,
    finish_reason: Option<String>,
    usage: Option<ChatUsage>,
}

impl MessageAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &ChatCompletionChunk) {
        if !chunk.id.is_empty() {
            self.id = chunk.id.clone();
        }
        if !chunk.model.is_empty() {
            self.model = chunk.model.clone();
        }
        if chunk.created != 0 {
            self.created = chunk.created;
        }
        if let Some(ref usage) = chunk.usage {
            self.usage = Some(usage.clone());
        }

        for choice in &chunk.choices {
            if let Some(ref role) = choice.delta.role {
                self.role = role.clone();
            }
            if let Some(ref content) = choice.delta.content {
                self.content.push_str(content);
            }
            if let Some(ref tool_calls) = choice.delta.tool_calls {
                for tc in tool_calls {
                    let parts = self.tool_calls.entry(tc.index).or_default();
                    if let Some(ref id) = tc.id {
                        parts.id = id.clone();
                    }
                    if let Some(ref func) = tc.function {
                        if let Some(ref name) = func.name {
                            parts.name = name.clone();
                        }
                        if let Some(ref args) = func.arguments {
                            parts.arguments.push_str(args);
                        }
                    }
                }
            }
            if let Some(ref reason) = choice.finish_reason {
                self.finish_reason = Some(reason.clone());
            }
        }
    }

    pub fn into_response(self) -> ChatResponse {
        let tool_calls: Vec<ChatToolCall> = self
            .tool_calls
            .into_values()
            .map(|parts| ChatToolCall {
                id: parts.id,
                call_type: "function".to_string(),
                function: ChatToolCallFunction {
                    name: parts.name,
                    arguments: parts.arguments,
                },
            })
            .collect();

        ChatResponse {
            id: self.id,
            object: "chat.completion".to_string(),
            created: self.created,
            model: self.model,
            choices: vec![Choice {
                index: 0,
                message: ChoiceMessage {
                    role: if self.role.is_empty() {
                        "assistant".to_string()
                    } else {
                        self.role
                    },
                    content: if self.content.is_empty() {
                        None
                    } else {
                        Some(self.content)
                    },
                    tool_calls: if tool_calls.is_empty() {
                        None
                    } else {
                        Some(tool_calls)
                    },
                },
                finish_reason: self.finish_reason,
            }],
            usage: self.usage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::anthropic_types::{
        DeltaUsage, MessageDeltaBody, MessagesResponse, Usage,
    };

    fn message_start(id: &str, model: &str) -> StreamEvent {
        StreamEvent::MessageStart {
            message: MessagesResponse {
                id: id.to_string(),
                response_type: "message".to_string(),
                role: "assistant".to_string(),
                content: Vec::new(),
                model: model.to_string(),
                stop_reason: None,
                stop_sequence: None,
                usage: Usage::default(),
            },
        }
    }

    #[test]
    fn test_message_start_chunk() {
        let mut assembler = ChunkAssembler::new("requested-model");
        let chunk = assembler.process_event(&message_start("msg_01", "claude-3-5-haiku"));

        assert_eq!(chunk.id, "msg_01");
        assert_eq!(chunk.model, "claude-3-5-haiku");
        assert_eq!(chunk.object, "chat.completion.chunk");
        assert_eq!(chunk.choices.len(), 1);

        let choice = &chunk.choices[0];
        assert_eq!(choice.index, 0);
        assert_eq!(choice.delta.role.as_deref(), Some("assistant"));
        assert_eq!(choice.delta.content.as_deref(), Some(""));
        assert!(choice.finish_reason.is_none());
    }

    #[test]
    fn test_message_start_then_stop_yields_noop_second_chunk() {
        let mut assembler = ChunkAssembler::new("m");

        let first = assembler.process_event(&message_start("msg_01", "m"));
        assert_eq!(first.choices[0].delta.role.as_deref(), Some("assistant"));
        assert!(first.choices[0].finish_reason.is_none());

        let second = assembler.process_event(&StreamEvent::MessageStop);
        assert_eq!(second.id, "msg_01");
        assert_eq!(second.choices.len(), 1);
        assert!(second.choices[0].delta.role.is_none());
        assert!(second.choices[0].delta.content.is_none());
        assert!(second.choices[0].delta.tool_calls.is_none());
        assert!(second.choices[0].finish_reason.is_none());
    }

    #[test]
    fn test_text_block_chunks_track_index() {
        let mut assembler = ChunkAssembler::new("m");
        let _ = assembler.process_event(&message_start("msg_01", "m"));

        let start = assembler.process_event(&StreamEvent::ContentBlockStart {
            index: 0,
            content_block: ResponseContentBlock::Text {
                text: "Hel".to_string(),
            },
        });
        assert_eq!(start.choices[0].index, 0);
        assert_eq!(start.choices[0].delta.content.as_deref(), Some("Hel"));

        let delta = assembler.process_event(&StreamEvent::ContentBlockDelta {
            index: 0,
            delta: Delta::TextDelta {
                text: "lo".to_string(),
            },
        });
        assert_eq!(delta.choices[0].delta.content.as_deref(), Some("lo"));
        assert!(delta.choices[0].finish_reason.is_none());
    }

    #[test]
    fn test_tool_use_block_chunks() {
        let mut assembler = ChunkAssembler::new("m");
        let _ = assembler.process_event(&message_start("msg_01", "m"));

        let start = assembler.process_event(&StreamEvent::ContentBlockStart {
            index: 1,
            content_block: ResponseContentBlock::ToolUse {
                id: "toolu_1".to_string(),
                name: "get_weather".to_string(),
                input: serde_json::json!({}),
            },
        });

        let choice = &start.choices[0];
        assert_eq!(choice.index, 1);
        let calls = choice.delta.tool_calls.as_ref().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].index, 1);
        assert_eq!(calls[0].id.as_deref(), Some("toolu_1"));
        assert_eq!(calls[0].call_type.as_deref(), Some("function"));
        let func = calls[0].function.as_ref().unwrap();
        assert_eq!(func.name.as_deref(), Some("get_weather"));
        assert_eq!(func.arguments.as_deref(), Some(""));

        let frag = assembler.process_event(&StreamEvent::ContentBlockDelta {
            index: 1,
            delta: Delta::InputJsonDelta {
                partial_json: "{\"city\":".to_string(),
            },
        });
        let calls = frag.choices[0].delta.tool_calls.as_ref().unwrap();
        assert!(calls[0].id.is_none());
        let func = calls[0].function.as_ref().unwrap();
        assert!(func.name.is_none());
        assert_eq!(func.arguments.as_deref(), Some("{\"city\":"));
    }

    #[test]
    fn test_message_delta_carries_finish_and_usage() {
        let mut assembler = ChunkAssembler::new("m");
        let _ = assembler.process_event(&message_start("msg_01", "m"));

        let chunk = assembler.process_event(&StreamEvent::MessageDelta {
            delta: MessageDeltaBody {
                stop_reason: Some("tool_use".to_string()),
                stop_sequence: None,
            },
            usage: Some(DeltaUsage { output_tokens: 42 }),
        });

        assert_eq!(chunk.choices[0].finish_reason.as_deref(), Some("tool_calls"));
        let usage = chunk.usage.unwrap();
        assert_eq!(usage.prompt_tokens, 0);
        assert_eq!(usage.completion_tokens, 42);
        assert_eq!(usage.total_tokens, 42);
    }

    #[test]
    fn test_unknown_stop_reason_maps_to_none() {
        let mut assembler = ChunkAssembler::new("m");
        let chunk = assembler.process_event(&StreamEvent::MessageDelta {
            delta: MessageDeltaBody {
                stop_reason: Some("refusal".to_string()),
                stop_sequence: None,
            },
            usage: None,
        });
        assert!(chunk.choices[0].finish_reason.is_none());
        assert!(chunk.usage.is_none());
    }

    #[test]
    fn test_fallback_id_before_message_start() {
        let mut assembler = ChunkAssembler::new("m");
        let chunk = assembler.process_event(&StreamEvent::Ping);
        assert!(chunk.id.starts_with("chatcmpl-"));
    }

    #[test]
    fn test_accumulator_merges_full_stream() {
        let mut assembler = ChunkAssembler::new("m");
        let mut acc = MessageAccumulator::new();

        let events = vec![
            message_start("msg_01", "claude-3-5-sonnet"),
            StreamEvent::Ping,
            StreamEvent::ContentBlockStart {
                index: 0,
                content_block: ResponseContentBlock::Text {
                    text: String::new(),
                },
            },
            StreamEvent::ContentBlockDelta {
                index: 0,
                delta: Delta::TextDelta {
                    text: "Checking ".to_string(),
                },
            },
            StreamEvent::ContentBlockDelta {
                index: 0,
                delta: Delta::TextDelta {
                    text: "the weather.".to_string(),
                },
            },
            StreamEvent::ContentBlockStop { index: 0 },
            StreamEvent::ContentBlockStart {
                index: 1,
                content_block: ResponseContentBlock::ToolUse {
                    id: "toolu_1".to_string(),
                    name: "get_weather".to_string(),
                    input: serde_json::json!({}),
                },
            },
            StreamEvent::ContentBlockDelta {
                index: 1,
                delta: Delta::InputJsonDelta {
                    partial_json: "{\"city\":".to_string(),
                },
            },
            StreamEvent::ContentBlockDelta {
                index: 1,
                delta: Delta::InputJsonDelta {
                    partial_json: "\"London\"}".to_string(),
                },
            },
            StreamEvent::ContentBlockStop { index: 1 },
            StreamEvent::MessageDelta {
                delta: MessageDeltaBody {
                    stop_reason: Some("tool_use".to_string()),
                    stop_sequence: None,
                },
                usage: Some(DeltaUsage { output_tokens: 17 }),
            },
            StreamEvent::MessageStop,
        ];

        for event in &events {
            acc.push(&assembler.process_event(event));
        }

        let response = acc.into_response();
        assert_eq!(response.id, "msg_01");
        assert_eq!(response.model, "claude-3-5-sonnet");

        let choice = &response.choices[0];
        assert_eq!(choice.message.role, "assistant");
        assert_eq!(
            choice.message.content.as_deref(),
            Some("Checking the weather.")
        );
        assert_eq!(choice.finish_reason.as_deref(), Some("tool_calls"));

        let calls = choice.message.tool_calls.as_ref().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "toolu_1");
        assert_eq!(calls[0].function.name, "get_weather");
        assert_eq!(calls[0].function.arguments, "{\"city\":\"London\"}");

        assert_eq!(response.usage.unwrap().completion_tokens, 17);
    }
}
