//! Translate generic chat-completion requests into Anthropic Messages API requests.
//!
//! Handles system-prompt extraction, tool results, prior assistant tool calls,
//! and tool/tool-choice schema mapping. System-role messages have no provider
//! equivalent in the message list and are concatenated into the request-level
//! `system` field.

use super::anthropic_types::{
    ContentBlock, Message, MessageContent, MessagesRequest, Role, Tool, ToolChoice,
};
use super::chat_types::{ChatMessage, ChatRequest, ChatTool, ChatToolChoice, StopSequences};

/// Translate a generic chat request into an Anthropic Messages request.
/// Pure function: `default_max_tokens` is used when the caller omits
/// `max_tokens`, since the provider requires it.
pub fn to_messages_request(req: &ChatRequest, default_max_tokens: u64) -> MessagesRequest {
    let system_messages: Vec<&ChatMessage> = req
        .messages
        .iter()
        .filter(|m| m.role == "system")
        .collect();
    let system = if system_messages.is_empty() {
        None
    } else {
        Some(
            system_messages
                .iter()
                .map(|m| m.content.as_deref().unwrap_or(""))
                .collect::<Vec<_>>()
                .join("\n"),
        )
    };

    let messages = req
        .messages
        .iter()
        .filter(|m| m.role != "system")
        .map(translate_message)
        .collect();

    MessagesRequest {
        model: req.model.clone(),
        max_tokens: req.max_tokens.unwrap_or(default_max_tokens),
        messages,
        system,
        stream: None,
        temperature: req.temperature,
        top_p: req.top_p,
        // Naming mismatch inherited from the source schema: the generic `n`
        // field feeds the provider's `top_k`.
        top_k: req.n,
        stop_sequences: req.stop.as_ref().map(translate_stop),
        tools: to_anthropic_tools(req.tools.as_deref()),
        tool_choice: req.tool_choice.as_ref().and_then(to_anthropic_tool_choice),
    }
}

fn translate_message(msg: &ChatMessage) -> Message {
    match msg.role.as_str() {
        // Tool results: the provider expects them as user messages carrying
        // a single tool_result block.
        "tool" | "function" => Message {
            role: Role::User,
            content: MessageContent::Blocks(vec![ContentBlock::ToolResult {
                tool_use_id: msg.tool_call_id.clone().unwrap_or_default(),
                content: msg.content.clone().unwrap_or_default(),
                is_error: None,
            }]),
        },
        "assistant" => {
            if let Some(ref tool_calls) = msg.tool_calls {
                let mut blocks = Vec::new();

                if let Some(ref text) = msg.content {
                    if !text.is_empty() {
                        blocks.push(ContentBlock::Text { text: text.clone() });
                    }
                }

                for call in tool_calls {
                    blocks.push(ContentBlock::ToolUse {
                        id: call.id.clone(),
                        name: call.function.name.clone(),
                        // Opaque pass-through: the argument text is not
                        // re-parsed as JSON.
                        input: serde_json::Value::String(call.function.arguments.clone()),
                    });
                }

                Message {
                    role: Role::Assistant,
                    content: MessageContent::Blocks(blocks),
                }
            } else {
                Message {
                    role: Role::Assistant,
                    content: MessageContent::Text(msg.content.clone().unwrap_or_default()),
                }
            }
        }
        _ => Message {
            role: Role::User,
            content: MessageContent::Text(msg.content.clone().unwrap_or_default()),
        },
    }
}

fn translate_stop(stop: &StopSequences) -> Vec<String> {
    match stop {
        StopSequences::Single(s) => vec![s.clone()],
        StopSequences::Many(list) => list.clone(),
    }
}

/// Map generic tool definitions 1:1 into the provider's tool shape, keeping
/// the parameter schema verbatim. Absent or empty input maps to `None`.
pub fn to_anthropic_tools(tools: Option<&[ChatTool]>) -> Option<Vec<Tool>> {
    let tools = tools?;
    if tools.is_empty() {
        return None;
    }
    Some(
        tools
            .iter()
            .map(|t| Tool {
                name: t.function.name.clone(),
                description: t.function.description.clone(),
                input_schema: t.function.parameters.clone(),
            })
            .collect(),
    )
}

/// Map a generic tool-choice directive into the provider's tool-choice shape.
///
/// The provider has no "forbid tools" mode, so `"none"` maps to no
/// tool-choice field at all (a semantic approximation). Unrecognized string
/// values also fall back to no constraint rather than failing.
pub fn to_anthropic_tool_choice(choice: &ChatToolChoice) -> Option<ToolChoice> {
    match choice {
        ChatToolChoice::String(s) => match s.as_str() {
            "auto" => Some(ToolChoice::Auto),
            "required" => Some(ToolChoice::Any),
            _ => None,
        },
        ChatToolChoice::Specific(choice) => Some(ToolChoice::Tool {
            name: choice.function.name.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::chat_types::*;

    fn user_request(content: &str) -> ChatRequest {
        ChatRequest {
            model: "claude-3-5-sonnet-20241022".to_string(),
            messages: vec![ChatMessage::user(content)],
            max_tokens: None,
            temperature: None,
            top_p: None,
            n: None,
            stop: None,
            tools: None,
            tool_choice: None,
        }
    }

    #[test]
    fn test_simple_user_message() {
        let result = to_messages_request(&user_request("Hi"), 1000);

        assert_eq!(result.model, "claude-3-5-sonnet-20241022");
        assert_eq!(result.max_tokens, 1000);
        assert!(result.system.is_none());
        assert_eq!(result.messages.len(), 1);
        assert_eq!(result.messages[0].role, Role::User);
        assert!(
            matches!(result.messages[0].content, MessageContent::Text(ref t) if t == "Hi")
        );
    }

    #[test]
    fn test_system_messages_join_and_disappear() {
        let req = ChatRequest {
            messages: vec![
                ChatMessage::system("Be brief."),
                ChatMessage::user("Hello"),
                ChatMessage::system("Answer in French."),
            ],
            ..user_request("")
        };

        let result = to_messages_request(&req, 1000);

        assert_eq!(result.system.as_deref(), Some("Be brief.\nAnswer in French."));
        assert_eq!(result.messages.len(), 1);
        assert_eq!(result.messages[0].role, Role::User);
    }

    #[test]
    fn test_order_preserved_without_system() {
        let req = ChatRequest {
            messages: vec![
                ChatMessage::user("one"),
                ChatMessage::assistant("two"),
                ChatMessage::user("three"),
            ],
            ..user_request("")
        };

        let result = to_messages_request(&req, 1000);

        assert!(result.system.is_none());
        assert_eq!(result.messages.len(), 3);
        assert_eq!(result.messages[0].role, Role::User);
        assert_eq!(result.messages[1].role, Role::Assistant);
        assert_eq!(result.messages[2].role, Role::User);
    }

    #[test]
    fn test_tool_role_becomes_tool_result_block() {
        let req = ChatRequest {
            messages: vec![ChatMessage {
                role: "tool".to_string(),
                content: Some("70 degrees.".to_string()),
                tool_calls: None,
                tool_call_id: Some("toolu_1".to_string()),
            }],
            ..user_request("")
        };

        let result = to_messages_request(&req, 1000);

        assert_eq!(result.messages[0].role, Role::User);
        match &result.messages[0].content {
            MessageContent::Blocks(blocks) => {
                assert_eq!(blocks.len(), 1);
                match &blocks[0] {
                    ContentBlock::ToolResult {
                        tool_use_id,
                        content,
                        is_error,
                    } => {
                        assert_eq!(tool_use_id, "toolu_1");
                        assert_eq!(content, "70 degrees.");
                        assert!(is_error.is_none());
                    }
                    other => panic!("Expected tool_result block, got {other:?}"),
                }
            }
            MessageContent::Text(_) => panic!("Expected block content"),
        }
    }

    #[test]
    fn test_assistant_tool_calls_become_blocks() {
        let req = ChatRequest {
            messages: vec![ChatMessage {
                role: "assistant".to_string(),
                content: Some("Checking the weather.".to_string()),
                tool_calls: Some(vec![ChatToolCall {
                    id: "toolu_1".to_string(),
                    call_type: "function".to_string(),
                    function: ChatToolCallFunction {
                        name: "get_weather".to_string(),
                        arguments: "{\"city\":\"London\"}".to_string(),
                    },
                }]),
                tool_call_id: None,
            }],
            ..user_request("")
        };

        let result = to_messages_request(&req, 1000);

        match &result.messages[0].content {
            MessageContent::Blocks(blocks) => {
                assert_eq!(blocks.len(), 2);
                assert!(matches!(&blocks[0], ContentBlock::Text { text } if text == "Checking the weather."));
                match &blocks[1] {
                    ContentBlock::ToolUse { id, name, input } => {
                        assert_eq!(id, "toolu_1");
                        assert_eq!(name, "get_weather");
                        // Arguments carried opaquely, not re-parsed
                        assert_eq!(
                            input,
                            &serde_json::Value::String("{\"city\":\"London\"}".to_string())
                        );
                    }
                    other => panic!("Expected tool_use block, got {other:?}"),
                }
            }
            MessageContent::Text(_) => panic!("Expected block content"),
        }
    }

    #[test]
    fn test_assistant_tool_calls_without_text_skip_text_block() {
        let req = ChatRequest {
            messages: vec![ChatMessage {
                role: "assistant".to_string(),
                content: None,
                tool_calls: Some(vec![ChatToolCall {
                    id: "toolu_2".to_string(),
                    call_type: "function".to_string(),
                    function: ChatToolCallFunction {
                        name: "search".to_string(),
                        arguments: "{}".to_string(),
                    },
                }]),
                tool_call_id: None,
            }],
            ..user_request("")
        };

        let result = to_messages_request(&req, 1000);

        match &result.messages[0].content {
            MessageContent::Blocks(blocks) => {
                assert_eq!(blocks.len(), 1);
                assert!(matches!(&blocks[0], ContentBlock::ToolUse { .. }));
            }
            MessageContent::Text(_) => panic!("Expected block content"),
        }
    }

    #[test]
    fn test_sampling_params_and_stop_wrapping() {
        let req = ChatRequest {
            temperature: Some(0.3),
            top_p: Some(0.9),
            n: Some(40),
            stop: Some(StopSequences::Single("END".to_string())),
            max_tokens: Some(256),
            ..user_request("hi")
        };

        let result = to_messages_request(&req, 1000);

        assert_eq!(result.max_tokens, 256);
        assert_eq!(result.temperature, Some(0.3));
        assert_eq!(result.top_p, Some(0.9));
        assert_eq!(result.top_k, Some(40));
        assert_eq!(result.stop_sequences, Some(vec!["END".to_string()]));

        let req = ChatRequest {
            stop: Some(StopSequences::Many(vec!["a".to_string(), "b".to_string()])),
            ..user_request("hi")
        };
        let result = to_messages_request(&req, 1000);
        assert_eq!(
            result.stop_sequences,
            Some(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_tools_translated_verbatim() {
        let schema = serde_json::json!({
            "type": "object",
            "properties": { "city": { "type": "string" } },
            "required": ["city"]
        });
        let tools = vec![ChatTool {
            tool_type: "function".to_string(),
            function: ChatFunction {
                name: "get_weather".to_string(),
                description: Some("Get current weather for a city".to_string()),
                parameters: schema.clone(),
            },
        }];

        let result = to_anthropic_tools(Some(&tools)).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name, "get_weather");
        assert_eq!(result[0].input_schema, schema);

        assert!(to_anthropic_tools(None).is_none());
        assert!(to_anthropic_tools(Some(&[])).is_none());
    }

    #[test]
    fn test_tool_choice_mapping() {
        let auto = ChatToolChoice::String("auto".to_string());
        assert_eq!(to_anthropic_tool_choice(&auto), Some(ToolChoice::Auto));

        let required = ChatToolChoice::String("required".to_string());
        assert_eq!(to_anthropic_tool_choice(&required), Some(ToolChoice::Any));

        let none = ChatToolChoice::String("none".to_string());
        assert_eq!(to_anthropic_tool_choice(&none), None);

        let bogus = ChatToolChoice::String("sometimes".to_string());
        assert_eq!(to_anthropic_tool_choice(&bogus), None);

        let named = ChatToolChoice::Specific(ChatToolChoiceSpecific {
            choice_type: "function".to_string(),
            function: ChatToolChoiceFunction {
                name: "get_weather".to_string(),
            },
        });
        assert_eq!(
            to_anthropic_tool_choice(&named),
            Some(ToolChoice::Tool {
                name: "get_weather".to_string()
            })
        );
    }

    #[test]
    fn test_tool_choice_serializes_as_tagged_object() {
        let json = serde_json::to_value(ToolChoice::Any).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "any" }));

        let json = serde_json::to_value(ToolChoice::Tool {
            name: "f".to_string(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({ "type": "tool", "name": "f" }));
    }
}
