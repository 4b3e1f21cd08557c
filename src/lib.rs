pub mod client;
pub mod config;
pub mod error;
pub mod sse;
pub mod translate;

pub use client::{AnthropicClient, ChatChunkStream};
pub use config::{ClientConfig, Credential};
pub use error::{ClientError, Result};
pub use translate::chat_types::{
    ChatCompletionChunk, ChatMessage, ChatRequest, ChatResponse, ChatTool, ChatToolChoice,
};
pub use translate::streaming::MessageAccumulator;
