//! The HTTP client: translates, sends, and translates back.
//!
//! [`AnthropicClient`] exposes the generic chat-completion surface
//! (`create_chat_completion`, `stream_chat_completion`) and owns the
//! transport to the provider's `/v1/messages` endpoint. Translation itself
//! lives in [`crate::translate`]; this module only glues it to `reqwest`.

use std::pin::Pin;

use futures::stream::Stream;
use futures::StreamExt;

use crate::config::{ClientConfig, Credential};
use crate::error::{ClientError, Result};
use crate::sse::SseFrameParser;
use crate::translate::anthropic_types::{ErrorResponse, MessagesResponse, StreamEvent};
use crate::translate::chat_types::{ChatCompletionChunk, ChatRequest, ChatResponse};
use crate::translate::request::to_messages_request;
use crate::translate::response::to_chat_response;
use crate::translate::streaming::ChunkAssembler;

/// A lazy, single-consumption, forward-only sequence of stream chunks.
/// Dropping it cancels the underlying request at the next await point.
pub type ChatChunkStream =
    Pin<Box<dyn Stream<Item = Result<ChatCompletionChunk>> + Send>>;

pub struct AnthropicClient {
    http: reqwest::Client,
    config: ClientConfig,
    credential: Credential,
}

impl AnthropicClient {
    /// Build a client, resolving the credential eagerly.
    ///
    /// # Errors
    /// Fails with a `Config` error before any network activity when no
    /// API key or auth token can be resolved.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let credential = config.resolve_credential()?;
        let http = reqwest::Client::builder()
            .timeout(config.effective_timeout())
            .user_agent(concat!("anthropic-compat/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            config,
            credential,
        })
    }

    pub fn with_env() -> Result<Self> {
        Self::new(ClientConfig::default())
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.config.effective_base_url())
    }

    fn request_builder(&self, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .post(url)
            .header("anthropic-version", self.config.effective_api_version())
            .header("Content-Type", "application/json");

        builder = match &self.credential {
            Credential::ApiKey(key) => builder.header("x-api-key", key),
            Credential::AuthToken(token) => {
                builder.header("Authorization", format!("Bearer {token}"))
            }
        };

        if let Some(ref beta) = self.config.beta {
            builder = builder.header("anthropic-beta", beta);
        }

        builder
    }

    /// Send a single-shot chat completion.
    pub async fn create_chat_completion(&self, req: &ChatRequest) -> Result<ChatResponse> {
        let url = self.messages_url();
        let body = to_messages_request(req, self.config.effective_max_tokens());

        tracing::info!(model = %body.model, url = %url, "Creating chat completion");

        let response = self
            .request_builder(&url)
            .json(&body)
            .send()
            .await
            .map_err(ClientError::Http)?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(ClientError::Http)?;

        tracing::debug!(status, body_len = text.len(), "Provider response");

        if status >= 400 {
            return Err(api_error(status, &text));
        }

        let provider_resp: MessagesResponse = serde_json::from_str(&text).map_err(|e| {
            ClientError::translation(format!(
                "Failed to parse provider response: {}. Body: {}",
                e,
                truncate(&text, 300)
            ))
        })?;

        let chat_resp = to_chat_response(&provider_resp);
        tracing::info!(
            input_tokens = provider_resp.usage.input_tokens,
            output_tokens = provider_resp.usage.output_tokens,
            "Completed"
        );
        Ok(chat_resp)
    }

    /// Send a streaming chat completion, returning a chunk stream.
    pub async fn stream_chat_completion(&self, req: &ChatRequest) -> Result<ChatChunkStream> {
        let url = self.messages_url();
        let mut body = to_messages_request(req, self.config.effective_max_tokens());
        body.stream = Some(true);

        tracing::info!(model = %body.model, url = %url, "Creating chat completion (streaming)");

        let response = self
            .request_builder(&url)
            .json(&body)
            .send()
            .await
            .map_err(ClientError::Http)?;

        let status = response.status().as_u16();
        if status >= 400 {
            let text = response.text().await.unwrap_or_default();
            return Err(api_error(status, &text));
        }

        let model = req.model.clone();
        let byte_stream = response.bytes_stream();

        Ok(Box::pin(chunk_stream(byte_stream, model)))
    }
}

/// Consume the provider's SSE byte stream and yield one generic chunk per
/// relevant frame. One parser and one assembler per stream; frames are
/// processed strictly in arrival order.
fn chunk_stream(
    byte_stream: impl Stream<Item = std::result::Result<bytes::Bytes, reqwest::Error>>
        + Send
        + 'static,
    model: String,
) -> impl Stream<Item = Result<ChatCompletionChunk>> + Send + 'static {
    async_stream::stream! {
        let mut parser = SseFrameParser::new();
        let mut assembler = ChunkAssembler::new(&model);

        tokio::pin!(byte_stream);

        'read: while let Some(chunk_result) = byte_stream.next().await {
            let bytes = match chunk_result {
                Ok(b) => b,
                Err(e) => {
                    tracing::warn!(error = %e, "Byte stream error");
                    yield Err(ClientError::Http(e));
                    break 'read;
                }
            };

            for frame in parser.push(&bytes) {
                match serde_json::from_value::<StreamEvent>(frame.data) {
                    Ok(event) => {
                        tracing::trace!(event = event.event_name(), "Stream event");
                        let is_stop = matches!(event, StreamEvent::MessageStop);
                        yield Ok(assembler.process_event(&event));
                        if is_stop {
                            break 'read;
                        }
                    }
                    Err(e) => {
                        // Unknown event types are never fatal.
                        tracing::debug!(
                            event = %frame.event,
                            error = %e,
                            "Unrecognized stream event"
                        );
                        yield Ok(assembler.empty_chunk());
                    }
                }
            }
        }

        parser.finish();
        tracing::debug!("Stream completed");
    }
}

fn api_error(status: u16, body: &str) -> ClientError {
    if let Ok(err) = serde_json::from_str::<ErrorResponse>(body) {
        return ClientError::api(
            status,
            format!("{}: {}", err.error.error_type, err.error.message),
        );
    }
    ClientError::api(status, truncate(body, 500))
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
