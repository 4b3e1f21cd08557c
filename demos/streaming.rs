//! Streaming chat completion: print text deltas as they arrive, then the
//! accumulated message.
//!
//! Run with: ANTHROPIC_API_KEY=... cargo run --example streaming

use anthropic_compat::{AnthropicClient, ChatMessage, ChatRequest, MessageAccumulator};
use futures::StreamExt;
use std::io::Write;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "anthropic_compat=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let client = AnthropicClient::with_env()?;

    let request = ChatRequest {
        model: "claude-3-5-haiku-20241022".to_string(),
        messages: vec![ChatMessage::user("Write a haiku about rivers.")],
        max_tokens: Some(200),
        temperature: None,
        top_p: None,
        n: None,
        stop: None,
        tools: None,
        tool_choice: None,
    };

    let mut stream = client.stream_chat_completion(&request).await?;
    let mut accumulator = MessageAccumulator::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if let Some(choice) = chunk.choices.first() {
            if let Some(ref text) = choice.delta.content {
                print!("{text}");
                std::io::stdout().flush()?;
            }
        }
        accumulator.push(&chunk);
    }
    println!();

    let response = accumulator.into_response();
    println!(
        "-- finish_reason: {:?}",
        response.choices[0].finish_reason
    );

    Ok(())
}
