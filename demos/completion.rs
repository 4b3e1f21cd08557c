//! Single-shot chat completion against the live API.
//!
//! Run with: ANTHROPIC_API_KEY=... cargo run --example completion

use anthropic_compat::{AnthropicClient, ChatMessage, ChatRequest};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "anthropic_compat=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let client = AnthropicClient::with_env()?;

    let request = ChatRequest {
        model: "claude-3-5-haiku-20241022".to_string(),
        messages: vec![
            ChatMessage::system("You are a helpful assistant. Respond very briefly."),
            ChatMessage::user("What is the capital of France?"),
        ],
        max_tokens: Some(100),
        temperature: Some(0.0),
        top_p: None,
        n: None,
        stop: None,
        tools: None,
        tool_choice: None,
    };

    let response = client.create_chat_completion(&request).await?;

    let choice = &response.choices[0];
    println!("{}", choice.message.content.as_deref().unwrap_or("(no content)"));

    if let Some(usage) = response.usage {
        println!(
            "-- {} prompt + {} completion = {} tokens",
            usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
        );
    }

    Ok(())
}
