//! Parley demo: answers prompts on a single thread against a local Ollama

use parley::{EngineConfig, InMemoryCheckpointStore, Orchestrator};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const THREAD_ID: &str = "1";

const SAMPLE_PROMPTS: [&str; 3] = [
    "Can you write a Python script that prints the numbers 1-20?",
    "Apple pie is my favorite!",
    "Can you tell me a story about pandas?",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parley=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = EngineConfig::from_env();
    tracing::info!(
        ollama = %config.ollama_url,
        router = %config.models.router,
        chat = %config.models.chat,
        code = %config.models.code,
        story = %config.models.story,
        summary = %config.models.summary,
        "Starting engine"
    );

    let store = Arc::new(InMemoryCheckpointStore::new());
    let engine = Orchestrator::from_config(&config, store)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let prompts: Vec<String> = if args.is_empty() {
        SAMPLE_PROMPTS.iter().map(ToString::to_string).collect()
    } else {
        vec![args.join(" ")]
    };

    for prompt in prompts {
        println!("User: {prompt}");
        let outcome = engine.ask_detailed(THREAD_ID, &prompt).await?;
        println!("Assistant ({}): {}\n", outcome.route, outcome.reply);
    }

    Ok(())
}
