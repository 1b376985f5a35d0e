//! Conflux demo CLI.
//!
//! Runs one question through every orchestrator against the in-process
//! models: a tool-calling generation, the same question streamed, a
//! structured trip plan, and an embedding similarity ranking.
//!
//! # Usage
//!
//! ```bash
//! conflux-demo [question]
//! ```
//!
//! # Example
//!
//! ```bash
//! CONFLUX_LOG=conflux_generate=debug CONFLUX_STREAM_DELAY_MS=40 \
//!     conflux-demo "What's the weather in Lisbon?"
//! ```

#![expect(
    clippy::print_stdout,
    clippy::print_stderr,
    reason = "the demo reports to the terminal"
)]

use conflux_core::RuntimeConfig;
use conflux_generate::{
    EmbedOptions, GenerateOptions, embed, embed_many, generate_object_as, generate_text,
    stream_text,
};
use conflux_models::llm::Message;
use conflux_models::stream::StreamChunk;
use example::{CHAT_MODEL, DemoError, EMBEDDING_MODEL, PROVIDER, TripPlan, cosine_similarity};
use futures::StreamExt;
use std::io::Write;
use std::process::ExitCode;

const DEFAULT_QUESTION: &str = "What's the weather in Oslo?";

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    let config = match RuntimeConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err}");
            return ExitCode::FAILURE;
        }
    };
    config.tracing().init();

    let question = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_QUESTION.to_string());

    match run(&config, &question).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &RuntimeConfig, question: &str) -> Result<(), DemoError> {
    let registry = example::build_registry(config)?;
    let chat = registry.model(PROVIDER, CHAT_MODEL)?;
    let embedder = registry.model(PROVIDER, EMBEDDING_MODEL)?;
    tracing::info!(models = ?registry.list_available_models(), "registry ready");

    let options = || {
        GenerateOptions::new()
            .with_system("You are a concise weather assistant.")
            .with_tools(example::tools::demo_tools())
            .with_max_steps(config.max_steps.max(2))
    };

    // 1. Tool-calling generation
    let result = generate_text(
        &chat,
        vec![Message::user(question)],
        options(),
    )
    .await?;
    let answer = result
        .reasoning
        .as_ref()
        .map_or(result.text.as_str(), |split| split.answer.as_str());
    println!("== generate_text ({} steps)", result.steps.len());
    for step in &result.steps {
        for call in &step.tool_calls {
            println!("   tool call: {}({})", call.name, call.arguments);
        }
    }
    println!("{answer}");
    println!("   usage: {:?}\n", result.usage);

    // 2. The same question, streamed
    println!("== stream_text");
    let mut stream = stream_text(
        chat.clone().into_shared(),
        vec![Message::user(question)],
        options(),
    )?;
    let mut stdout = std::io::stdout();
    while let Some(chunk) = stream.next().await {
        match chunk {
            StreamChunk::TextDelta { text } => {
                print!("{text}");
                stdout.flush()?;
            }
            StreamChunk::ToolCallDelta(delta) if delta.done => {
                print!("[{}] ", delta.name);
            }
            StreamChunk::ToolCallDelta(_) => {}
            StreamChunk::Finish(finish) => {
                println!("\n   finish: {:?}, usage: {:?}\n", finish.finish_reason, finish.usage);
            }
            StreamChunk::Error { message } => return Err(DemoError::Stream(message)),
        }
    }

    // 3. Structured output
    let plan = generate_object_as::<TripPlan>(
        &chat,
        vec![Message::user(format!("Plan a short trip. {question}"))],
        GenerateOptions::new(),
    )
    .await?;
    println!("== generate_object_as::<TripPlan>");
    println!("{:#?}\n", plan.object);

    // 4. Embeddings
    let documents: Vec<String> = [
        "Rain is expected in Oslo all week.",
        "Lisbon stays sunny and warm.",
        "Snow keeps falling over Montreal.",
        "Nairobi sees scattered afternoon clouds.",
    ]
    .into_iter()
    .map(String::from)
    .collect();
    let query = embed(&embedder, question, EmbedOptions::new()).await?;
    let corpus = embed_many(&embedder, documents, EmbedOptions::new()).await?;

    let mut ranked: Vec<(f32, &str)> = corpus
        .values
        .iter()
        .zip(&corpus.embeddings)
        .map(|(text, vector)| (cosine_similarity(&query.embedding, vector), text.as_str()))
        .collect();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));

    println!("== embed_many (closest to the question first)");
    for (score, text) in ranked {
        println!("   {score:.3}  {text}");
    }
    Ok(())
}
