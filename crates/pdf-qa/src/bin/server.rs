//! PDF chatbot server binary
//!
//! Run with: cargo run -p pdf-qa --bin pdf-qa-server -- --port 8080

use clap::Parser;
use pdf_qa::{config::RagConfig, providers::LlmProvider, server::RagServer};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Chat with your PDFs over a local Ollama server")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "PDF_QA_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_qa=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                 PDF-Based Q&A Chatbot                     ║
║        Retrieval-augmented answers from your PDFs         ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    let mut config = RagConfig::load(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedding model: {}", config.embeddings.model);
    tracing::info!("  - LLM model: {}", config.llm.generate_model);
    tracing::info!(
        "  - Chunking: {} chars, {} overlap",
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    );
    tracing::info!("  - Retrieval: top {} ({:?})", config.retrieval.top_k, config.retrieval.metric);

    let server = RagServer::new(config.clone())?;

    tracing::info!("Checking Ollama at {}...", config.llm.base_url);
    let llm = server.state().llm_provider();
    if llm.health_check().await.unwrap_or(false) {
        tracing::info!("Ollama is running");
    } else {
        tracing::warn!("Ollama not available at {}", config.llm.base_url);
        tracing::warn!("Please start Ollama:");
        tracing::warn!("  1. Start: ollama serve");
        tracing::warn!(
            "  2. Pull models: ollama pull {} && ollama pull {}",
            config.embeddings.model,
            config.llm.generate_model
        );
    }

    println!("\nServer starting...");
    println!("  UI: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
