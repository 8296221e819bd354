//! RAG Server binary
//!
//! Run with: cargo run -p rag-service --bin rag-service-server

use rag_service::{config::RagConfig, server::RagServer};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rag_service=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::var("RAG_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("rag.toml"));
    let config = RagConfig::load(Some(&config_path))?;
    config.validate()?;

    tracing::info!("Configuration loaded (env: {})", config.env);
    tracing::info!("  - LLM provider: {:?}", config.llm.provider);
    tracing::info!("  - Vector store: {:?} ({})", config.vector_db.backend, config.vector_db.collection);
    tracing::info!("  - Data directory: {}", config.ingestion.data_dir.display());
    tracing::info!("  - Top k: {}", config.retrieval.top_k);

    // Create and start server
    let server = RagServer::new(config).await?;

    for (name, healthy) in [
        ("llm", server.state().llm().health_check().await.unwrap_or(false)),
        ("vector store", server.state().store().health_check().await.unwrap_or(false)),
    ] {
        if healthy {
            tracing::info!("{} is reachable", name);
        } else {
            tracing::warn!("{} is not reachable; queries may fail until it is", name);
        }
    }

    tracing::info!("API: http://{}/api/v1/rag", server.address());
    tracing::info!("Health: http://{}/health", server.address());

    server.start().await?;

    Ok(())
}
