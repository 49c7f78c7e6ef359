use anyhow::Context;
use std::path::Path;
use tracing::{info, warn};

use story_points::api::{build_router, AppState};
use story_points::classifier::ClassifierService;
use story_points::config::{Config, DEFAULT_CONFIG_FILE};
use story_points::history::TaskStore;
use story_points::llm::LlmClient;
use story_points::telemetry::init_tracing;
use story_points::text_classifier::TextClassifierClient;
use story_points::KeywordTaxonomy;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config_file =
        std::env::var("STORY_POINTS_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
    let config = Config::load(&config_file).context("Failed to load configuration")?;
    init_tracing(&config.logging);

    let taxonomy = match &config.keywords.path {
        Some(path) => load_taxonomy(path).await,
        None => KeywordTaxonomy::default(),
    };

    let tasks = match &config.history.data_dir {
        Some(dir) => TaskStore::open(dir)
            .await
            .with_context(|| format!("Failed to open task history in {}", dir.display()))?,
        None => TaskStore::in_memory(),
    };

    let classifier = ClassifierService::load(config.history.model_path())
        .await
        .context("Failed to load classifier")?;

    let llm = LlmClient::new(config.llm.clone()).context("Failed to build LLM client")?;
    let text_classifier = TextClassifierClient::new(config.text_classifier.clone())
        .context("Failed to build text classifier client")?;

    let state = AppState::new(
        taxonomy,
        config.keywords.path.clone(),
        tasks,
        classifier,
        llm,
        text_classifier,
    );
    info!(
        "Loaded {} recorded tasks, classifier trained: {}",
        state.tasks.len(),
        state.classifier.is_trained().await
    );

    let router = build_router(state, config.server.max_body_bytes);
    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Story-point estimator listening on http://{}", addr);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// A missing or unreadable keyword file falls back to the built-in taxonomy.
async fn load_taxonomy(path: &Path) -> KeywordTaxonomy {
    match KeywordTaxonomy::load_from(path).await {
        Ok(taxonomy) => {
            info!(
                "Loaded {} keywords from {}",
                taxonomy.keyword_count(),
                path.display()
            );
            taxonomy
        }
        Err(e) => {
            warn!(
                "Using default keywords, could not load {}: {}",
                path.display(),
                e
            );
            KeywordTaxonomy::default()
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
