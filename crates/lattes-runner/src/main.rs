//! lattes — Bulk ingestion of Lattes curricula into a relational store.
//! Entry point for the runner binary.

mod config;

use std::sync::Arc;

use anyhow::Context;
use lattes_db::{CurriculumStore, Database, SqlCurriculumStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("lattes=debug,info")),
        )
        .init();

    info!("Lattes ingestion starting up...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Load configuration; a missing or invalid file aborts with a nonzero exit.
    let config = config::Config::load().context("loading configuration")?;
    info!(
        root = %config.ingestion.curricula_root.display(),
        logs = %config.ingestion.log_dir.display(),
        strategy = ?config.ingestion.strategy,
        "Configuration loaded"
    );

    info!("Opening database {}...", config.database.url);
    let db = Database::open_with(
        &config.database.url,
        config.database.max_connections,
        config.database.create_if_missing,
    )
    .await
    .with_context(|| format!("opening database {}", config.database.url))?;
    db.initialize().await.context("creating schema")?;
    let db = Arc::new(db);

    let store: Arc<dyn CurriculumStore> = Arc::new(SqlCurriculumStore::new(db.clone()));
    let summary = lattes_ingestion::run(config.ingestion, store)
        .await
        .context("ingestion aborted")?;

    // Partial outcomes live in the outcome logs, never in the exit status.
    match db.stats().await {
        Ok(stats) => info!(
            researchers = stats.researchers,
            institutions = stats.institutions,
            "Database totals"
        ),
        Err(e) => tracing::warn!(error = %e, "Could not read database totals"),
    }
    if let Ok(json) = serde_json::to_string(&summary) {
        info!("Run summary: {json}");
    }

    db.close().await;
    Ok(())
}
