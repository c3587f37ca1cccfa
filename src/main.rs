use std::path::PathBuf;

use anyhow::Context;
use index_service::{IndexConfig, IndexRegistry, IndexSettings, telemetry};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{Level, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Results printed for `SEARCH_QUERY`.
const SEARCH_TOP_K: usize = 10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; the process environment still applies.
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(telemetry::env_filter_with_level("warn", Level::INFO))
        .with(telemetry::layer())
        .init();

    let workspace = match std::env::var("WORKSPACE_PATH") {
        Ok(p) if !p.trim().is_empty() => PathBuf::from(p),
        _ => std::env::current_dir().context("cannot resolve current directory")?,
    };

    let config = IndexConfig::from_env().context("invalid index configuration")?;
    let settings = IndexSettings::from_env().context("invalid index settings")?;
    let registry = IndexRegistry::new(config, settings);
    let service = registry.get_or_create(&workspace).await?;

    info!(target: "index_service", workspace = %workspace.display(), "indexing");
    let mut rx = service.subscribe();
    if service.index_workspace().await? {
        let pb = ProgressBar::new(0);
        pb.set_style(ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} files {msg}",
        )?);

        loop {
            let status = rx.borrow_and_update().clone();
            pb.set_length(status.total_files as u64);
            pb.set_position(status.indexed_files as u64);
            pb.set_message(format!("{} chunks", status.total_chunks));
            if !status.is_indexing {
                break;
            }
            if rx.changed().await.is_err() {
                break;
            }
        }
        pb.finish_and_clear();
    }

    let status = service.get_status();
    println!("{}", serde_json::to_string_pretty(&status)?);
    if let Some(err) = &status.error {
        registry.destroy_all().await;
        anyhow::bail!("indexing failed: {err}");
    }

    if let Ok(query) = std::env::var("SEARCH_QUERY") {
        let hits = service.search(&query, SEARCH_TOP_K).await?;
        println!("{}", serde_json::to_string_pretty(&hits)?);
    }

    registry.destroy_all().await;
    Ok(())
}
