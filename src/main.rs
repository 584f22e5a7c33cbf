//! Grillmatch save host: loads the save data, keeps it flushed in the background and saves on exit.

use std::sync::Arc;

use anyhow::Context;
use grillmatch_save::{
    SaveConfig, SaveContext,
    catalog::ConfigCatalog,
    dao::save_store::file::FileSaveStore,
    services::health_service,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = SaveConfig::load();
    tokio::fs::create_dir_all(&config.save_dir)
        .await
        .with_context(|| format!("creating save directory {}", config.save_dir.display()))?;

    let store = Arc::new(FileSaveStore::new(&config.save_dir, &config.extension));
    let context = SaveContext::open(&config, store).await;

    let catalog = match &config.catalog_path {
        Some(path) => match ConfigCatalog::load(path).await {
            Ok(catalog) => Some(catalog),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "catalog unavailable; continuing without it");
                None
            }
        },
        None => None,
    };

    context.sync_health(health_service::unix_now()).await;

    let player = context.player().await;
    info!(
        level = player.current_level_id(),
        coin = player.coin(),
        health = player.health(),
        next_heart_secs = health_service::next_heart_in(&player).map(|d| d.as_secs()),
        remove_ads = player.is_remove_ads(),
        "player ready"
    );
    if let Some(catalog) = &catalog {
        let level = i64::from(player.current_level_id());
        info!(
            total_levels = catalog.total_levels(),
            gallery_progress = catalog.gallery().current_progress(level),
            "catalog ready"
        );
    }

    shutdown_signal().await;
    info!("shutdown requested; flushing save data");

    let report = context.on_quit().await;
    if report.failed.is_empty() {
        info!(written = ?report.written, "save data flushed");
    } else {
        warn!(written = ?report.written, failed = ?report.failed, "some save data could not be flushed");
    }

    Ok(())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,grillmatch_save=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
