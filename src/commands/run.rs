//! Daemon command
//!
//! Runs the alert engine until SIGINT or SIGTERM.

use crate::alerts::spawn_alert_engine;
use crate::commands::AppContext;
use crate::error::{AppError, Result};

use std::sync::Arc;

/// Execute the run command
pub async fn run_daemon(ctx: &AppContext) -> Result<()> {
    let base = ctx.base_ids();
    if base.is_empty() {
        return Err(AppError::NoAdmins);
    }

    let alerts = ctx.store.alerts().await;
    log::info!(
        "Starting hostwarden: {} base operator(s), alerts {}, interval {}s, state {}",
        base.len(),
        if alerts.enabled { "enabled" } else { "disabled" },
        alerts.poll_interval_seconds,
        ctx.store.path().display()
    );
    if ctx.store.notification_destination().await.is_none() {
        log::warn!("No notification destination registered; alert ticks are skipped until one is set");
    }

    let engine = Arc::new(ctx.alert_engine(ctx.sampler())?);
    let handle = spawn_alert_engine(engine);

    wait_for_shutdown().await;
    log::info!("Shutting down");
    handle.shutdown().await;
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            log::warn!("Cannot listen for SIGTERM: {}", e);
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown() {
    let _ = tokio::signal::ctrl_c().await;
}
