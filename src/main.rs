//! Logchecker daemon
//!
//! Run with: cargo run
//!
//! Environment variables:
//! - LOGCHECKER_CONFIG: Path to the JSON configuration (default: config.json)
//! - LOGCHECKER_DEBUG: Verbose logging when set to 1/true
//! - LOGCHECKER_DRY_RUN: Log alerts instead of e-mailing them when set to 1/true
//! - LOGCHECKER_STATUS_ADDR: Serve the status API on this address (e.g. 127.0.0.1:8080)
//! - RUST_LOG: Log filter, overrides LOGCHECKER_DEBUG

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use logchecker::api::{run_status_server, AppState};
use logchecker::checker::LogChecker;
use logchecker::notifier::{Dispatcher, LogTransport, SmtpTransport, Transport};
use logchecker::storage::BackendRegistry;

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logchecker::logging::init(env_flag("LOGCHECKER_DEBUG"));

    let config_path =
        std::env::var("LOGCHECKER_CONFIG").unwrap_or_else(|_| "config.json".to_string());
    let dry_run = env_flag("LOGCHECKER_DRY_RUN");
    let status_addr: Option<SocketAddr> = match std::env::var("LOGCHECKER_STATUS_ADDR") {
        Ok(addr) if !addr.trim().is_empty() => Some(addr.trim().parse()?),
        _ => None,
    };

    let mut checker = LogChecker::from_file(&config_path)?;
    checker.validate(&BackendRegistry::with_defaults())?;

    let config = checker.config();
    tracing::info!("Logchecker configuration:");
    tracing::info!("  Config file: {}", config.path.display());
    tracing::info!("  Services: {}", config.observed.len());
    tracing::info!("  Files: {}", config.file_count());
    tracing::info!("  Storage: {}", config.storage);
    tracing::info!("  Replay existing content: {}", config.settings.replay_existing);
    tracing::info!("  Dedup window: {} seconds", config.settings.dedup_window_secs);
    tracing::debug!("{}", config);

    let transport: Arc<dyn Transport> = if dry_run {
        tracing::info!("  Delivery: DRY RUN (alerts are logged only)");
        Arc::new(LogTransport)
    } else {
        tracing::info!("  Delivery: SMTP via {}", config.sender.addr);
        Arc::new(SmtpTransport::from_sender(&config.sender)?)
    };
    let notifier = Arc::new(
        Dispatcher::new(transport)
            .with_dedup_window(Duration::from_secs(config.settings.dedup_window_secs))
            .with_retry_backoff(Duration::from_millis(config.settings.retry_backoff_ms)),
    );

    let scheduler = checker.start(notifier)?;

    let (status_tx, status_rx) = tokio::sync::oneshot::channel::<()>();
    let status_task = match (status_addr, checker.backend()) {
        (Some(addr), Some(store)) => {
            let state = Arc::new(AppState {
                store: Arc::clone(store),
                config: Arc::new(checker.config().clone()),
            });
            Some(tokio::spawn(run_status_server(addr, state, async move {
                let _ = status_rx.await;
            })))
        }
        _ => None,
    };

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");

    scheduler.stop().await;
    let _ = status_tx.send(());
    if let Some(task) = status_task {
        match task.await {
            Ok(Err(e)) => tracing::error!(error = %e, "Status API failed"),
            Err(e) => tracing::error!(error = %e, "Status API task panicked"),
            Ok(Ok(())) => {}
        }
    }

    Ok(())
}
