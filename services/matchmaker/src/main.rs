//! matchforge matchmaker
//!
//! Accepts matchmaking requests over HTTP, batches queued players into
//! matches once per tick and allocates a game server for each match.

use std::sync::Arc;

use anyhow::{Context, Result};
use matchforge_matchmaker::{
    allocation::{Allocator, HttpAllocator, StaticAllocator},
    api, config,
    notifier::{HttpNotifier, LogNotifier, Notifier},
    scheduler::MatchScheduler,
    state::AppState,
};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::Config::from_env()?;

    // Prefer RUST_LOG, fall back to MATCHMAKER_LOG_LEVEL
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting matchforge matchmaker");
    info!(
        listen_addr = %config.listen_addr,
        fleet = %config.matchmaking.fleet_name,
        game_mode_id = %config.matchmaking.game_mode_id,
        "Configuration loaded"
    );

    let allocator: Arc<dyn Allocator> = match &config.allocator.url {
        Some(url) => {
            info!(url = %url, "Using HTTP allocator");
            Arc::new(
                HttpAllocator::new(url, config.allocator.timeout)
                    .context("failed to build allocator client")?,
            )
        }
        None => {
            warn!("No allocator URL configured, using static allocator");
            Arc::new(StaticAllocator::default())
        }
    };

    let notifier: Arc<dyn Notifier> = match &config.notifier_url {
        Some(url) => {
            info!(url = %url, "Publishing match announcements over HTTP");
            Arc::new(
                HttpNotifier::new(url.as_str(), config.allocator.timeout)
                    .context("failed to build notifier client")?,
            )
        }
        None => {
            info!("No notifier URL configured, match announcements are logged only");
            Arc::new(LogNotifier)
        }
    };

    let scheduler = MatchScheduler::new(&config.matchmaking, allocator, notifier);
    let state = AppState::new(&scheduler);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler_handle = tokio::spawn({
        let shutdown_rx = shutdown_rx.clone();
        async move {
            scheduler.run(shutdown_rx).await;
        }
    });

    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "Listening for connections");

    let mut server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let mut shutdown_rx = shutdown_rx;
                loop {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                    if shutdown_rx.changed().await.is_err() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
    });

    let server_running = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            true
        }
        result = &mut server_handle => {
            log_server_exit(result);
            false
        }
    };

    let _ = shutdown_tx.send(true);

    // No bound here. The tick in progress finishes its allocations and
    // notifications, each limited by its client timeout.
    info!("Waiting for scheduler to shut down...");
    if let Err(e) = scheduler_handle.await {
        error!(error = %e, "Scheduler task panicked");
    }

    if server_running {
        let shutdown_timeout = std::time::Duration::from_secs(10);
        match tokio::time::timeout(shutdown_timeout, server_handle).await {
            Ok(result) => log_server_exit(result),
            Err(_) => warn!("HTTP server did not shut down in time"),
        }
    }

    info!("Matchmaker shutdown complete");
    Ok(())
}

fn log_server_exit(result: Result<std::io::Result<()>, tokio::task::JoinError>) {
    match result {
        Ok(Ok(())) => info!("Server exited normally"),
        Ok(Err(e)) => error!(error = %e, "Server error"),
        Err(e) => error!(error = %e, "Server task panicked"),
    }
}
