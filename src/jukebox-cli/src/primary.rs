//! The primary instance: owns the player and serves remote calls.

use anyhow::{Context, Result};
use filesystem_resolver::FilesystemResolver;
use jukebox_core::{Config, PlayerFacade, TrackResolver};
use jukebox_player::SharedPlayer;
use jukebox_remote::{EndpointHandle, RemoteService};
use std::future::Future;
use std::sync::Arc;

/// Run until Ctrl-C or SIGTERM.
///
/// Without a `handle` the player runs standalone and accepts no remote calls.
pub fn run(config: &Config, handle: Option<EndpointHandle>, locations: Vec<String>) -> Result<()> {
    run_until(config, handle, locations, shutdown_signal())
}

/// Run until `shutdown` completes. The endpoint is released on return.
pub fn run_until<F>(
    config: &Config,
    handle: Option<EndpointHandle>,
    locations: Vec<String>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let player = SharedPlayer::from_config(&config.player);
    let resolver = Arc::new(FilesystemResolver::new());
    if !locations.is_empty() {
        player.enqueue(resolver.resolve_all(&locations));
    }
    tracing::info!(
        queued = player.lock().queue().len(),
        volume = %player.volume(),
        "primary instance started"
    );

    runtime.block_on(async move {
        match handle {
            Some(handle) => {
                let object_path = handle.endpoint().object_path().to_string();
                let service = Arc::new(RemoteService::new(
                    Arc::new(player),
                    resolver,
                    object_path,
                ));
                service
                    .serve(handle, shutdown)
                    .await
                    .context("remote service failed")?;
            }
            None => shutdown.await,
        }
        Ok::<_, anyhow::Error>(())
    })?;

    tracing::info!("primary instance stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown requested");
}
