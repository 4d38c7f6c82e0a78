use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, sync::watch};
use tracing::{info, warn};

use techpro_core::config::{AppConfig, LoadOptions};
use techpro_server::{bootstrap_with_config, init_logging, router};

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = Arc::new(bootstrap_with_config(config).await?);
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let drain = Duration::from_secs(app.config.server.graceful_shutdown_secs);

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        address = %address,
        "techpro-server listening"
    );

    let (stopping_tx, mut stopping_rx) = watch::channel(false);
    let server = axum::serve(listener, router(app))
        .with_graceful_shutdown(async move {
            wait_for_shutdown().await;
            info!(event_name = "system.server.stopping", correlation_id = "shutdown", "draining requests");
            let _ = stopping_tx.send(true);
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => result.context("server terminated with an error")?,
        _ = async {
            if stopping_rx.wait_for(|stopping| *stopping).await.is_err() {
                std::future::pending::<()>().await;
            }
            tokio::time::sleep(drain).await;
        } => {
            warn!(
                event_name = "system.server.drain_timeout",
                correlation_id = "shutdown",
                drain_secs = drain.as_secs(),
                "in-flight requests did not finish in time"
            );
        }
    }

    info!(event_name = "system.server.stopped", correlation_id = "shutdown", "techpro-server stopped");
    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(event_name = "system.server.signal_failed", error = %err, "could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
