//! Rancher broker service entry point.

use std::sync::Arc;

use clap::Parser;
use rancher_broker::config::AppConfig;
use rancher_broker::routes::{router, AppState};
use tracing::info;

/// Rancher credential broker.
#[derive(Parser, Debug)]
#[command(name = "rancher-broker", about = "Rancher credential broker")]
struct Args {
    /// Listen port; overrides `BROKER_PORT`.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = AppConfig::from_env();
    if let Some(port) = args.port {
        config.listen_port = port;
    }

    info!(
        retry_count = config.retry_count,
        request_timeout_secs = config.request_timeout.as_secs(),
        session_mode = %config.session_mode,
        "configuration loaded"
    );

    let state = Arc::new(AppState::from_config(&config)?);
    let app = router(state);

    let addr = format!("0.0.0.0:{}", config.listen_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(address = %addr, "broker listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await?;
    Ok(())
}
