use std::net::SocketAddr;

use mock_rancher::MockRancher;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let port: u16 = std::env::var("MOCK_RANCHER_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(4100);
    let username = std::env::var("MOCK_RANCHER_USERNAME").unwrap_or_else(|_| "admin".into());
    let password = std::env::var("MOCK_RANCHER_PASSWORD").unwrap_or_else(|_| "password".into());

    let mock = MockRancher::builder()
        .credentials(&username, &password)
        .cluster("local", "local")
        .cluster("c-demo1", "staging")
        .cluster("c-demo2", "production")
        .start_on(SocketAddr::from(([0, 0, 0, 0], port)))
        .await?;

    tracing::info!(url = mock.url(), %username, "MOCK-RANCHER ready");
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    Ok(())
}
