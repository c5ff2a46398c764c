use anyhow::{Context, Result};
use common::balance_api::BalanceApiClient;
use common::config::{Config, DEFAULT_CONFIG_PATH};
use leaderboard::api::{self, AppState};
use leaderboard::builder::LeaderboardBuilder;
use leaderboard::metadata::MetadataIndex;
use leaderboard::roster::AddressRoster;
use leaderboard::session::LeaderboardSession;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)?;

    let (dispatch, _otel_guard) =
        common::observability::build_dispatch("wallet-leaderboard", &config.general.log_level);
    tracing::dispatcher::set_global_default(dispatch).map_err(anyhow::Error::msg)?;

    info!(path = %config_path, "wallet leaderboard starting");

    leaderboard::metrics::install_prometheus(config.observability.prometheus_port)?;
    leaderboard::metrics::describe();

    let metadata = Arc::new(MetadataIndex::load(&config.metadata.path)?);
    let roster = Arc::new(AddressRoster::from_config(&config.roster.addresses));
    info!(mode = ?roster.mode(), addresses = roster.len().await, "address roster ready");

    let client = BalanceApiClient::new(&config.balance_api.base_url, config.request_timeout())?;
    let builder = Arc::new(LeaderboardBuilder::new(client, metadata, Arc::clone(&roster)));
    let session = Arc::new(LeaderboardSession::new(
        builder,
        roster,
        config.page_size(),
        config.refresh_interval(),
    ));
    session.start().await?;

    let state = Arc::new(AppState {
        session: Arc::clone(&session),
        started_at: chrono::Utc::now(),
    });
    let app = api::router(state);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    info!(addr = %bind_addr, "starting leaderboard HTTP server");
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    session.teardown().await;
    info!("wallet leaderboard stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
