use anyhow::Result;
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

pub fn describe() {
    describe_counter!(
        "leaderboard_refresh_total",
        "Refresh cycles by outcome (ok, failed, busy, superseded)."
    );
    describe_gauge!(
        "leaderboard_entries",
        "Entries in the currently published leaderboard."
    );
    describe_histogram!(
        "leaderboard_refresh_duration_ms",
        "Time spent gathering balances for one refresh cycle."
    );
    describe_counter!(
        "balance_api_requests_total",
        "Balance service requests by status."
    );
    describe_counter!(
        "balance_api_errors_total",
        "Balance service failures by kind (transport, backend, decode)."
    );
    describe_histogram!(
        "balance_api_latency_ms",
        "Balance service request latency in milliseconds."
    );
}

/// Install the global recorder and serve `/metrics` on `port`.
/// Must be called from within a tokio runtime.
pub fn install_prometheus(port: u16) -> Result<()> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    Ok(())
}
