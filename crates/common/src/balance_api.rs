use crate::types::{BalanceRecord, WalletAddress};
use anyhow::{Context, Result};
use serde::Serialize;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::debug;

/// Failure talking to the balance service. Every variant is retryable on the
/// next refresh cycle.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("balance service unreachable: {0}")]
    Transport(String),
    #[error("balance service returned {status}: {body}")]
    Backend { status: u16, body: String },
    #[error("invalid balance response: {0}")]
    Decode(String),
}

impl FetchError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Backend { .. } => "backend",
            Self::Decode(_) => "decode",
        }
    }
}

/// Batched balance lookup for an ordered set of addresses.
///
/// Addresses the service does not know about are simply missing from the
/// result; that is not an error.
pub trait BalanceFetcher {
    fn fetch_balances(
        &self,
        addresses: &[WalletAddress],
    ) -> impl Future<Output = Result<Vec<BalanceRecord>, FetchError>> + Send;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BalancesRequest<'a> {
    wallet_addresses: &'a [WalletAddress],
}

pub struct BalanceApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl BalanceApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build balance service HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn balances_url(&self) -> String {
        format!("{}/getBalances", self.base_url)
    }

    async fn fetch_balances_raw(
        &self,
        addresses: &[WalletAddress],
    ) -> Result<Vec<BalanceRecord>, FetchError> {
        let url = self.balances_url();
        debug!(url = %url, count = addresses.len(), "requesting balances");

        let resp = self
            .client
            .post(&url)
            .json(&BalancesRequest {
                wallet_addresses: addresses,
            })
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(FetchError::Backend {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))
    }
}

impl BalanceFetcher for BalanceApiClient {
    async fn fetch_balances(
        &self,
        addresses: &[WalletAddress],
    ) -> Result<Vec<BalanceRecord>, FetchError> {
        let start = Instant::now();
        let res = self.fetch_balances_raw(addresses).await;
        let ms = start.elapsed().as_secs_f64() * 1000.0;
        metrics::histogram!("balance_api_latency_ms").record(ms);
        match res {
            Ok(records) => {
                metrics::counter!("balance_api_requests_total", "status" => "ok").increment(1);
                debug!(
                    requested = addresses.len(),
                    returned = records.len(),
                    "fetched balances"
                );
                Ok(records)
            }
            Err(e) => {
                metrics::counter!("balance_api_requests_total", "status" => "error").increment(1);
                metrics::counter!("balance_api_errors_total", "kind" => e.kind()).increment(1);
                Err(e)
            }
        }
    }
}
