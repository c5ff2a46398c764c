use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use common::balance_api::{BalanceFetcher, FetchError};
use common::types::{BalanceRecord, WalletAddress, WalletMetadata};
use leaderboard::api::{self, AppState};
use leaderboard::builder::LeaderboardBuilder;
use leaderboard::metadata::MetadataIndex;
use leaderboard::roster::AddressRoster;
use leaderboard::session::LeaderboardSession;

/// Answers each fetch with the next scripted response, then with empty lists.
pub struct FakeBalances {
    responses: Mutex<VecDeque<Result<Vec<BalanceRecord>, FetchError>>>,
    gate: Option<Arc<Notify>>,
}

impl FakeBalances {
    pub fn new(responses: Vec<Result<Vec<BalanceRecord>, FetchError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            gate: None,
        }
    }

    /// Each fetch waits for a notification on `gate` before answering.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

impl BalanceFetcher for FakeBalances {
    async fn fetch_balances(
        &self,
        _addresses: &[WalletAddress],
    ) -> Result<Vec<BalanceRecord>, FetchError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

pub fn record(address: &str, balance: f64) -> BalanceRecord {
    BalanceRecord {
        address: address.into(),
        balance,
    }
}

pub fn metadata() -> MetadataIndex {
    MetadataIndex::from_records([WalletMetadata {
        address: "A".into(),
        sponsor_tag: Some("X".into()),
        handle: Some("@a".into()),
    }])
}

pub fn test_app(
    fetcher: FakeBalances,
    roster: AddressRoster,
    page_size: usize,
) -> (axum::Router, Arc<LeaderboardSession<FakeBalances>>) {
    let roster = Arc::new(roster);
    let builder = Arc::new(LeaderboardBuilder::new(
        fetcher,
        Arc::new(metadata()),
        Arc::clone(&roster),
    ));
    let session = Arc::new(LeaderboardSession::new(
        builder,
        roster,
        std::num::NonZeroUsize::new(page_size).unwrap(),
        std::time::Duration::from_secs(30),
    ));
    let state = Arc::new(AppState {
        session: Arc::clone(&session),
        started_at: chrono::Utc::now(),
    });
    (api::router(state), session)
}
