//! One refresh cycle: fetch balances for the roster, join with metadata,
//! rank, and publish.
//!
//! The published leaderboard is an `Arc` snapshot inside a `watch` channel.
//! A cycle replaces it wholesale, so readers see either the previous list or
//! the new one. A failed cycle publishes nothing.

use crate::metadata::MetadataIndex;
use crate::roster::AddressRoster;
use chrono::{DateTime, Utc};
use common::balance_api::{BalanceFetcher, FetchError};
use common::types::{BalanceRecord, LeaderboardEntry};
use serde::Serialize;
use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Entries ordered by balance descending; equal balances keep the order the
/// balance service returned them in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankedLeaderboard {
    entries: Vec<LeaderboardEntry>,
    refreshed_at: Option<DateTime<Utc>>,
}

impl RankedLeaderboard {
    pub fn rank(
        records: Vec<BalanceRecord>,
        metadata: &MetadataIndex,
        refreshed_at: DateTime<Utc>,
    ) -> Self {
        let mut entries: Vec<LeaderboardEntry> = records
            .into_iter()
            .map(|record| {
                let meta = metadata.lookup(record.address.as_str());
                LeaderboardEntry::join(record, meta)
            })
            .collect();
        // `sort_by` is stable. `-0.0` and `0.0` tie.
        entries.sort_by(|a, b| {
            b.balance
                .partial_cmp(&a.balance)
                .unwrap_or(CmpOrdering::Equal)
        });
        Self {
            entries,
            refreshed_at: Some(refreshed_at),
        }
    }

    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `None` until the first successful cycle.
    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.refreshed_at
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum RefreshError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("a refresh is already in flight")]
    Busy,
    #[error("refresh result discarded after teardown")]
    Superseded,
}

impl RefreshError {
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "failed",
            Self::Busy => "busy",
            Self::Superseded => "superseded",
        }
    }
}

/// Most recent failed cycle, cleared by the next success.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshFailure {
    pub at: DateTime<Utc>,
    pub kind: &'static str,
    pub message: String,
}

pub struct LeaderboardBuilder<F> {
    fetcher: F,
    metadata: Arc<MetadataIndex>,
    roster: Arc<AddressRoster>,
    published: watch::Sender<Arc<RankedLeaderboard>>,
    last_failure: watch::Sender<Option<RefreshFailure>>,
    /// Held for the whole of a cycle; at most one cycle runs at a time.
    cycle: Mutex<()>,
    epoch: AtomicU64,
}

impl<F: BalanceFetcher> LeaderboardBuilder<F> {
    pub fn new(fetcher: F, metadata: Arc<MetadataIndex>, roster: Arc<AddressRoster>) -> Self {
        let (published, _) = watch::channel(Arc::new(RankedLeaderboard::default()));
        let (last_failure, _) = watch::channel(None);
        Self {
            fetcher,
            metadata,
            roster,
            published,
            last_failure,
            cycle: Mutex::new(()),
            epoch: AtomicU64::new(0),
        }
    }

    /// Run one cycle. Overlapping calls return `Busy` without fetching.
    pub async fn refresh_once(&self) -> Result<Arc<RankedLeaderboard>, RefreshError> {
        let Ok(cycle) = self.cycle.try_lock() else {
            debug!("refresh skipped, previous cycle still running");
            metrics::counter!("leaderboard_refresh_total", "outcome" => "busy").increment(1);
            return Err(RefreshError::Busy);
        };
        self.run_cycle(cycle).await
    }

    /// Discard any cycle in flight, wait for it to finish, then run a fresh
    /// cycle against the current roster.
    pub async fn refresh_superseding(&self) -> Result<Arc<RankedLeaderboard>, RefreshError> {
        self.invalidate();
        let cycle = self.cycle.lock().await;
        self.run_cycle(cycle).await
    }

    async fn run_cycle(
        &self,
        _cycle: MutexGuard<'_, ()>,
    ) -> Result<Arc<RankedLeaderboard>, RefreshError> {
        let epoch = self.epoch.load(Ordering::Acquire);
        let start = Instant::now();
        let addresses = self.roster.snapshot().await;
        let fetched = if addresses.is_empty() {
            Ok(Vec::new())
        } else {
            self.fetcher.fetch_balances(&addresses).await
        };
        metrics::histogram!("leaderboard_refresh_duration_ms")
            .record(start.elapsed().as_secs_f64() * 1000.0);

        let result = match fetched {
            Ok(records) => self.publish(epoch, records),
            Err(e) => self.record_failure(epoch, e),
        };
        if let Err(e) = &result {
            metrics::counter!("leaderboard_refresh_total", "outcome" => e.outcome()).increment(1);
        }
        result
    }

    fn publish(
        &self,
        epoch: u64,
        records: Vec<BalanceRecord>,
    ) -> Result<Arc<RankedLeaderboard>, RefreshError> {
        let returned = records.len();
        let board = Arc::new(RankedLeaderboard::rank(records, &self.metadata, Utc::now()));

        // The epoch check runs under the channel lock, which `invalidate` also takes.
        let published = self.published.send_if_modified(|current| {
            if self.epoch.load(Ordering::Acquire) != epoch {
                return false;
            }
            *current = Arc::clone(&board);
            true
        });
        if !published {
            debug!("discarding refresh result from a torn-down session");
            return Err(RefreshError::Superseded);
        }

        self.last_failure.send_replace(None);
        metrics::counter!("leaderboard_refresh_total", "outcome" => "ok").increment(1);
        metrics::gauge!("leaderboard_entries").set(board.len() as f64);
        info!(entries = returned, "leaderboard refreshed");
        Ok(board)
    }

    fn record_failure(
        &self,
        epoch: u64,
        error: FetchError,
    ) -> Result<Arc<RankedLeaderboard>, RefreshError> {
        if self.epoch.load(Ordering::Acquire) != epoch {
            return Err(RefreshError::Superseded);
        }
        warn!(kind = error.kind(), error = %error, "balance fetch failed, keeping previous leaderboard");
        self.last_failure.send_replace(Some(RefreshFailure {
            at: Utc::now(),
            kind: error.kind(),
            message: error.to_string(),
        }));
        Err(error.into())
    }
}

impl<F> LeaderboardBuilder<F> {
    /// Make every refresh started before this call unable to publish.
    pub fn invalidate(&self) {
        self.published.send_if_modified(|_| {
            self.epoch.fetch_add(1, Ordering::AcqRel);
            false
        });
    }

    pub fn latest(&self) -> Arc<RankedLeaderboard> {
        Arc::clone(&self.published.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<RankedLeaderboard>> {
        self.published.subscribe()
    }

    pub fn last_failure(&self) -> Option<RefreshFailure> {
        self.last_failure.borrow().clone()
    }

    pub fn is_refreshing(&self) -> bool {
        self.cycle.try_lock().is_err()
    }
}
