//! A viewer's session: the published leaderboard, the refresh schedule
//! feeding it, and the page the viewer is looking at.

use crate::builder::{LeaderboardBuilder, RankedLeaderboard, RefreshError, RefreshFailure};
use crate::pagination::{total_pages, PageCursor, PageView};
use crate::roster::{AddressRoster, RosterError, RosterMode};
use crate::scheduler::{IntervalTicks, RefreshScheduler, SchedulerError, TickSource};
use chrono::{DateTime, Utc};
use common::balance_api::BalanceFetcher;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub refreshed_at: Option<DateTime<Utc>>,
    pub entries: usize,
    pub refreshing: bool,
    pub scheduler_running: bool,
    pub roster_mode: RosterMode,
    pub roster_size: usize,
    pub page_number: usize,
    pub last_failure: Option<RefreshFailure>,
}

pub struct LeaderboardSession<F> {
    builder: Arc<LeaderboardBuilder<F>>,
    roster: Arc<AddressRoster>,
    cursor: Mutex<PageCursor>,
    scheduler: Mutex<RefreshScheduler>,
    interval: Duration,
}

impl<F> LeaderboardSession<F>
where
    F: BalanceFetcher + Send + Sync + 'static,
{
    pub fn new(
        builder: Arc<LeaderboardBuilder<F>>,
        roster: Arc<AddressRoster>,
        page_size: NonZeroUsize,
        interval: Duration,
    ) -> Self {
        Self {
            builder,
            roster,
            cursor: Mutex::new(PageCursor::new(page_size)),
            scheduler: Mutex::new(RefreshScheduler::new("leaderboard_refresh")),
            interval,
        }
    }

    /// Refresh now and then on every interval.
    pub async fn start(&self) -> Result<(), SchedulerError> {
        self.start_with(IntervalTicks::new(self.interval)).await
    }

    pub async fn start_with<T: TickSource>(&self, ticks: T) -> Result<(), SchedulerError> {
        let builder = Arc::clone(&self.builder);
        self.scheduler.lock().await.start_with(ticks, move || {
            let builder = Arc::clone(&builder);
            async move {
                // Failures are already logged and recorded by the builder.
                if let Err(e) = builder.refresh_once().await {
                    debug!(outcome = e.outcome(), "scheduled refresh did not publish");
                }
            }
        })
    }

    /// Stop the schedule and discard any refresh still waiting on the network.
    pub async fn teardown(&self) {
        self.scheduler.lock().await.stop();
        self.builder.invalidate();
        info!("leaderboard session torn down");
    }

    pub async fn manual_refresh(&self) -> Result<PageView, RefreshError> {
        self.builder.refresh_once().await?;
        Ok(self.current_page().await)
    }

    /// Replace a user-entered roster and refresh against it right away.
    /// A cycle still fetching for the old roster is discarded and waited out.
    pub async fn enter_addresses(&self, text: &str) -> Result<usize, RosterError> {
        let count = self.roster.enter(text).await?;
        if let Err(e) = self.builder.refresh_superseding().await {
            debug!(outcome = e.outcome(), "refresh after roster change did not publish");
        }
        Ok(count)
    }

    pub async fn current_page(&self) -> PageView {
        self.navigate(|_, _| {}).await
    }

    pub async fn go_to_page(&self, page_number: usize) -> PageView {
        self.navigate(|cursor, total| cursor.go_to(page_number, total))
            .await
    }

    pub async fn next_page(&self) -> PageView {
        self.navigate(PageCursor::next).await
    }

    pub async fn prev_page(&self) -> PageView {
        self.navigate(PageCursor::prev).await
    }

    async fn navigate(&self, step: impl FnOnce(&mut PageCursor, usize)) -> PageView {
        let board: Arc<RankedLeaderboard> = self.builder.latest();
        let mut cursor = self.cursor.lock().await;
        let total = total_pages(board.len(), cursor.page_size());
        step(&mut *cursor, total);
        let page = cursor.view(&board);
        drop(cursor);
        PageView::from_page(&page, board.refreshed_at())
    }

    pub async fn status(&self) -> SessionStatus {
        let board = self.builder.latest();
        let scheduler_running = self.scheduler.lock().await.is_running();
        let page_number = self.cursor.lock().await.page_number();
        SessionStatus {
            refreshed_at: board.refreshed_at(),
            entries: board.len(),
            refreshing: self.builder.is_refreshing(),
            scheduler_running,
            roster_mode: self.roster.mode(),
            roster_size: self.roster.len().await,
            page_number,
            last_failure: self.builder.last_failure(),
        }
    }

    pub fn builder(&self) -> &LeaderboardBuilder<F> {
        &self.builder
    }
}
