use crate::builder::RankedLeaderboard;
use chrono::{DateTime, Utc};
use common::types::LeaderboardEntry;
use serde::Serialize;
use std::num::NonZeroUsize;

/// `ceil(len / page_size)`, zero for an empty list.
pub fn total_pages(len: usize, page_size: NonZeroUsize) -> usize {
    len.div_ceil(page_size.get())
}

/// Clamp into `[1, max(total_pages, 1)]`.
pub fn clamp_page(page_number: usize, total_pages: usize) -> usize {
    page_number.clamp(1, total_pages.max(1))
}

/// A window over a ranked list. Borrowed, never stored across refreshes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Page<'a> {
    pub items: &'a [LeaderboardEntry],
    pub page_number: usize,
    pub total_pages: usize,
    pub page_size: NonZeroUsize,
}

impl<'a> Page<'a> {
    /// 1-based rank of the first item on this page. Page `0` is read as page `1`.
    pub fn first_rank(&self) -> usize {
        self.page_number.saturating_sub(1) * self.page_size.get() + 1
    }

    pub fn has_next(&self) -> bool {
        self.page_number < self.total_pages
    }

    pub fn has_prev(&self) -> bool {
        self.page_number > 1
    }

    pub fn ranked(&self) -> impl Iterator<Item = (usize, &'a LeaderboardEntry)> + '_ {
        let first = self.first_rank();
        self.items.iter().enumerate().map(move |(i, e)| (first + i, e))
    }
}

/// Slice `entries` for `page_number`, clamping out-of-range requests.
pub fn page(entries: &[LeaderboardEntry], page_number: usize, page_size: NonZeroUsize) -> Page<'_> {
    let total = total_pages(entries.len(), page_size);
    let page_number = clamp_page(page_number, total);
    let start = ((page_number - 1) * page_size.get()).min(entries.len());
    let end = (start + page_size.get()).min(entries.len());
    Page {
        items: &entries[start..end],
        page_number,
        total_pages: total,
        page_size,
    }
}

/// The caller's position in the leaderboard, kept across refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    page_number: usize,
    page_size: NonZeroUsize,
}

impl PageCursor {
    pub fn new(page_size: NonZeroUsize) -> Self {
        Self {
            page_number: 1,
            page_size,
        }
    }

    pub fn page_number(&self) -> usize {
        self.page_number
    }

    pub fn page_size(&self) -> NonZeroUsize {
        self.page_size
    }

    pub fn go_to(&mut self, page_number: usize, total_pages: usize) {
        self.page_number = clamp_page(page_number, total_pages);
    }

    /// No-op on the last page.
    pub fn next(&mut self, total_pages: usize) {
        self.go_to(self.page_number.saturating_add(1), total_pages);
    }

    /// No-op on page 1.
    pub fn prev(&mut self, total_pages: usize) {
        self.go_to(self.page_number.saturating_sub(1), total_pages);
    }

    /// Re-clamp against `board` and slice the current page. A shrinking board
    /// pulls the cursor down rather than leaving it on an empty page.
    pub fn view<'a>(&mut self, board: &'a RankedLeaderboard) -> Page<'a> {
        let total = total_pages(board.len(), self.page_size);
        self.page_number = clamp_page(self.page_number, total);
        page(board.entries(), self.page_number, self.page_size)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedRow {
    pub rank: usize,
    #[serde(flatten)]
    pub entry: LeaderboardEntry,
}

/// Owned, serializable copy of a [`Page`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageView {
    pub page_number: usize,
    pub total_pages: usize,
    pub page_size: usize,
    pub has_next: bool,
    pub has_prev: bool,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub rows: Vec<RankedRow>,
}

impl PageView {
    pub fn from_page(page: &Page<'_>, refreshed_at: Option<DateTime<Utc>>) -> Self {
        Self {
            page_number: page.page_number,
            total_pages: page.total_pages,
            page_size: page.page_size.get(),
            has_next: page.has_next(),
            has_prev: page.has_prev(),
            refreshed_at,
            rows: page
                .ranked()
                .map(|(rank, entry)| RankedRow {
                    rank,
                    entry: entry.clone(),
                })
                .collect(),
        }
    }
}
