//! Click count aggregation
//!
//! Walks the shortening service's link list newest-first, one page at a
//! time, using the last id of each page as the exclusive-start cursor of
//! the next. The walk is a two-state machine: `HasMore` until a page comes
//! back empty, the expected number of links has been fetched, or the
//! cursor stops advancing, then `Exhausted`.
//!
//! The expected total bounds links, not pages: the provider may cap a page
//! below the requested limit, so `ceil(expected_total / page_size)` pages
//! can fall short. With full pages the walk makes exactly that many
//! requests. Without an expected total, the empty page that ends the list
//! is the only stop signal. Short pages never end the walk.

use super::{LinkPageQuery, LinkShortener, ShortenerError};
use crate::models::LinkStat;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why the walk ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Fetched at least `expected_total` links
    TotalReached,
    /// Provider returned no items
    EmptyPage,
    /// Provider returned a page ending at the cursor just used
    NoProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerState {
    HasMore,
    Exhausted(StopReason),
}

/// Cursor pagination state
///
/// The cursor only moves in [`Pager::record_page`], which the caller invokes
/// after a page was retrieved successfully.
#[derive(Debug, Clone)]
pub struct Pager {
    page_size: u32,
    expected_total: Option<u64>,
    cursor: Option<String>,
    pages_fetched: u64,
    items_fetched: u64,
    state: PagerState,
}

impl Pager {
    /// `None` for `page_size == 0`
    pub fn new(expected_total: Option<u64>, page_size: u32) -> Option<Self> {
        if page_size == 0 {
            return None;
        }
        let state = match expected_total {
            Some(0) => PagerState::Exhausted(StopReason::TotalReached),
            _ => PagerState::HasMore,
        };
        Some(Self {
            page_size,
            expected_total,
            cursor: None,
            pages_fetched: 0,
            items_fetched: 0,
            state,
        })
    }

    pub fn state(&self) -> PagerState {
        self.state
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn pages_fetched(&self) -> u64 {
        self.pages_fetched
    }

    /// Items returned by the provider so far, relisted ones included
    pub fn items_fetched(&self) -> u64 {
        self.items_fetched
    }

    /// Pages needed when every page is full
    pub fn planned_pages(&self) -> Option<u64> {
        self.expected_total
            .map(|total| total.div_ceil(u64::from(self.page_size)))
    }

    /// Query for the next page, `None` once exhausted
    pub fn next_query(&self) -> Option<LinkPageQuery> {
        match self.state {
            PagerState::HasMore => Some(self.query()),
            PagerState::Exhausted(_) => None,
        }
    }

    fn query(&self) -> LinkPageQuery {
        LinkPageQuery {
            limit: self.page_size,
            last: self.cursor.clone(),
        }
    }

    /// Advance past a successfully fetched page
    pub fn record_page(&mut self, page: &[LinkStat]) {
        if let PagerState::Exhausted(_) = self.state {
            return;
        }
        self.pages_fetched += 1;
        self.items_fetched += page.len() as u64;

        match page.last() {
            None => {
                self.state = PagerState::Exhausted(StopReason::EmptyPage);
                return;
            }
            Some(last) if self.cursor.as_deref() == Some(last.id.as_str()) => {
                self.state = PagerState::Exhausted(StopReason::NoProgress);
                return;
            }
            Some(last) => self.cursor = Some(last.id.clone()),
        }

        if self
            .expected_total
            .is_some_and(|total| self.items_fetched >= total)
        {
            self.state = PagerState::Exhausted(StopReason::TotalReached);
        }
    }
}

/// Aggregation failures
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("Page size must be at least 1")]
    InvalidPageSize,

    /// A page could not be fetched; the run is abandoned
    #[error("Fetching page {page} failed after collecting {collected} links: {source}")]
    Page {
        page: u64,
        collected: usize,
        #[source]
        source: ShortenerError,
    },
}

/// Result of one aggregation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateReport {
    /// One entry per link, newest first
    pub links: Vec<LinkStat>,
    pub pages_fetched: u64,
    pub stop: StopReason,
}

/// Click Aggregator
pub struct ClickAggregator {
    shortener: Arc<dyn LinkShortener>,
}

impl ClickAggregator {
    pub fn new(shortener: Arc<dyn LinkShortener>) -> Self {
        Self { shortener }
    }

    /// Collect click counts for every link the provider lists
    ///
    /// Counts are the values at fetch time. A link that reappears later in
    /// the same walk (provider ordering shifted mid-run) is skipped.
    pub async fn aggregate(
        &self,
        expected_total: Option<u64>,
        page_size: u32,
    ) -> Result<AggregateReport, AggregateError> {
        let mut pager =
            Pager::new(expected_total, page_size).ok_or(AggregateError::InvalidPageSize)?;
        let mut links: Vec<LinkStat> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        info!(
            expected_total = ?expected_total,
            page_size,
            planned_pages = ?pager.planned_pages(),
            "Aggregating link clicks"
        );

        let stop = loop {
            let query = match pager.state() {
                PagerState::Exhausted(reason) => break reason,
                PagerState::HasMore => pager.query(),
            };

            let page = self
                .shortener
                .list_links(&query)
                .await
                .map_err(|source| AggregateError::Page {
                    page: pager.pages_fetched() + 1,
                    collected: links.len(),
                    source,
                })?;

            debug!(
                page = pager.pages_fetched() + 1,
                items = page.len(),
                cursor = ?query.last,
                "Fetched link page"
            );

            pager.record_page(&page);

            for link in page {
                if seen.insert(link.id.clone()) {
                    links.push(link);
                } else {
                    warn!(link_id = %link.id, "Link listed twice, keeping first");
                }
            }
        };

        info!(
            links = links.len(),
            pages = pager.pages_fetched(),
            stop = ?stop,
            "Aggregation complete"
        );

        Ok(AggregateReport {
            links,
            pages_fetched: pager.pages_fetched(),
            stop,
        })
    }
}
