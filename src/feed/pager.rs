//! Per-provider pagination state and the "near the end" trigger.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::aggregator::{FeedAggregator, LoadOutcome};
use super::backoff::Verdict;
use crate::source::PageToken;

/// Remaining-item count at or below which the pager asks for more.
pub const DEFAULT_THRESHOLD: usize = 5;

/// Where one provider's pagination stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagerState {
    /// Next page to fetch, starting at 1.
    pub page: u32,
    /// Continuation token returned with the previous page.
    pub cursor: Option<String>,
    /// False once the provider ran dry; only a reset brings it back.
    pub has_more: bool,
    /// A fetch for this provider is outstanding.
    pub in_flight: bool,
    pub consecutive_failures: u32,
    /// Retries are suppressed until this instant.
    pub retry_at: Option<Instant>,
}

impl Default for PagerState {
    fn default() -> Self {
        Self {
            page: 1,
            cursor: None,
            has_more: true,
            in_flight: false,
            consecutive_failures: 0,
            retry_at: None,
        }
    }
}

impl PagerState {
    /// Whether a fetch may be dispatched at `now`.
    pub fn can_fetch(&self, now: Instant) -> bool {
        self.has_more && !self.in_flight && self.retry_at.map_or(true, |at| now >= at)
    }

    pub fn token(&self) -> PageToken {
        PageToken {
            page: self.page,
            cursor: self.cursor.clone(),
        }
    }

    /// Advance past a page that yielded `received` items.
    pub(crate) fn record_success(
        &mut self,
        received: usize,
        next_cursor: Option<String>,
        last: bool,
    ) {
        self.consecutive_failures = 0;
        self.retry_at = None;
        if received == 0 {
            self.has_more = false;
            return;
        }
        self.page += 1;
        self.cursor = next_cursor;
        self.has_more = !last;
    }

    /// Apply the backoff verdict for a failed fetch; page and cursor stay put.
    pub(crate) fn record_failure(&mut self, verdict: Verdict, now: Instant) {
        self.consecutive_failures += 1;
        match verdict {
            Verdict::RetryNow => self.retry_at = None,
            Verdict::RetryAfter(delay) => self.retry_at = Some(now + delay),
            Verdict::GiveUp => {
                self.retry_at = None;
                self.has_more = false;
            }
        }
    }
}

/// Turns the UI's "N items left below the viewport" signal into fetches.
#[derive(Debug, Clone)]
pub struct FeedPager {
    aggregator: Arc<FeedAggregator>,
    threshold: usize,
    runtime: Handle,
}

impl FeedPager {
    /// Must be called from inside a Tokio runtime; fetches are spawned on it.
    pub fn new(aggregator: Arc<FeedAggregator>, threshold: usize) -> Self {
        Self {
            aggregator,
            threshold,
            runtime: Handle::current(),
        }
    }

    pub fn aggregator(&self) -> &Arc<FeedAggregator> {
        &self.aggregator
    }

    /// Dispatch a page fetch for every provider that can take one.
    ///
    /// The in-flight flag is set before this returns, so a second call made
    /// while fetches are pending dispatches nothing.  Dropping the returned
    /// handles detaches the fetches.
    pub fn on_approaching_end(&self, remaining: usize) -> Vec<JoinHandle<LoadOutcome>> {
        if remaining > self.threshold {
            return Vec::new();
        }

        let handles: Vec<JoinHandle<LoadOutcome>> = self
            .aggregator
            .provider_ids()
            .iter()
            .filter_map(|id| self.aggregator.begin_fetch(id))
            .map(|ticket| {
                let aggregator = Arc::clone(&self.aggregator);
                self.runtime.spawn(async move { aggregator.complete(ticket).await })
            })
            .collect();

        if !handles.is_empty() {
            tracing::debug!(remaining, dispatched = handles.len(), "near end of feed");
        }
        handles
    }
}
