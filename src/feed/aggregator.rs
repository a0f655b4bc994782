//! The feed aggregator: sole owner of the store and the per-provider pagers.
//!
//! A fetch is split in two halves so that the caller can set the in-flight
//! flag synchronously and push the network work onto a task:
//!
//! ```text
//! begin_fetch(provider) ──► FetchTicket ──► complete(ticket).await ──► LoadOutcome
//!   (locks, checks pager,                     (adapter call under a timeout,
//!    marks in flight)                          epoch check, dedup + append)
//! ```
//!
//! Every ticket remembers the epoch it was issued under.  `reset` bumps the
//! epoch, so a response that lands after a reset is recognised and dropped
//! instead of leaking into the new session.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::backoff::{BackoffPolicy, Verdict};
use super::event::{EventBus, FeedEvent};
use super::pager::PagerState;
use super::playback::PlaybackCoordinator;
use super::store::{FeedStore, StoreView};
use crate::source::{ContentProvider, PageToken, ProviderError, ProviderId, ProviderQuery};

/// Deadline applied to every adapter call.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(12);

/// Result of one `load_next_page` / `complete` call.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// The pager refused: in flight, exhausted, backing off, or unknown provider.
    Skipped,
    /// A page arrived.
    Loaded { received: usize, appended: usize },
    /// The provider returned an empty page.
    Exhausted,
    Failed(ProviderError),
    /// The feed was reset while this fetch was outstanding.
    Stale,
}

/// The most recent provider failure, kept for the status line.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorRecord {
    pub provider: ProviderId,
    pub error: ProviderError,
    pub at: DateTime<Utc>,
}

/// Point-in-time summary for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedStatus {
    pub epoch: u64,
    pub query: ProviderQuery,
    pub items: usize,
    /// Providers with a fetch outstanding.
    pub loading: usize,
    /// Every provider has run dry (or given up).
    pub exhausted: bool,
    pub last_error: Option<ErrorRecord>,
}

impl FeedStatus {
    pub fn is_loading(&self) -> bool {
        self.loading > 0
    }
}

#[derive(Debug)]
struct Session {
    epoch: u64,
    query: ProviderQuery,
    pagers: HashMap<ProviderId, PagerState>,
    last_error: Option<ErrorRecord>,
}

impl Session {
    fn exhausted(&self) -> bool {
        self.pagers.values().all(|p| !p.has_more)
    }
}

/// Clears the in-flight flag if the fetch is dropped before completing
/// (task aborted, runtime shut down, panic inside the adapter).
struct InFlightGuard {
    session: Arc<Mutex<Session>>,
    provider: ProviderId,
    epoch: u64,
    armed: bool,
}

impl InFlightGuard {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut session = self.session.lock();
        if session.epoch == self.epoch {
            if let Some(pager) = session.pagers.get_mut(&self.provider) {
                pager.in_flight = false;
            }
        }
    }
}

/// Permission to run one fetch, handed out by [`FeedAggregator::begin_fetch`].
pub struct FetchTicket {
    provider: Arc<dyn ContentProvider>,
    query: ProviderQuery,
    token: PageToken,
    guard: InFlightGuard,
}

/// Builder for [`FeedAggregator`].
pub struct FeedAggregatorBuilder {
    query: ProviderQuery,
    providers: Vec<Arc<dyn ContentProvider>>,
    fetch_timeout: Duration,
    backoff: BackoffPolicy,
}

impl FeedAggregatorBuilder {
    pub fn provider(mut self, provider: Arc<dyn ContentProvider>) -> Self {
        if self.providers.iter().any(|p| p.id() == provider.id()) {
            tracing::warn!(provider = %provider.id(), "duplicate provider id ignored");
            return self;
        }
        self.providers.push(provider);
        self
    }

    pub fn providers(self, providers: impl IntoIterator<Item = Arc<dyn ContentProvider>>) -> Self {
        providers.into_iter().fold(self, |b, p| b.provider(p))
    }

    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn backoff(mut self, policy: BackoffPolicy) -> Self {
        self.backoff = policy;
        self
    }

    pub fn build(self) -> Arc<FeedAggregator> {
        let store = Arc::new(RwLock::new(FeedStore::new()));
        let playback = PlaybackCoordinator::new(StoreView::new(Arc::clone(&store)));
        let pagers = self
            .providers
            .iter()
            .map(|p| (p.id().clone(), PagerState::default()))
            .collect();

        Arc::new(FeedAggregator {
            provider_ids: self.providers.iter().map(|p| p.id().clone()).collect(),
            providers: self.providers,
            session: Arc::new(Mutex::new(Session {
                epoch: 0,
                query: self.query,
                pagers,
                last_error: None,
            })),
            store,
            playback,
            fetch_timeout: self.fetch_timeout,
            backoff: self.backoff,
            events: EventBus::default(),
        })
    }
}

/// Bridges pager requests to provider adapters and owns the resulting feed.
///
/// Lock order is session → store → active index everywhere; no lock is held
/// across an `.await`.
pub struct FeedAggregator {
    providers: Vec<Arc<dyn ContentProvider>>,
    provider_ids: Vec<ProviderId>,
    session: Arc<Mutex<Session>>,
    store: Arc<RwLock<FeedStore>>,
    playback: PlaybackCoordinator,
    fetch_timeout: Duration,
    backoff: BackoffPolicy,
    events: EventBus,
}

impl std::fmt::Debug for FeedAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedAggregator")
            .field("providers", &self.provider_ids)
            .field("fetch_timeout", &self.fetch_timeout)
            .finish_non_exhaustive()
    }
}

impl FeedAggregator {
    pub fn builder(query: ProviderQuery) -> FeedAggregatorBuilder {
        FeedAggregatorBuilder {
            query,
            providers: Vec::new(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            backoff: BackoffPolicy::default(),
        }
    }

    /// Configured providers, in configuration order.
    pub fn provider_ids(&self) -> &[ProviderId] {
        &self.provider_ids
    }

    pub fn store(&self) -> StoreView {
        StoreView::new(Arc::clone(&self.store))
    }

    pub fn playback(&self) -> &PlaybackCoordinator {
        &self.playback
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<FeedEvent> {
        self.events.subscribe()
    }

    pub fn pager_state(&self, provider: &ProviderId) -> Option<PagerState> {
        self.session.lock().pagers.get(provider).cloned()
    }

    pub fn epoch(&self) -> u64 {
        self.session.lock().epoch
    }

    pub fn query(&self) -> ProviderQuery {
        self.session.lock().query.clone()
    }

    /// No provider has anything left for the current query.
    pub fn is_exhausted(&self) -> bool {
        self.session.lock().exhausted()
    }

    pub fn status(&self) -> FeedStatus {
        let session = self.session.lock();
        let items = self.store.read().len();
        FeedStatus {
            epoch: session.epoch,
            query: session.query.clone(),
            items,
            loading: session.pagers.values().filter(|p| p.in_flight).count(),
            exhausted: session.exhausted(),
            last_error: session.last_error.clone(),
        }
    }

    /// Reserve the next page of `provider`, marking it in flight.
    ///
    /// Returns `None` without side effects when the provider is unknown,
    /// already in flight, exhausted, or inside a backoff window.
    pub fn begin_fetch(&self, provider: &ProviderId) -> Option<FetchTicket> {
        let adapter = self.providers.iter().find(|p| p.id() == provider)?;
        let mut session = self.session.lock();
        let epoch = session.epoch;
        let query = session.query.clone();
        let pager = session.pagers.get_mut(provider)?;
        if !pager.can_fetch(Instant::now()) {
            tracing::trace!(
                %provider,
                in_flight = pager.in_flight,
                has_more = pager.has_more,
                "fetch not started"
            );
            return None;
        }
        pager.in_flight = true;
        let token = pager.token();
        tracing::debug!(%provider, page = token.page, epoch, "fetching page");

        Some(FetchTicket {
            provider: Arc::clone(adapter),
            query,
            token,
            guard: InFlightGuard {
                session: Arc::clone(&self.session),
                provider: provider.clone(),
                epoch,
                armed: true,
            },
        })
    }

    /// Run the adapter call for `ticket` and fold the result into the feed.
    pub async fn complete(&self, mut ticket: FetchTicket) -> LoadOutcome {
        let result = match tokio::time::timeout(
            self.fetch_timeout,
            ticket.provider.fetch_page(&ticket.query, &ticket.token),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ProviderError::timeout(self.fetch_timeout)),
        };

        let provider = ticket.provider.id().clone();
        let epoch = ticket.guard.epoch;
        let mut session = self.session.lock();
        ticket.guard.disarm();

        if session.epoch != epoch {
            tracing::debug!(%provider, epoch, current = session.epoch, "discarding stale response");
            self.events.emit(FeedEvent::Discarded { provider, epoch });
            return LoadOutcome::Stale;
        }

        let Some(pager) = session.pagers.get_mut(&provider) else {
            return LoadOutcome::Skipped;
        };
        pager.in_flight = false;

        match result {
            Ok(page) => {
                let received = page.items.len();
                let appended = if received > 0 {
                    self.store.write().append_new(page.items)
                } else {
                    0
                };
                pager.record_success(received, page.next_cursor, page.last);
                let has_more = pager.has_more;

                if received == 0 {
                    tracing::info!(%provider, "provider exhausted");
                    self.events.emit(FeedEvent::Exhausted { provider });
                    return LoadOutcome::Exhausted;
                }

                tracing::info!(%provider, received, appended, has_more, "page loaded");
                self.events.emit(FeedEvent::Loaded {
                    provider: provider.clone(),
                    received,
                    appended,
                });
                if !has_more {
                    self.events.emit(FeedEvent::Exhausted { provider });
                }
                LoadOutcome::Loaded { received, appended }
            }
            Err(error) => {
                let failures = pager.consecutive_failures + 1;
                let verdict = self.backoff.on_failure(failures, &error);
                pager.record_failure(verdict, Instant::now());
                let gave_up = verdict == Verdict::GiveUp;

                tracing::warn!(%provider, %error, failures, ?verdict, "provider fetch failed");
                session.last_error = Some(ErrorRecord {
                    provider: provider.clone(),
                    error: error.clone(),
                    at: Utc::now(),
                });
                self.events.emit(FeedEvent::Failed {
                    provider,
                    error: error.clone(),
                    gave_up,
                });
                LoadOutcome::Failed(error)
            }
        }
    }

    /// `begin_fetch` and `complete` in one call.
    pub async fn load_next_page(&self, provider: &ProviderId) -> LoadOutcome {
        match self.begin_fetch(provider) {
            Some(ticket) => self.complete(ticket).await,
            None => LoadOutcome::Skipped,
        }
    }

    /// Start over with `query`: new epoch, empty store, fresh pagers, nothing active.
    ///
    /// Outstanding fetches are not awaited; they notice the epoch change when
    /// they complete and discard their results.
    pub fn reset(&self, query: ProviderQuery) {
        let mut session = self.session.lock();
        session.epoch += 1;
        session.query = query.clone();
        session.last_error = None;
        for pager in session.pagers.values_mut() {
            *pager = PagerState::default();
        }
        {
            let mut store = self.store.write();
            store.clear();
            self.playback.clear();
        }
        let epoch = session.epoch;
        tracing::info!(epoch, %query, "feed reset");
        self.events.emit(FeedEvent::Reset { epoch, query });
    }
}
