//! The provider-agnostic feed core.
//!
//! * **`aggregator`**: owns the store and per-provider pagers, calls adapters.
//! * **`pager`**: pagination state and the near-end trigger.
//! * **`playback`**: the single active index.
//! * **`store`**: de-duplicated item sequence.
//! * **`backoff`** / **`event`**: failure pacing and change notifications.

mod aggregator;
mod backoff;
mod event;
mod pager;
mod playback;
mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregator::{
    ErrorRecord, FeedAggregator, FeedAggregatorBuilder, FeedStatus, FetchTicket, LoadOutcome,
    DEFAULT_FETCH_TIMEOUT,
};
pub use backoff::{BackoffPolicy, Verdict};
pub use event::FeedEvent;
pub use pager::{FeedPager, PagerState, DEFAULT_THRESHOLD};
pub use playback::{first_visible, PlaybackCoordinator, VISIBLE_THRESHOLD};
pub use store::{FeedStore, StoreView};
