//! Content provider abstraction layer.
//!
//! This module defines the [`ContentProvider`] trait and the canonical
//! [`FeedItem`] type.  Concrete provider adapters live in sub-modules, one per
//! upstream API.
//!
//! ## For contributors: adding a new provider
//!
//! 1. Create a new file in this directory (e.g. `vimeo.rs`).
//! 2. Define a struct holding the HTTP client and credentials and implement
//!    [`ContentProvider`] for it.  Keep the JSON → [`FeedItem`] mapping in a
//!    pure `parse_*` function so it can be tested without the network.
//! 3. Add `mod vimeo;` below and re-export your struct in the `pub use` block.
//! 4. Add a variant to [`crate::config::ProviderConfig`] so it can be selected
//!    from the config file.
//!
//! The aggregator, pager, playback coordinator and UI are all provider-agnostic.

mod error;
mod feed_item;
mod http;
mod instagram;
mod pexels;
mod rss;
mod youtube;

pub use error::{ErrorKind, ProviderError};
pub use feed_item::{format_count, Engagement, FeedItem, ProviderId};
pub use instagram::InstagramReelsProvider;
pub use pexels::PexelsProvider;
pub use rss::RssMediaProvider;
pub use youtube::YoutubeShortsProvider;

use std::fmt;

use async_trait::async_trait;

/// What the user asked the feed to show.
///
/// Each adapter interprets the descriptor in its own terms: a search API uses
/// the term as-is, a hashtag API strips spaces and a leading `#`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProviderQuery {
    Search(String),
    Hashtag(String),
    Category(String),
}

impl ProviderQuery {
    /// The raw term, whatever the flavour.
    pub fn term(&self) -> &str {
        match self {
            ProviderQuery::Search(t) | ProviderQuery::Hashtag(t) | ProviderQuery::Category(t) => t,
        }
    }

    /// The term folded into a single hashtag (`"travel shorts"` → `"travelshorts"`).
    pub fn as_hashtag(&self) -> String {
        self.term()
            .trim_start_matches('#')
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase()
    }
}

impl Default for ProviderQuery {
    fn default() -> Self {
        ProviderQuery::Search("travel".into())
    }
}

impl fmt::Display for ProviderQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderQuery::Search(t) => write!(f, "{t}"),
            ProviderQuery::Hashtag(t) => write!(f, "#{}", t.trim_start_matches('#')),
            ProviderQuery::Category(t) => write!(f, "[{t}]"),
        }
    }
}

/// Position in a provider's result set.
///
/// `page` always counts up from 1.  Cursor-paginated providers additionally
/// receive the continuation token they handed back with the previous page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageToken {
    pub page: u32,
    pub cursor: Option<String>,
}

impl PageToken {
    pub fn first() -> Self {
        Self { page: 1, cursor: None }
    }
}

/// One page of normalized results.
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Normalized items in upstream order.  Empty means the provider is exhausted.
    pub items: Vec<FeedItem>,
    /// Continuation token for the next request, if the provider uses cursors.
    pub next_cursor: Option<String>,
    /// The provider said explicitly that nothing follows this page.
    pub last: bool,
}

impl Page {
    pub fn new(items: Vec<FeedItem>) -> Self {
        Self {
            items,
            next_cursor: None,
            last: false,
        }
    }

    pub fn last(items: Vec<FeedItem>) -> Self {
        Self {
            items,
            next_cursor: None,
            last: true,
        }
    }
}

/// Trait that every content provider adapter must implement.
///
/// The aggregator calls [`fetch_page()`](ContentProvider::fetch_page) from
/// Tokio tasks, possibly for several providers at once, so implementations
/// must be [`Send`] + [`Sync`] and must not keep per-request state.
///
/// ## Implementing a new provider
///
/// ```ignore
/// pub struct MyProvider { id: ProviderId, client: reqwest::Client }
///
/// #[async_trait]
/// impl ContentProvider for MyProvider {
///     fn id(&self) -> &ProviderId { &self.id }
///
///     async fn fetch_page(&self, query: &ProviderQuery, token: &PageToken)
///         -> Result<Page, ProviderError>
///     {
///         // One GET, then map the body into FeedItem values.
///         todo!()
///     }
/// }
/// ```
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Identifier stamped on every item this provider produces.
    fn id(&self) -> &ProviderId;

    /// Fetch and normalize one page.
    ///
    /// Transport and HTTP failures come back as [`ProviderError`]; individual
    /// records that cannot be normalized are skipped instead.
    async fn fetch_page(&self, query: &ProviderQuery, token: &PageToken)
        -> Result<Page, ProviderError>;
}
