//! The core data type shared across all content providers.
//!
//! `FeedItem` represents a single playable reel from any provider (stock
//! footage, video search, social media scrape, media RSS).  Every adapter
//! converts its native records into `FeedItem`s so the rest of the crate can
//! stay provider-agnostic.
//!
//! ## For contributors
//!
//! If you are adding a new provider you do **not** need to modify this file
//! unless the provider exposes a genuinely new field.  Construct items with
//! [`FeedItem::new`] and the `with_*` builders inside your adapter.

use std::fmt;
use std::sync::Arc;

use sha2::{Digest, Sha256};

/// Name of the adapter that produced an item (e.g. `"pexels"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProviderId(Arc<str>);

impl ProviderId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Social counters.  Providers that omit a counter report zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Engagement {
    pub likes: u64,
    pub comments: u64,
    pub views: Option<u64>,
}

/// A single reel, normalised from any content provider.
///
/// Items are built once by an adapter and never modified afterwards; the
/// feed store hands them out as `Arc<FeedItem>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    /// Unique identifier used for de-duplication and list keys.
    ///
    /// Adapters prefix the provider's native id with the provider name, or
    /// call [`FeedItem::synthesize_id`] when the upstream record has none.
    pub id: String,

    /// Playable resource URL.
    pub media_url: String,

    pub author_name: String,
    pub author_avatar_url: Option<String>,

    /// Caption or title text; may be empty.
    pub caption: String,

    pub engagement: Engagement,
    pub location: Option<String>,
    pub soundtrack: Option<String>,
    pub thumbnail_url: Option<String>,
    pub duration_secs: Option<u32>,

    /// Which adapter produced this item.
    pub source_provider: ProviderId,
}

impl FeedItem {
    /// Minimal item; author defaults to `"unknown"`, everything optional empty.
    pub fn new(id: impl Into<String>, media_url: impl Into<String>, provider: &ProviderId) -> Self {
        Self {
            id: id.into(),
            media_url: media_url.into(),
            author_name: "unknown".into(),
            author_avatar_url: None,
            caption: String::new(),
            engagement: Engagement::default(),
            location: None,
            soundtrack: None,
            thumbnail_url: None,
            duration_secs: None,
            source_provider: provider.clone(),
        }
    }

    pub fn with_author(mut self, name: Option<String>, avatar_url: Option<String>) -> Self {
        if let Some(name) = non_empty(name) {
            self.author_name = name;
        }
        self.author_avatar_url = non_empty(avatar_url);
        self
    }

    pub fn with_caption(mut self, caption: Option<String>) -> Self {
        self.caption = caption.unwrap_or_default().trim().to_string();
        self
    }

    pub fn with_engagement(mut self, engagement: Engagement) -> Self {
        self.engagement = engagement;
        self
    }

    pub fn with_location(mut self, location: Option<String>) -> Self {
        self.location = non_empty(location);
        self
    }

    pub fn with_soundtrack(mut self, soundtrack: Option<String>) -> Self {
        self.soundtrack = non_empty(soundtrack);
        self
    }

    pub fn with_thumbnail(mut self, url: Option<String>) -> Self {
        self.thumbnail_url = non_empty(url);
        self
    }

    pub fn with_duration(mut self, secs: Option<u32>) -> Self {
        self.duration_secs = secs;
        self
    }

    /// Deterministic id for records that carry no native identifier.
    ///
    /// Hashing the same parts always yields the same id, so refetching the
    /// same upstream record deduplicates cleanly.
    pub fn synthesize_id(provider: &ProviderId, parts: &[&str]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(provider.as_str().as_bytes());
        for part in parts {
            hasher.update([0u8]);
            hasher.update(part.as_bytes());
        }
        let digest = hasher.finalize();
        let hex: String = digest.iter().take(8).map(|b| format!("{b:02x}")).collect();
        format!("{provider}:{hex}")
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Compact counter for display: `999`, `1.2K`, `3.4M`.
pub fn format_count(n: u64) -> String {
    match n {
        0..=999 => n.to_string(),
        1_000..=999_999 => trim_decimal(n as f64 / 1_000.0, "K"),
        1_000_000..=999_999_999 => trim_decimal(n as f64 / 1_000_000.0, "M"),
        _ => trim_decimal(n as f64 / 1_000_000_000.0, "B"),
    }
}

fn trim_decimal(v: f64, suffix: &str) -> String {
    let s = format!("{:.1}", (v * 10.0).floor() / 10.0);
    format!("{}{suffix}", s.trim_end_matches(".0"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
