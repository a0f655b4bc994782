//! Media RSS provider (video podcasts, travel vlogs published as feeds).
//!
//! This module shows how to implement [`ContentProvider`] for a source that
//! has no server-side search or paging.  Use it as a template when adding
//! support for Atom or JSON Feed.
//!
//! The whole channel is one page: page 1 returns every item with a playable
//! `<enclosure>` and is marked as the last page.  The query narrows the
//! channel client-side by matching the term against titles and categories.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::http;
use super::{ContentProvider, FeedItem, Page, PageToken, ProviderError, ProviderId, ProviderQuery};

/// An RSS feed whose items carry media enclosures.
pub struct RssMediaProvider {
    id: ProviderId,
    /// The feed URL to fetch.
    url: String,
    client: Client,
}

impl RssMediaProvider {
    /// Create a new RSS media provider.
    ///
    /// # Arguments
    ///
    /// * `url`: full URL of the RSS feed.
    /// * `label`: provider id stamped on items from this feed (must be
    ///   unique among configured providers).
    pub fn new(url: impl Into<String>, label: impl AsRef<str>, timeout: Duration) -> Self {
        Self {
            id: ProviderId::new(label),
            url: url.into(),
            client: http::client(timeout),
        }
    }

    /// Parse an already-fetched [`rss::Channel`] into a single last [`Page`].
    ///
    /// This is a pure function (no I/O) so that tests can exercise the
    /// parsing logic without hitting the network.
    pub fn parse_channel(
        channel: &rss::Channel,
        provider: &ProviderId,
        query: &ProviderQuery,
    ) -> Result<Page, ProviderError> {
        let matching: Vec<&rss::Item> = channel
            .items()
            .iter()
            .filter(|item| matches_query(item, query))
            .collect();

        let raw = matching.len();
        let items: Vec<FeedItem> = matching
            .into_iter()
            .filter_map(|item| normalize(item, channel, provider))
            .collect();
        http::check_yield(provider.as_str(), raw, items.len())?;

        Ok(Page::last(items))
    }
}

fn matches_query(item: &rss::Item, query: &ProviderQuery) -> bool {
    let term = query.term().trim().trim_start_matches('#').to_lowercase();
    if term.is_empty() {
        return true;
    }
    let in_title = item
        .title()
        .is_some_and(|t| t.to_lowercase().contains(&term));
    let in_categories = item
        .categories()
        .iter()
        .any(|c| c.name().to_lowercase().contains(&term));
    in_title || in_categories
}

fn normalize(item: &rss::Item, channel: &rss::Channel, provider: &ProviderId) -> Option<FeedItem> {
    let media_url = item
        .enclosure()
        .map(|e| e.url().trim().to_string())
        .filter(|u| !u.is_empty())?;

    // Prefer <guid>, fall back to <link>, then a hash of the enclosure.
    let id = item
        .guid()
        .map(|g| g.value().to_string())
        .or_else(|| item.link().map(String::from))
        .filter(|id| !id.trim().is_empty())
        .map(|native| format!("{provider}:{native}"))
        .unwrap_or_else(|| FeedItem::synthesize_id(provider, &[&media_url]));

    let author = item
        .author()
        .map(String::from)
        .or_else(|| Some(channel.title().to_string()));
    let avatar = channel.image().map(|i| i.url().to_string());

    Some(
        FeedItem::new(id, media_url, provider)
            .with_author(author, avatar)
            .with_caption(item.title().map(String::from)),
    )
}

#[async_trait]
impl ContentProvider for RssMediaProvider {
    fn id(&self) -> &ProviderId {
        &self.id
    }

    async fn fetch_page(

        &self,

        query: &ProviderQuery,

        token: &PageToken,

    ) -> Result<Page, ProviderError> {
        if token.page > 1 {
            return Ok(Page::last(Vec::new()));
        }
        let body = http::get_text(self.client.get(&self.url)).await?;
        let channel = rss::Channel::read_from(body.as_bytes())
            .map_err(|e| ProviderError::malformed(format!("invalid RSS: {e}")))?;
        Self::parse_channel(&channel, &self.id, query)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ErrorKind;

    const XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Slow Travel TV</title>
    <link>https://slow.example</link>
    <description>Vlogs</description>
    <item>
      <title>Travel diary: Lisbon</title>
      <guid>ep-1</guid>
      <enclosure url="https://slow.example/1.mp4" length="100" type="video/mp4"/>
    </item>
    <item>
      <title>Travel diary: no video</title>
      <guid>ep-2</guid>
    </item>
    <item>
      <title>Packing list</title>
      <category>travel</category>
      <link>https://slow.example/3</link>
      <enclosure url="https://slow.example/3.mp4" length="100" type="video/mp4"/>
    </item>
    <item>
      <title>Cooking at home</title>
      <enclosure url="https://slow.example/4.mp4" length="100" type="video/mp4"/>
    </item>
  </channel>
</rss>"#;

    fn channel() -> rss::Channel {
        rss::Channel::read_from(XML.as_bytes()).unwrap()
    }

    #[test]
    fn parse_channel_extracts_enclosures() {
        let p = ProviderId::new("slowtv");
        let page = RssMediaProvider::parse_channel(&channel(), &p, &ProviderQuery::Search("travel".into())).unwrap();

        assert!(page.last);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].id, "slowtv:ep-1");
        assert_eq!(page.items[0].media_url, "https://slow.example/1.mp4");
        assert_eq!(page.items[0].caption, "Travel diary: Lisbon");
        assert_eq!(page.items[0].author_name, "Slow Travel TV");
    }

    #[test]
    fn falls_back_to_link_when_no_guid() {
        let p = ProviderId::new("slowtv");
        let page = RssMediaProvider::parse_channel(&channel(), &p, &ProviderQuery::Search("travel".into())).unwrap();
        assert_eq!(page.items[1].id, "slowtv:https://slow.example/3");
    }

    #[test]
    fn empty_term_keeps_everything_playable() {
        let p = ProviderId::new("slowtv");
        let page = RssMediaProvider::parse_channel(&channel(), &p, &ProviderQuery::Search(String::new())).unwrap();
        assert_eq!(page.items.len(), 3);
        assert!(page.items[2].id.starts_with("slowtv:"));
    }

    #[test]
    fn matching_items_without_enclosures_are_malformed() {
        let p = ProviderId::new("slowtv");
        let err = RssMediaProvider::parse_channel(&channel(), &p, &ProviderQuery::Search("no video".into()))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Malformed);
    }

    #[tokio::test]
    async fn later_pages_are_empty() {
        let src = RssMediaProvider::new("http://127.0.0.1:9/feed", "slowtv", Duration::from_secs(1));
        let page = src
            .fetch_page(&ProviderQuery::default(), &PageToken { page: 2, cursor: None })
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert!(page.last);
    }

    #[test]
    fn id_returns_label() {
        let src = RssMediaProvider::new("http://example.com/feed", "My Feed", Duration::from_secs(1));
        assert_eq!(src.id().as_str(), "My Feed");
    }
}
