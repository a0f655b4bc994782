//! YouTube Shorts via SerpApi's YouTube search engine.
//!
//! `GET https://serpapi.com/search.json?engine=youtube&search_query=...` with
//! the key in the `api_key` query parameter.  Continuation uses the `sp`
//! token from `serpapi_pagination.next_page_token`.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::http;
use super::{
    ContentProvider, Engagement, FeedItem, Page, PageToken, ProviderError, ProviderId, ProviderQuery,
};

pub const DEFAULT_ENDPOINT: &str = "https://serpapi.com/search.json";

/// Continuations followed within one fetch while pages contain no shorts.
const MAX_SKIPPED_PAGES: usize = 3;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    video_results: Vec<VideoResult>,
    serpapi_pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoResult {
    title: Option<String>,
    link: Option<String>,
    thumbnail: Option<Thumbnail>,
    channel: Option<Channel>,
    views: Option<Count>,
    #[serde(alias = "duration")]
    length: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Channel {
    name: Option<String>,
    thumbnail: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Thumbnail {
    Url(String),
    Set {
        #[serde(rename = "static")]
        still: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Count {
    Number(u64),
    Text(String),
}

/// Short travel videos found through YouTube search.
pub struct YoutubeShortsProvider {
    id: ProviderId,
    api_key: String,
    max_duration_secs: u32,
    client: Client,
}

impl YoutubeShortsProvider {
    pub fn new(api_key: impl Into<String>, max_duration_secs: u32, timeout: Duration) -> Self {
        Self {
            id: ProviderId::new("youtube"),
            api_key: api_key.into(),
            max_duration_secs,
            client: http::client(timeout),
        }
    }

    /// Map a raw SerpApi body into a [`Page`], keeping only results no
    /// longer than `max_duration_secs`.
    pub fn parse_page(
        body: &str,
        provider: &ProviderId,
        max_duration_secs: u32,
    ) -> Result<Page, ProviderError> {
        let response: SearchResponse = serde_json::from_str(body)?;

        // Results filtered for length are not normalization failures.
        let shorts: Vec<(VideoResult, u32)> = response
            .video_results
            .into_iter()
            .filter_map(|r| {
                let secs = r.length.as_deref().and_then(parse_duration)?;
                (secs <= max_duration_secs).then_some((r, secs))
            })
            .collect();

        let raw = shorts.len();
        let items: Vec<FeedItem> = shorts
            .into_iter()
            .filter_map(|(r, secs)| normalize(r, secs, provider))
            .collect();
        http::check_yield(provider.as_str(), raw, items.len())?;

        let next_cursor = response
            .serpapi_pagination
            .and_then(|p| p.next_page_token)
            .filter(|t| !t.is_empty());

        Ok(Page {
            last: next_cursor.is_none(),
            next_cursor,
            items,
        })
    }
}

fn normalize(result: VideoResult, secs: u32, provider: &ProviderId) -> Option<FeedItem> {
    let video_id = result.link.as_deref().and_then(video_id)?;
    let (name, avatar) = result
        .channel
        .map(|c| (c.name, c.thumbnail))
        .unwrap_or((None, None));
    let thumbnail = result.thumbnail.and_then(|t| match t {
        Thumbnail::Url(url) => Some(url),
        Thumbnail::Set { still } => still,
    });
    let views = result.views.and_then(|v| match v {
        Count::Number(n) => Some(n),
        Count::Text(s) => parse_views(&s),
    });

    Some(
        FeedItem::new(format!("{provider}:{video_id}"), embed_url(&video_id), provider)
            .with_author(name, avatar)
            .with_caption(result.title)
            .with_thumbnail(thumbnail)
            .with_duration(Some(secs))
            .with_engagement(Engagement {
                views,
                ..Engagement::default()
            }),
    )
}

/// Autoplaying, muted embed for a video id.
pub fn embed_url(video_id: &str) -> String {
    format!("https://www.youtube.com/embed/{video_id}?autoplay=1&mute=1")
}

/// Extract the video id from `watch?v=`, `youtu.be/` or `/shorts/` links.
fn video_id(link: &str) -> Option<String> {
    let tail = if let Some((_, rest)) = link.split_once("v=") {
        rest
    } else if let Some((_, rest)) = link.split_once("youtu.be/") {
        rest
    } else if let Some((_, rest)) = link.split_once("/shorts/") {
        rest
    } else {
        return None;
    };
    let id: String = tail
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    (!id.is_empty()).then_some(id)
}

/// `"45"`, `"0:45"` or `"1:02:03"` to seconds.
fn parse_duration(s: &str) -> Option<u32> {
    s.trim()
        .split(':')
        .try_fold(0u32, |acc, part| {
            let n: u32 = part.trim().parse().ok()?;
            acc.checked_mul(60)?.checked_add(n)
        })
}

/// `"12,345 views"`, `"1.2M views"`, `"980K"` to a count.
fn parse_views(s: &str) -> Option<u64> {
    let token = s.split_whitespace().next()?.replace(',', "");
    let (number, multiplier) = match token.chars().last()? {
        'K' | 'k' => (&token[..token.len() - 1], 1_000.0),
        'M' | 'm' => (&token[..token.len() - 1], 1_000_000.0),
        'B' | 'b' => (&token[..token.len() - 1], 1_000_000_000.0),
        _ => (token.as_str(), 1.0),
    };
    let value: f64 = number.parse().ok()?;
    Some((value * multiplier).round() as u64)
}

#[async_trait]
impl ContentProvider for YoutubeShortsProvider {
    fn id(&self) -> &ProviderId {
        &self.id
    }

    async fn fetch_page(

        &self,

        query: &ProviderQuery,

        token: &PageToken,

    ) -> Result<Page, ProviderError> {
        let first = self.search(query, token.cursor.as_deref()).await?;
        skip_filtered_pages(first, MAX_SKIPPED_PAGES, move |cursor: String| async move {
            self.search(query, Some(&cursor)).await
        })
        .await
    }
}

impl YoutubeShortsProvider {
    async fn search(
        &self,
        query: &ProviderQuery,
        cursor: Option<&str>,
    ) -> Result<Page, ProviderError> {
        let mut params = vec![
            ("engine", "youtube".to_string()),
            ("search_query", search_query(query)),
            ("api_key", self.api_key.clone()),
        ];
        if let Some(cursor) = cursor {
            params.push(("sp", cursor.to_string()));
        }
        let body = http::get_text(self.client.get(DEFAULT_ENDPOINT).query(&params)).await?;
        Self::parse_page(&body, &self.id, self.max_duration_secs)
    }
}

/// The term with `shorts` appended, so search favours short results.
fn search_query(query: &ProviderQuery) -> String {
    let term = query.term().trim();
    if term.to_lowercase().contains("shorts") {
        term.to_string()
    } else {
        format!("{term} shorts")
    }
}

/// Follow continuations past pages whose results were all filtered out.
///
/// An empty page means "exhausted" to the pager, so one is only returned
/// when upstream has no continuation or `max_hops` pages in a row held
/// nothing short enough.
async fn skip_filtered_pages<F, Fut>(
    mut page: Page,
    max_hops: usize,
    mut next: F,
) -> Result<Page, ProviderError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<Page, ProviderError>>,
{
    for _ in 0..max_hops {
        if !page.items.is_empty() {
            return Ok(page);
        }
        let Some(cursor) = page.next_cursor.take() else {
            return Ok(page);
        };
        tracing::debug!(%cursor, "no shorts on page, following continuation");
        page = next(cursor).await?;
    }
    if page.items.is_empty() && page.next_cursor.is_some() {
        tracing::info!(
            max_hops,
            "no shorts found in consecutive pages, treating search as exhausted"
        );
    }
    Ok(page)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
