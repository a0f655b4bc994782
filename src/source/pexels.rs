//! Pexels stock-footage adapter.
//!
//! `GET https://api.pexels.com/videos/search` with the API key in the
//! `Authorization` header.  Pages are numbered; the response carries a
//! `next_page` URL only while more results exist.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::http;
use super::{ContentProvider, FeedItem, Page, PageToken, ProviderError, ProviderId, ProviderQuery};

pub const DEFAULT_ENDPOINT: &str = "https://api.pexels.com/videos/search";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    videos: Vec<Video>,
    next_page: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Video {
    id: Option<u64>,
    image: Option<String>,
    duration: Option<u32>,
    user: Option<User>,
    #[serde(default)]
    video_files: Vec<VideoFile>,
}

#[derive(Debug, Deserialize)]
struct User {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoFile {
    link: Option<String>,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
}

/// Stock travel footage from Pexels.
pub struct PexelsProvider {
    id: ProviderId,
    api_key: String,
    per_page: u32,
    client: Client,
}

impl PexelsProvider {
    pub fn new(api_key: impl Into<String>, per_page: u32, timeout: Duration) -> Self {
        Self {
            id: ProviderId::new("pexels"),
            api_key: api_key.into(),
            per_page: per_page.max(1),
            client: http::client(timeout),
        }
    }

    /// Map a raw search response body into a [`Page`].
    ///
    /// Pure function (no I/O) so tests can feed it canned JSON.
    pub fn parse_page(body: &str, provider: &ProviderId) -> Result<Page, ProviderError> {
        let response: SearchResponse = serde_json::from_str(body)?;
        let raw = response.videos.len();
        let items: Vec<FeedItem> = response
            .videos
            .into_iter()
            .filter_map(|video| normalize(video, provider))
            .collect();
        http::check_yield(provider.as_str(), raw, items.len())?;

        Ok(Page {
            last: response.next_page.is_none(),
            next_cursor: None,
            items,
        })
    }
}

fn normalize(video: Video, provider: &ProviderId) -> Option<FeedItem> {
    let media_url = best_rendition(&video.video_files)?;
    let id = match video.id {
        Some(id) => format!("{provider}:{id}"),
        None => FeedItem::synthesize_id(provider, &[&media_url]),
    };
    // Pexels exposes a profile page but no avatar image.
    let name = video.user.and_then(|u| u.name);

    Some(
        FeedItem::new(id, media_url, provider)
            .with_author(name, None)
            .with_thumbnail(video.image)
            .with_duration(video.duration),
    )
}

/// Tallest portrait rendition, or the first rendition when none is portrait.
fn best_rendition(files: &[VideoFile]) -> Option<String> {
    let usable = files.iter().filter(|f| f.link.as_deref().is_some_and(|l| !l.is_empty()));
    usable
        .clone()
        .filter(|f| f.height > f.width)
        .max_by_key(|f| f.height)
        .or_else(|| usable.clone().next())
        .and_then(|f| f.link.clone())
}

#[async_trait]
impl ContentProvider for PexelsProvider {
    fn id(&self) -> &ProviderId {
        &self.id
    }

    async fn fetch_page(

        &self,

        query: &ProviderQuery,

        token: &PageToken,

    ) -> Result<Page, ProviderError> {
        let request = self
            .client
            .get(DEFAULT_ENDPOINT)
            .header("Authorization", &self.api_key)
            .query(&[
                ("query", query.term().to_string()),
                ("orientation", "portrait".into()),
                ("size", "medium".into()),
                ("page", token.page.to_string()),
                ("per_page", self.per_page.to_string()),
            ]);
        let body = http::get_text(request).await?;
        Self::parse_page(&body, &self.id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ErrorKind;

    const BODY: &str = r#"{
      "page": 1,
      "per_page": 3,
      "videos": [
        {
          "id": 101,
          "image": "https://images.pexels.com/101.jpg",
          "duration": 14,
          "user": { "name": "Ana", "url": "https://www.pexels.com/@ana" },
          "video_files": [
            { "link": "https://v/101-land.mp4", "quality": "hd", "width": 1920, "height": 1080 },
            { "link": "https://v/101-sd.mp4", "quality": "sd", "width": 540, "height": 960 },
            { "link": "https://v/101-hd.mp4", "quality": "hd", "width": 1080, "height": 1920 }
          ]
        },
        {
          "id": 102,
          "video_files": [
            { "link": "https://v/102-land.mp4", "width": 1280, "height": 720 }
          ]
        },
        { "id": 103, "video_files": [] }
      ],
      "next_page": "https://api.pexels.com/videos/search?page=2"
    }"#;

    #[test]
    fn parse_page_picks_tallest_portrait() {
        let p = ProviderId::new("pexels");
        let page = PexelsProvider::parse_page(BODY, &p).unwrap();

        assert_eq!(page.items.len(), 2, "record without files is skipped");
        assert!(!page.last);

        let first = &page.items[0];
        assert_eq!(first.id, "pexels:101");
        assert_eq!(first.media_url, "https://v/101-hd.mp4");
        assert_eq!(first.author_name, "Ana");
        assert_eq!(first.duration_secs, Some(14));
        assert_eq!(first.thumbnail_url.as_deref(), Some("https://images.pexels.com/101.jpg"));
        assert_eq!(first.source_provider, p);
    }

    #[test]
    fn falls_back_to_first_rendition() {
        let page = PexelsProvider::parse_page(BODY, &ProviderId::new("pexels")).unwrap();
        assert_eq!(page.items[1].media_url, "https://v/102-land.mp4");
        assert_eq!(page.items[1].author_name, "unknown");
    }

    #[test]
    fn missing_next_page_marks_last() {
        let body = r#"{ "videos": [ { "id": 1, "video_files": [ { "link": "https://v/1.mp4" } ] } ] }"#;
        let page = PexelsProvider::parse_page(body, &ProviderId::new("pexels")).unwrap();
        assert!(page.last);
    }

    #[test]
    fn empty_result_is_empty_page() {
        let page = PexelsProvider::parse_page(r#"{ "videos": [] }"#, &ProviderId::new("pexels")).unwrap();
        assert!(page.items.is_empty());
    }

    #[test]
    fn all_records_unusable_is_malformed() {
        let body = r#"{ "videos": [ { "id": 1 }, { "id": 2, "video_files": [ { "link": "" } ] } ] }"#;
        let err = PexelsProvider::parse_page(body, &ProviderId::new("pexels")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Malformed);
    }
}
