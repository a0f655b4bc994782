//! Instagram hashtag reels through the RapidAPI "instagram-best-experience"
//! scraper.
//!
//! The response nests media inside `data.sections[].layout_content.medias[]`.
//! Continuation uses `data.next_max_id`; `more_available = false` ends the feed.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::http;
use super::{
    ContentProvider, Engagement, FeedItem, Page, PageToken, ProviderError, ProviderId, ProviderQuery,
};

pub const DEFAULT_HOST: &str = "instagram-best-experience.p.rapidapi.com";

#[derive(Debug, Deserialize)]
struct HashtagResponse {
    data: Option<SectionData>,
}

#[derive(Debug, Deserialize)]
struct SectionData {
    #[serde(default)]
    sections: Vec<Section>,
    next_max_id: Option<String>,
    more_available: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct Section {
    layout_content: Option<LayoutContent>,
}

#[derive(Debug, Deserialize)]
struct LayoutContent {
    #[serde(default)]
    medias: Vec<MediaWrapper>,
}

#[derive(Debug, Deserialize)]
struct MediaWrapper {
    id: Option<String>,
    media: Option<Media>,
}

#[derive(Debug, Deserialize)]
struct Media {
    id: Option<String>,
    #[serde(default)]
    video_versions: Vec<VideoVersion>,
    user: Option<User>,
    caption: Option<Caption>,
    like_count: Option<u64>,
    comment_count: Option<u64>,
    play_count: Option<u64>,
    location: Option<Location>,
    clips_metadata: Option<ClipsMetadata>,
    image_versions2: Option<ImageVersions>,
}

#[derive(Debug, Deserialize)]
struct VideoVersion {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct User {
    username: Option<String>,
    profile_pic_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Caption {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Location {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClipsMetadata {
    music_info: Option<MusicInfo>,
}

#[derive(Debug, Deserialize)]
struct MusicInfo {
    music_asset_info: Option<MusicAssetInfo>,
}

#[derive(Debug, Deserialize)]
struct MusicAssetInfo {
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImageVersions {
    #[serde(default)]
    candidates: Vec<VideoVersion>,
}

/// Hashtag clips scraped from Instagram.
pub struct InstagramReelsProvider {
    id: ProviderId,
    api_key: String,
    count: u32,
    client: Client,
}

impl InstagramReelsProvider {
    pub fn new(api_key: impl Into<String>, count: u32, timeout: Duration) -> Self {
        Self {
            id: ProviderId::new("instagram"),
            api_key: api_key.into(),
            count: count.max(1),
            client: http::client(timeout),
        }
    }

    /// Map a raw `hashtag_section` body into a [`Page`].
    pub fn parse_page(body: &str, provider: &ProviderId) -> Result<Page, ProviderError> {
        let response: HashtagResponse = serde_json::from_str(body)?;
        let Some(data) = response.data else {
            tracing::warn!(%provider, "no sections in response");
            return Ok(Page::last(Vec::new()));
        };

        let medias: Vec<MediaWrapper> = data
            .sections
            .into_iter()
            .filter_map(|s| s.layout_content)
            .flat_map(|l| l.medias)
            .collect();
        let raw = medias.len();
        let items: Vec<FeedItem> = medias
            .into_iter()
            .filter_map(|m| normalize(m, provider))
            .collect();
        http::check_yield(provider.as_str(), raw, items.len())?;

        let next_cursor = data.next_max_id.filter(|c| !c.is_empty());
        let last = data.more_available == Some(false) || next_cursor.is_none();
        Ok(Page {
            items,
            next_cursor,
            last,
        })
    }
}

fn normalize(wrapper: MediaWrapper, provider: &ProviderId) -> Option<FeedItem> {
    let media = wrapper.media?;
    let media_url = media
        .video_versions
        .into_iter()
        .find_map(|v| v.url.filter(|u| !u.is_empty()))?;

    let (username, avatar) = media
        .user
        .map(|u| (u.username, u.profile_pic_url))
        .unwrap_or((None, None));
    let caption = media.caption.and_then(|c| c.text);
    let soundtrack = media
        .clips_metadata
        .and_then(|c| c.music_info)
        .and_then(|m| m.music_asset_info)
        .and_then(|a| a.title);
    let thumbnail = media
        .image_versions2
        .and_then(|i| i.candidates.into_iter().find_map(|c| c.url));

    let id = match wrapper.id.or(media.id).filter(|id| !id.is_empty()) {
        Some(native) => format!("{provider}:{native}"),
        None => FeedItem::synthesize_id(
            provider,
            &[
                &media_url,
                username.as_deref().unwrap_or_default(),
                caption.as_deref().unwrap_or_default(),
            ],
        ),
    };

    Some(
        FeedItem::new(id, media_url, provider)
            .with_author(username, avatar)
            .with_caption(caption)
            .with_engagement(Engagement {
                likes: media.like_count.unwrap_or(0),
                comments: media.comment_count.unwrap_or(0),
                views: media.play_count,
            })
            .with_location(media.location.and_then(|l| l.name))
            .with_soundtrack(soundtrack)
            .with_thumbnail(thumbnail),
    )
}

#[async_trait]
impl ContentProvider for InstagramReelsProvider {
    fn id(&self) -> &ProviderId {
        &self.id
    }

    async fn fetch_page(

        &self,

        query: &ProviderQuery,

        token: &PageToken,

    ) -> Result<Page, ProviderError> {
        let mut params = vec![
            ("tag", query.as_hashtag()),
            ("section", "clips".to_string()),
            ("count", self.count.to_string()),
        ];
        if let Some(cursor) = &token.cursor {
            params.push(("max_id", cursor.clone()));
        }
        let request = self
            .client
            .get(format!("https://{DEFAULT_HOST}/hashtag_section"))
            .header("x-rapidapi-key", &self.api_key)
            .header("x-rapidapi-host", DEFAULT_HOST)
            .query(&params);
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
      "data": {
        "sections": [
          {
            "layout_type": "media_grid",
            "layout_content": {
              "medias": [
                {
                  "id": "3101_77",
                  "media": {
                    "video_versions": [ { "url": "https://ig/3101.mp4" } ],
                    "user": { "username": "nomad", "profile_pic_url": "https://ig/nomad.jpg" },
                    "caption": { "text": "Sunrise at Bromo" },
                    "like_count": 1200,
                    "comment_count": 45,
                    "play_count": 90000,
                    "location": { "name": "Mount Bromo" },
                    "clips_metadata": { "music_info": { "music_asset_info": { "title": "Golden Hour" } } }
                  }
                },
                {
                  "media": {
                    "video_versions": [ { "url": "https://ig/anon.mp4" } ]
                  }
                },
                { "media": { "caption": { "text": "photo post" } } }
              ]
            }
          },
          { "layout_type": "header" }
        ],
        "next_max_id": "QVFE",
        "more_available": true
      }
    }"#;

    #[test]
    fn parse_page_maps_nested_media() {
        let p = ProviderId::new("instagram");
        let page = InstagramReelsProvider::parse_page(BODY, &p).unwrap();

        assert_eq!(page.items.len(), 2, "photo without video is skipped");
        assert_eq!(page.next_cursor.as_deref(), Some("QVFE"));
        assert!(!page.last);

        let reel = &page.items[0];
        assert_eq!(reel.id, "instagram:3101_77");
        assert_eq!(reel.media_url, "https://ig/3101.mp4");
        assert_eq!(reel.author_name, "nomad");
        assert_eq!(reel.caption, "Sunrise at Bromo");
        assert_eq!(reel.engagement, Engagement { likes: 1200, comments: 45, views: Some(90000) });
        assert_eq!(reel.location.as_deref(), Some("Mount Bromo"));
        assert_eq!(reel.soundtrack.as_deref(), Some("Golden Hour"));
    }

    #[test]
    fn missing_ids_are_synthesized_deterministically() {
        let p = ProviderId::new("instagram");
        let a = InstagramReelsProvider::parse_page(BODY, &p).unwrap();
        let b = InstagramReelsProvider::parse_page(BODY, &p).unwrap();

        let anon = &a.items[1];
        assert!(anon.id.starts_with("instagram:"));
        assert_eq!(anon.id, b.items[1].id);
        assert_eq!(anon.author_name, "unknown");
        assert_eq!(anon.engagement, Engagement::default());
    }

    #[test]
    fn no_data_is_empty_last_page() {
        let page = InstagramReelsProvider::parse_page(r#"{ "status": "ok" }"#, &ProviderId::new("instagram")).unwrap();
        assert!(page.items.is_empty());
        assert!(page.last);
    }

    #[test]
    fn more_available_false_marks_last() {
        let body = r#"{ "data": { "sections": [], "next_max_id": "X", "more_available": false } }"#;
        let page = InstagramReelsProvider::parse_page(body, &ProviderId::new("instagram")).unwrap();
        assert!(page.last);
    }

    #[test]
    fn only_photos_is_malformed() {
        let body = r#"{ "data": { "sections": [ { "layout_content": { "medias": [ { "media": {} } ] } } ] } }"#;
        let err = InstagramReelsProvider::parse_page(body, &ProviderId::new("instagram")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Malformed);
    }
}
