//! Scripted in-memory provider for exercising the feed core.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::source::{
    ContentProvider, FeedItem, Page, PageToken, ProviderError, ProviderId, ProviderQuery,
};

pub enum Step {
    Page(Page),
    Fail(ProviderError),
    /// Wait for the notify before returning the page.
    Gated(Arc<Notify>, Page),
    /// Never resolve.
    Hang,
}

/// Replays `Step`s in order, then serves empty pages.
pub struct ScriptedProvider {
    id: ProviderId,
    script: Mutex<VecDeque<Step>>,
    tokens: Mutex<Vec<PageToken>>,
}

impl ScriptedProvider {
    pub fn new(id: &str, steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            id: ProviderId::new(id),
            script: Mutex::new(steps.into()),
            tokens: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.tokens.lock().len()
    }

    pub fn tokens(&self) -> Vec<PageToken> {
        self.tokens.lock().clone()
    }
}

#[async_trait]
impl ContentProvider for ScriptedProvider {
    fn id(&self) -> &ProviderId {
        &self.id
    }

    async fn fetch_page(

        &self,

        _query: &ProviderQuery,

        token: &PageToken,

    ) -> Result<Page, ProviderError> {
        self.tokens.lock().push(token.clone());
        let step = self.script.lock().pop_front();
        match step {
            None => Ok(Page::new(Vec::new())),
            Some(Step::Page(page)) => Ok(page),
            Some(Step::Fail(err)) => Err(err),
            Some(Step::Gated(gate, page)) => {
                gate.notified().await;
                Ok(page)
            }
            Some(Step::Hang) => std::future::pending().await,
        }
    }
}

/// Items `"<provider>:<id>"` stamped with `provider`.
pub fn items(provider: &str, ids: &[&str]) -> Vec<FeedItem> {
    let p = ProviderId::new(provider);
    ids.iter()
        .map(|id| {
            FeedItem::new(
                format!("{provider}:{id}"),
                format!("https://media/{provider}/{id}.mp4"),
                &p,
            )
        })
        .collect()
}
