use std::sync::Arc;

use ratatui::widgets::ListState;

use reelscroll::feed::{FeedEvent, FeedPager, FeedStatus};
use reelscroll::source::FeedItem;

pub struct App {
    pager: FeedPager,
    /// Snapshot of the feed store, refreshed every tick.
    pub items: Vec<Arc<FeedItem>>,
    /// List selection state for scrolling.  The selected row is the
    /// "visible" reel.
    pub list_state: ListState,
    /// Whether the user has requested to quit.
    pub quit: bool,
    /// Last event message.
    pub status: String,
    pub feed: FeedStatus,
}

impl App {
    pub fn new(pager: FeedPager) -> Self {
        let feed = pager.aggregator().status();
        Self {
            pager,
            items: Vec::new(),
            list_state: ListState::default(),
            quit: false,
            status: "Starting…".into(),
            feed,
        }
    }

    pub fn pager(&self) -> &FeedPager {
        &self.pager
    }

    pub fn is_active(&self, index: usize) -> bool {
        self.pager.aggregator().playback().is_active(index)
    }

    /// Kick off the first page from every provider.
    pub fn start(&mut self) {
        self.pager.on_approaching_end(0);
    }

    /// Pull the latest store snapshot and status from the aggregator.
    pub fn refresh(&mut self) {
        let aggregator = self.pager.aggregator();
        self.items = aggregator.store().snapshot();
        self.feed = aggregator.status();

        match self.list_state.selected() {
            None if !self.items.is_empty() => self.select(0),
            Some(i) if i >= self.items.len() => {
                self.list_state.select(None);
            }
            _ => {}
        }
    }

    /// Turn a feed event into a status-line message.
    pub fn on_event(&mut self, event: FeedEvent) {
        self.status = match event {
            FeedEvent::Loaded {
                provider, appended, ..
            } => format!("{provider}: +{appended}"),
            FeedEvent::Exhausted { provider } => format!("{provider}: no more results"),
            FeedEvent::Failed {
                provider,
                error,
                gave_up: true,
            } => format!("{provider}: {error} (gave up, r to retry)"),
            FeedEvent::Failed { provider, error, .. } => format!("{provider}: {error}"),
            FeedEvent::Discarded { .. } => return,
            FeedEvent::Reset { query, .. } => format!("Loading {query}"),
        };
    }

    /// Start the current query over.
    pub fn reset(&mut self) {
        let aggregator = self.pager.aggregator();
        aggregator.reset(aggregator.query());
        self.list_state.select(None);
        self.items.clear();
        self.start();
    }

    // -- navigation ----------------------------------------------------------

    fn select(&mut self, index: usize) {
        self.list_state.select(Some(index));
        self.pager.aggregator().playback().report_visible(index);
        let remaining = self.items.len().saturating_sub(index + 1);
        self.pager.on_approaching_end(remaining);
    }

    pub fn select_next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => (i + 1).min(self.items.len() - 1),
            None => 0,
        };
        self.select(i);
    }

    pub fn select_previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.select(i);
    }

    pub fn select_first(&mut self) {
        if !self.items.is_empty() {
            self.select(0);
        }
    }

    pub fn select_last(&mut self) {
        if !self.items.is_empty() {
            self.select(self.items.len() - 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use reelscroll::feed::FeedAggregator;
    use reelscroll::source::{
        ContentProvider, Engagement, Page, PageToken, ProviderError, ProviderId, ProviderQuery,
    };

    /// Serves `pages[token.page - 1]`, then empty pages.
    struct PagedProvider {
        id: ProviderId,
        pages: Vec<Result<Page, ProviderError>>,
    }

    #[async_trait]
    impl ContentProvider for PagedProvider {
        fn id(&self) -> &ProviderId {
            &self.id
        }

        async fn fetch_page(

            &self,

            _: &ProviderQuery,

            token: &PageToken,

        ) -> Result<Page, ProviderError> {
            self.pages
                .get(token.page as usize - 1)
                .cloned()
                .unwrap_or_else(|| Ok(Page::new(Vec::new())))
        }
    }

    fn reel(n: usize) -> FeedItem {
        FeedItem::new(format!("test:{n}"), format!("https://m/{n}.mp4"), &ProviderId::new("test"))
            .with_author(Some(format!("user{n}")), None)
            .with_caption(Some(format!("Reel number {n}")))
            .with_engagement(Engagement {
                likes: 1_200,
                comments: 3,
                views: None,
            })
    }

    fn page(range: std::ops::Range<usize>) -> Result<Page, ProviderError> {
        Ok(Page::new(range.map(reel).collect()))
    }

    fn app_with(pages: Vec<Result<Page, ProviderError>>) -> App {
        let provider = Arc::new(PagedProvider {
            id: ProviderId::new("test"),
            pages,
        });
        let aggregator = FeedAggregator::builder(ProviderQuery::Search("travel".into()))
            .provider(provider)
            .build();
        App::new(FeedPager::new(aggregator, 5))
    }

    /// Let spawned fetches finish, then refresh.
    async fn settle(app: &mut App) {
        for _ in 0..100 {
            tokio::task::yield_now().await;
            if app.pager.aggregator().status().loading == 0 {
                break;
            }
        }
        app.refresh();
    }

    fn render(app: &mut App) -> String {
        let backend = TestBackend::new(100, 24);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| crate::ui::draw(app, f)).unwrap();
        let buf = terminal.backend().buffer().clone();
        buf.content().iter().map(|c| c.symbol()).collect()
    }

    // -- construction --------------------------------------------------------

    #[tokio::test]
    async fn new_app_starts_empty() {
        let app = app_with(Vec::new());
        assert!(app.items.is_empty());
        assert!(!app.quit);
        assert!(app.list_state.selected().is_none());
    }

    // -- loading -------------------------------------------------------------

    #[tokio::test]
    async fn start_loads_first_page_and_activates_first_reel() {
        let mut app = app_with(vec![page(0..3)]);
        app.start();
        settle(&mut app).await;

        assert_eq!(app.items.len(), 3);
        assert_eq!(app.list_state.selected(), Some(0));
        assert!(app.is_active(0));
    }

    #[tokio::test]
    async fn moving_near_end_fetches_next_page() {
        let mut app = app_with(vec![page(0..8), page(8..16)]);
        app.start();
        settle(&mut app).await;
        assert_eq!(app.items.len(), 8);

        // 8 items, threshold 5: index 1 leaves 6 below, index 2 leaves 5.
        app.select_next();
        settle(&mut app).await;
        assert_eq!(app.items.len(), 8);

        app.select_next();
        settle(&mut app).await;
        assert_eq!(app.items.len(), 16);
        assert!(app.is_active(2));
    }

    #[tokio::test]
    async fn end_of_feed_is_reported() {
        let mut app = app_with(vec![page(0..2)]);
        app.start();
        settle(&mut app).await;
        app.select_last();
        settle(&mut app).await;

        assert!(app.feed.exhausted);
        assert!(render(&mut app).contains("end of feed"));
    }

    #[tokio::test]
    async fn reset_clears_and_reloads() {
        let mut app = app_with(vec![page(0..3)]);
        app.start();
        settle(&mut app).await;
        app.select_last();
        assert!(app.is_active(2));

        app.reset();
        assert!(app.items.is_empty());
        assert!(app.list_state.selected().is_none());
        assert!(!app.is_active(2));
        settle(&mut app).await;

        let ids: Vec<&str> = app.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["test:0", "test:1", "test:2"]);
        assert_eq!(app.feed.epoch, 1);
        assert!(app.is_active(0));
    }

    #[tokio::test]
    async fn events_update_status_line() {
        let mut app = app_with(vec![Err(ProviderError::auth_failed("HTTP 401"))]);
        let mut events = app.pager().aggregator().subscribe();
        app.start();
        settle(&mut app).await;

        while let Ok(event) = events.try_recv() {
            app.on_event(event);
        }
        assert!(app.status.starts_with("test:"), "{}", app.status);
        assert!(app.feed.last_error.is_some());
    }

    // -- navigation ----------------------------------------------------------

    #[tokio::test]
    async fn select_next_on_empty_is_noop() {
        let mut app = app_with(Vec::new());
        app.select_next();
        app.select_previous();
        app.select_first();
        app.select_last();
        assert!(app.list_state.selected().is_none());
    }

    #[tokio::test]
    async fn selection_clamps_and_moves_active_marker() {
        let mut app = app_with(vec![page(0..3)]);
        app.start();
        settle(&mut app).await;

        app.select_previous();
        assert_eq!(app.list_state.selected(), Some(0));

        app.select_last();
        app.select_next();
        assert_eq!(app.list_state.selected(), Some(2));
        assert!(app.is_active(2));
        assert!(!app.is_active(0));

        app.select_previous();
        assert!(app.is_active(1));
    }

    // -- rendering (smoke tests) ---------------------------------------------

    #[tokio::test]
    async fn draw_does_not_panic_with_no_items() {
        let mut app = app_with(Vec::new());
        render(&mut app);
    }

    #[tokio::test]
    async fn draw_shows_items_and_active_marker() {
        let mut app = app_with(vec![page(0..3)]);
        app.start();
        settle(&mut app).await;

        let text = render(&mut app);
        assert!(text.contains("3 items"), "status bar should show item count");
        assert!(text.contains("▶"));
        assert!(text.contains("@user0"));
        assert!(text.contains("1.2K"));
    }
}
