//! reelscroll: an endless reel feed for the terminal.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌────────────┐ FeedEvent  ┌──────────┐  draw()  ┌──────────┐
//! │ aggregator │ ─────────► │  app.rs  │ ───────► │  ui.rs   │
//! │  (tokio)   │ (channel)  │ (state)  │          │ (render) │
//! └────────────┘            └──────────┘          └──────────┘
//!       ▲                        ▲  │
//!       │ on_approaching_end     │  │ report_visible
//!       └────────────────────────┼──┘
//!                                │ handle_key_event()
//!                           ┌──────────┐
//!                           │ input.rs │
//!                           └──────────┘
//! ```
//!
//! * **`reelscroll` (lib)**: providers, aggregator, pager, playback.
//! * **`app`**: selection, store snapshot, status line.
//! * **`ui`**: pure rendering: reads `App` state and draws widgets.
//! * **`input`**: maps key events to `App` mutations.
//! * **`main`**: wires everything together: config, logging, terminal,
//!   and the event loop.

mod app;
mod input;
mod ui;

use std::fs::File;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;
use reelscroll::config::Config;
use reelscroll::feed::{FeedAggregator, FeedPager};

/// Where tracing output goes; the terminal itself belongs to the UI.
const LOG_FILE: &str = "reelscroll.log";

// ---------------------------------------------------------------------------
// RAII terminal guard
// ---------------------------------------------------------------------------

/// Enters raw mode and the alternate screen on construction and restores
/// both on drop, including during unwinding.
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalGuard {
    fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Restore the terminal before the panic message is printed.
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(info);
    }));
}

fn init_tracing() -> Result<()> {
    let file = File::create(LOG_FILE).with_context(|| format!("creating {LOG_FILE}"))?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("reelscroll=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
        .init();
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing()?;
    install_panic_hook();

    // -- configuration -------------------------------------------------------
    let config = Config::load().context("loading configuration")?;
    let term = std::env::args().nth(1);
    let query = config.feed.query(term.as_deref());
    let providers = config
        .build_providers(|name| std::env::var(name).ok())
        .context("configuring content providers")?;
    tracing::info!(%query, providers = providers.len(), "starting feed");

    let aggregator = FeedAggregator::builder(query)
        .providers(providers)
        .fetch_timeout(config.feed.fetch_timeout())
        .backoff(config.backoff())
        .build();
    let mut events = aggregator.subscribe();
    let pager = FeedPager::new(aggregator, config.feed.threshold);

    // -- terminal setup ------------------------------------------------------
    let mut guard = TerminalGuard::new()?;
    let mut app = App::new(pager);
    app.start();

    // -- main event loop -----------------------------------------------------
    // ~10 fps.  Each iteration drains feed events, refreshes the snapshot,
    // renders, then waits up to one tick for a key.  Fetches run on the
    // runtime's worker threads meanwhile.
    let tick_rate = Duration::from_millis(100);

    loop {
        while let Ok(event) = events.try_recv() {
            app.on_event(event);
        }
        app.refresh();

        guard.terminal.draw(|f| ui::draw(&mut app, f))?;

        let key = tokio::task::block_in_place(|| -> io::Result<Option<Event>> {
            if event::poll(tick_rate)? {
                return event::read().map(Some);
            }
            Ok(None)
        })?;
        if let Some(Event::Key(key)) = key {
            input::handle_key_event(&mut app, key);
        }

        if app.quit {
            break;
        }
    }

    tracing::info!(items = app.items.len(), "exiting");
    Ok(())
}
