//! Terminal UI rendering.
//!
//! All drawing logic lives here, separated from application state ([`App`])
//! and input handling ([`crate::input`]).
//!
//! The layout is a two-row split: the reel list on top and a one-line status
//! bar at the bottom.  The active reel (the one that would be playing) is
//! marked with `▶`; the terminal has no video surface, so the marker is the
//! whole of "playback".

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use reelscroll::source::{format_count, FeedItem};

use crate::app::App;

/// Characters of caption shown per row.
const CAPTION_WIDTH: usize = 48;

/// Draw the complete UI for one frame.
pub fn draw(app: &mut App, frame: &mut Frame) {
    let [main_area, status_area] = Layout::vertical([
        Constraint::Min(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    draw_feed_list(app, frame, main_area);
    draw_status_bar(app, frame, status_area);
}

fn truncate(s: &str, max: usize) -> String {
    let mut out: String = s.chars().take(max).collect();
    if s.chars().count() > max {
        out.push('…');
    }
    out
}

fn engagement_spans(item: &FeedItem) -> Vec<Span<'static>> {
    let e = &item.engagement;
    let mut spans = vec![
        Span::styled(format!("♥ {}", format_count(e.likes)), Style::default().fg(Color::Red)),
        Span::raw(" "),
        Span::styled(format!("✎ {}", format_count(e.comments)), Style::default().fg(Color::Blue)),
    ];
    if let Some(views) = e.views {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            format!("◉ {}", format_count(views)),
            Style::default().fg(Color::Magenta),
        ));
    }
    spans
}

/// Render the scrollable reel list.
fn draw_feed_list(app: &mut App, frame: &mut Frame, area: Rect) {
    let list_items: Vec<ListItem> = app
        .items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let marker = if app.is_active(i) { "▶ " } else { "  " };

            let mut spans = vec![
                Span::styled(marker, Style::default().fg(Color::Green)),
                Span::styled(
                    format!("@{:<16}", truncate(&item.author_name, 16)),
                    Style::default().fg(Color::Cyan),
                ),
                Span::raw(" "),
                Span::styled(
                    format!(
                        "{:<width$}",
                        truncate(&item.caption, CAPTION_WIDTH),
                        width = CAPTION_WIDTH + 1
                    ),
                    Style::default().fg(Color::White),
                ),
                Span::raw(" "),
            ];
            spans.extend(engagement_spans(item));
            if let Some(location) = &item.location {
                spans.push(Span::styled(
                    format!("  ⌖ {location}"),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            spans.push(Span::styled(
                format!("  [{}]", item.source_provider),
                Style::default().fg(Color::DarkGray),
            ));

            ListItem::new(Line::from(spans))
        })
        .collect();

    let title = format!(" Reels: {} ", app.feed.query);
    let list = List::new(list_items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .bg(Color::DarkGray),
        );

    frame.render_stateful_widget(list, area, &mut app.list_state);
}

/// Render the bottom status bar.
fn draw_status_bar(app: &App, frame: &mut Frame, area: Rect) {
    let feed = &app.feed;
    let state = if feed.is_loading() {
        Span::styled("loading…", Style::default().fg(Color::Yellow))
    } else if feed.exhausted {
        Span::styled("end of feed (r: retry)", Style::default().fg(Color::DarkGray))
    } else {
        Span::raw("")
    };

    let mut spans = vec![
        Span::raw(" "),
        Span::styled(&app.status, Style::default().fg(Color::Yellow)),
        Span::raw("  "),
        Span::styled(format!("{} items", app.items.len()), Style::default().fg(Color::Green)),
        Span::raw("  "),
        state,
    ];
    if let Some(err) = &feed.last_error {
        spans.push(Span::styled(
            format!("  last error {} {}", err.at.format("%H:%M:%S"), err.provider),
            Style::default().fg(Color::Red),
        ));
    }
    spans.push(Span::raw("  q: quit  j/k: scroll  g/G: jump  r: reload"));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_marks_cut_text() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc…");
    }
}
