//! Keyboard input handling.
//!
//! Maps terminal key events to [`App`] actions.  Every movement goes through
//! the `App::select_*` methods, which report the new visible reel to the
//! playback coordinator and tell the pager how close the end is.
//!
//! To add a keybinding, add a `KeyCode` arm to [`handle_key_event`] and
//! extend the help text in `crate::ui::draw_status_bar`.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::app::App;

/// Process a single key event, updating app state accordingly.
///
/// Only reacts to key-press events so that each physical keypress triggers
/// exactly one action.
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    if key.kind != KeyEventKind::Press {
        return;
    }

    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => app.quit = true,
        KeyCode::Char('q') | KeyCode::Esc => app.quit = true,
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Up | KeyCode::Char('k') => app.select_previous(),
        KeyCode::Home | KeyCode::Char('g') => app.select_first(),
        KeyCode::End | KeyCode::Char('G') => app.select_last(),
        KeyCode::Char('r') => app.reset(),
        _ => {}
    }
}
