//! Input handling for the TUI.
//!
//! Routes key presses by overlay, then mode, then view. Overlays and modes
//! capture every key while active.

use crate::app::{App, AppEvent, ComposeForm, View};
use crossterm::event::{KeyCode, KeyModifiers};
use tokio::sync::mpsc;

use super::helpers::is_openable_url;
use super::sync;
use super::Action;

/// Maximum filter length accepted from the keyboard.
const MAX_FILTER_LENGTH: usize = 256;

/// Lines moved by Ctrl+d / Ctrl+u.
const PAGE_LINES: isize = 10;

/// Main input dispatch function.
pub(super) fn handle_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Action {
    if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
        return Action::Quit;
    }

    if app.show_help {
        handle_help_input(app, code);
        return Action::Continue;
    }

    if app.filter_mode {
        handle_filter_input(app, code);
        return Action::Continue;
    }

    match app.view {
        View::Browse => handle_browse_input(app, code, modifiers, event_tx),
        View::Reader => handle_reader_input(app, code, modifiers, event_tx),
        View::Compose => {
            handle_compose_input(app, code, modifiers, event_tx);
            Action::Continue
        }
    }
}

/// Captures all keys: j/k scroll, Esc/q/? dismiss.
fn handle_help_input(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') => {
            app.show_help = false;
            app.help_scroll = 0;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.help_scroll = app.help_scroll.saturating_add(1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.help_scroll = app.help_scroll.saturating_sub(1);
        }
        _ => {}
    }
}

fn handle_filter_input(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Esc => {
            app.filter_mode = false;
            app.set_filter(String::new());
        }
        KeyCode::Enter => {
            app.filter_mode = false;
        }
        KeyCode::Backspace => {
            let mut filter = std::mem::take(&mut app.filter);
            filter.pop();
            app.set_filter(filter);
        }
        KeyCode::Char(c) => {
            if app.filter.len() >= MAX_FILTER_LENGTH {
                app.set_status(format!("Filter at max length ({} chars)", MAX_FILTER_LENGTH));
                return;
            }
            let mut filter = std::mem::take(&mut app.filter);
            filter.push(c);
            app.set_filter(filter);
        }
        _ => {}
    }
}

fn handle_browse_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Action {
    let ctrl = modifiers.contains(KeyModifiers::CONTROL);
    match code {
        KeyCode::Char('q') => return Action::Quit,
        KeyCode::Char('d') if ctrl => scroll_viewport(app, PAGE_LINES),
        KeyCode::Char('u') if ctrl => scroll_viewport(app, -PAGE_LINES),
        KeyCode::Char('?') => app.show_help = true,
        KeyCode::Char('j') | KeyCode::Down => app.move_selection(1),
        KeyCode::Char('k') | KeyCode::Up => app.move_selection(-1),
        KeyCode::Home | KeyCode::Char('g') => app.selected_topic = 0,
        KeyCode::End | KeyCode::Char('G') => app.move_selection(isize::MAX),
        KeyCode::Enter => {
            sync::open_topic(app, event_tx);
        }
        KeyCode::Char('f') => {
            if app.reader.is_some() {
                app.view = View::Reader;
            } else {
                app.set_status("Open a topic first (Enter)");
            }
        }
        KeyCode::Char('r') | KeyCode::Char('R') => {
            sync::request_refresh(app, event_tx);
        }
        KeyCode::Char('m') => {
            sync::request_load_more(app, event_tx);
        }
        KeyCode::Char('M') => {
            sync::request_load_all(app, event_tx);
        }
        KeyCode::Char('/') => app.filter_mode = true,
        KeyCode::Esc => {
            if !app.filter.is_empty() {
                app.set_filter(String::new());
            }
        }
        KeyCode::Char('n') => {
            app.compose.get_or_insert_with(ComposeForm::default);
            app.view = View::Compose;
        }
        KeyCode::Char('o') => open_selected_in_browser(app),
        _ => {}
    }
    Action::Continue
}

fn handle_reader_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Action {
    let ctrl = modifiers.contains(KeyModifiers::CONTROL);
    match code {
        KeyCode::Char('q') => return Action::Quit,
        KeyCode::Char('d') if ctrl => scroll_viewport(app, PAGE_LINES),
        KeyCode::Char('u') if ctrl => scroll_viewport(app, -PAGE_LINES),
        KeyCode::PageDown => scroll_viewport(app, PAGE_LINES),
        KeyCode::PageUp => scroll_viewport(app, -PAGE_LINES),
        KeyCode::Esc | KeyCode::Char('b') | KeyCode::Char('f') => app.view = View::Browse,
        KeyCode::Char('?') => app.show_help = true,
        KeyCode::Char('j') | KeyCode::Down => scroll_viewport(app, 1),
        KeyCode::Char('k') | KeyCode::Up => scroll_viewport(app, -1),
        KeyCode::Char('n') => select_post(app, 1),
        KeyCode::Char('p') => select_post(app, -1),
        KeyCode::Char('l') => {
            sync::like_selected_post(app, event_tx);
        }
        KeyCode::Char('o') => open_selected_in_browser(app),
        _ => {}
    }
    Action::Continue
}

fn handle_compose_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) {
    if code == KeyCode::Esc {
        sync::cancel_compose(app);
        return;
    }
    if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('s') {
        sync::submit_topic(app, event_tx);
        return;
    }

    let Some(form) = app.compose.as_mut() else {
        app.view = View::Browse;
        return;
    };
    if form.submitting {
        return;
    }

    match code {
        KeyCode::Tab => form.focus = form.focus.next(),
        KeyCode::Enter if form.focus == crate::app::ComposeField::Body => {
            form.body.push('\n');
        }
        KeyCode::Enter => form.focus = form.focus.next(),
        KeyCode::Backspace => {
            form.field_mut().pop();
        }
        KeyCode::Char(c) => form.field_mut().push(c),
        _ => {}
    }
}

fn scroll_viewport(app: &mut App, delta: isize) {
    if let Some(reader) = app.reader.as_mut() {
        reader.scroll_by(delta);
    }
}

fn select_post(app: &mut App, delta: isize) {
    if let Some(reader) = app.reader.as_mut() {
        reader.select_post(delta);
    }
}

/// Open the topic shown in the viewport, or the selected list row.
fn open_selected_in_browser(app: &mut App) {
    let target = match (&app.view, app.reader.as_ref()) {
        (View::Reader, Some(reader)) => Some((reader.topic_id, reader.slug.clone())),
        _ => app.selected_topic().map(|t| (t.id, t.slug.clone())),
    };
    let Some((topic_id, slug)) = target else {
        return;
    };

    let url = app.client.topic_web_url(topic_id, &slug);
    if !is_openable_url(&url) {
        app.set_status(format!("Refusing to open {}", url));
    } else if let Err(e) = open::that(&url) {
        app.set_status(format!("Failed to open browser: {}", e));
    }
}
