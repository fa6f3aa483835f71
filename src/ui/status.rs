use crate::app::{App, SyncState, View};
use ratatui::{layout::Rect, widgets::Paragraph, Frame};
use std::borrow::Cow;

/// Render the status bar
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 1 || area.height < 1 {
        return;
    }

    let text: Cow<'_, str> = if let Some((msg, _)) = &app.status_message {
        Cow::Borrowed(msg.as_ref())
    } else if let Some(busy) = busy_label(&app.sync) {
        Cow::Borrowed(busy)
    } else {
        match app.view {
            View::Browse if app.filter_mode => {
                Cow::Borrowed("Type to filter | ESC clear | ENTER keep")
            }
            View::Browse => {
                let hints = "[Enter]open [r]efresh [m]ore [M]all [/]filter [n]ew [?]help [q]uit";
                match app.last_refreshed {
                    Some(at) => Cow::Owned(format!("{} | updated {}", hints, at.format("%H:%M"))),
                    None => Cow::Borrowed(hints),
                }
            }
            View::Reader => Cow::Borrowed("[b]ack [j/k]scroll [n/p]post [l]ike [o]pen [q]uit"),
            View::Compose => Cow::Borrowed("[Tab]next field [Ctrl+s]submit [Esc]cancel"),
        }
    };

    f.render_widget(Paragraph::new(text).style(app.palette.status_bar), area);
}

/// Describe the first in-flight operation, if any.
fn busy_label(sync: &SyncState) -> Option<&'static str> {
    if sync.loading_all {
        Some("Loading all topics...")
    } else if sync.refreshing {
        Some("Refreshing...")
    } else if sync.loading_more {
        Some("Loading more topics...")
    } else if sync.loading_posts() {
        Some("Loading posts...")
    } else if sync.creating_topic {
        Some("Creating topic...")
    } else {
        None
    }
}
