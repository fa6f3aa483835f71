//! Render dispatch for the TUI.

use crate::app::{App, View};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

use super::{compose, help, reader, status, topics};

/// Minimum terminal dimensions required for normal operation.
pub(super) const MIN_WIDTH: u16 = 60;
pub(super) const MIN_HEIGHT: u16 = 10;

/// Draw the whole frame for the current view.
pub(super) fn render(f: &mut Frame, app: &mut App) {
    let area = f.area();
    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        render_too_small(f, area);
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    let header = Line::from(vec![
        Span::styled(" lurk ", app.palette.title),
        Span::styled(app.client.base().to_string(), app.palette.metadata),
    ]);
    f.render_widget(Paragraph::new(header), rows[0]);

    match app.view {
        View::Browse | View::Compose => {
            let panels = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
                .split(rows[1]);
            topics::render(f, app, panels[0]);
            reader::render(f, app, panels[1]);
        }
        View::Reader => reader::render(f, app, rows[1]),
    }
    status::render(f, app, rows[2]);

    if app.view == View::Compose {
        compose::render(f, app);
    }
    if app.show_help {
        help::render(f, app);
    }
}

fn render_too_small(f: &mut Frame, area: Rect) {
    if area.is_empty() {
        return;
    }
    let text = if area.width < 24 || area.height < 4 {
        "Window too small".to_string()
    } else {
        format!(
            "Window too small: {}x{}\nlurk needs at least {}x{}",
            area.width, area.height, MIN_WIDTH, MIN_HEIGHT
        )
    };
    f.render_widget(
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        area,
    );
}
