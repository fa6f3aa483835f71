//! New-topic form overlay.

use crate::app::{App, ComposeField};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::helpers::centered_rect;

pub fn render(f: &mut Frame, app: &App) {
    let Some(form) = app.compose.as_ref() else {
        return;
    };
    let palette = &app.palette;

    let overlay = centered_rect(80, 80, f.area());
    if overlay.width < 20 || overlay.height < 12 {
        return;
    }
    f.render_widget(Clear, overlay);

    let title = if form.submitting {
        " New topic (submitting...) "
    } else {
        " New topic (Tab next field, Ctrl+s submit, Esc cancel) "
    };
    let outer = Block::default()
        .borders(Borders::ALL)
        .border_style(palette.border_focused)
        .title(Span::styled(title, palette.title));
    let inner = outer.inner(overlay);
    f.render_widget(outer, overlay);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(inner);

    let fields = [
        (ComposeField::Title, "Title", &form.title),
        (ComposeField::Body, "Body", &form.body),
        (ComposeField::Category, "Category id (optional)", &form.category),
        (ComposeField::Tags, "Tags, comma separated (optional)", &form.tags),
    ];

    for (area, (field, label, value)) in rows.iter().zip(fields) {
        let focused = form.focus == field && !form.submitting;
        let border = if focused {
            palette.border_focused
        } else {
            palette.border
        };
        let cursor = if focused { "_" } else { "" };
        let widget = Paragraph::new(format!("{}{}", value, cursor))
            .style(palette.post_body)
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border)
                    .title(format!(" {} ", label)),
            );
        f.render_widget(widget, *area);
    }

    if let Some(error) = form.error.as_deref() {
        f.render_widget(
            Paragraph::new(Line::from(Span::styled(error.to_string(), palette.error))),
            rows[4],
        );
    }
}
