//! Help overlay listing every key binding, grouped by view.

use crate::app::App;
use crate::theme::Palette;
use ratatui::{
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use super::helpers::centered_rect;

const KEY_COLUMN: usize = 18;

const SECTIONS: &[(&str, &[(&str, &str)])] = &[
    (
        "Topics",
        &[
            ("j / k", "Move selection"),
            ("g / G", "First / last topic"),
            ("Enter", "Open topic"),
            ("f", "Full-screen posts"),
            ("Ctrl+d / Ctrl+u", "Scroll posts"),
            ("r", "Refresh"),
            ("m", "Load more topics"),
            ("M", "Load all topics"),
            ("/", "Filter by title (Esc clears)"),
            ("n", "New topic"),
            ("o", "Open in browser"),
            ("q", "Quit"),
        ],
    ),
    (
        "Posts",
        &[
            ("j / k", "Scroll"),
            ("n / p", "Next / previous post"),
            ("l", "Like selected post"),
            ("o", "Open in browser"),
            ("Esc / b / f", "Back to topics"),
        ],
    ),
    (
        "New topic",
        &[
            ("Tab", "Next field"),
            ("Ctrl+s", "Submit"),
            ("Esc", "Cancel"),
        ],
    ),
];

fn help_lines(palette: &Palette) -> Vec<Line<'static>> {
    let heading = palette.title.add_modifier(Modifier::BOLD);
    let mut lines = Vec::new();
    for (i, (section, keys)) in SECTIONS.iter().enumerate() {
        if i > 0 {
            lines.push(Line::default());
        }
        lines.push(Line::from(Span::styled(*section, heading)));
        for (key, action) in keys.iter() {
            lines.push(Line::from(vec![
                Span::styled(format!("  {:<width$}", key, width = KEY_COLUMN), palette.selected),
                Span::styled(*action, palette.item),
            ]));
        }
    }
    lines
}

pub fn render(f: &mut Frame, app: &App) {
    let overlay = centered_rect(70, 80, f.area());
    if overlay.width < 20 || overlay.height < 6 {
        return;
    }

    let lines = help_lines(&app.palette);
    let inner_height = overlay.height.saturating_sub(2) as usize;
    let max_scroll = lines.len().saturating_sub(inner_height);
    let scroll = app.help_scroll.min(max_scroll);

    let title = if max_scroll > 0 {
        format!(" Keys  j/k scroll ({}/{})  ? close ", scroll + 1, max_scroll + 1)
    } else {
        " Keys  ? close ".to_string()
    };

    f.render_widget(Clear, overlay);
    f.render_widget(
        Paragraph::new(lines)
            .scroll((scroll as u16, 0))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(app.palette.border_focused)
                    .title(title),
            ),
        overlay,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_binding_is_listed_once() {
        let lines = help_lines(&Palette::default());
        let bindings: usize = SECTIONS.iter().map(|(_, keys)| keys.len()).sum();
        // headings plus blank separators between sections
        assert_eq!(lines.len(), bindings + SECTIONS.len() * 2 - 1);
    }
}
