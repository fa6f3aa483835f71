//! Topic list panel.

use crate::app::{App, View};
use crate::discourse::Topic;
use crate::util::{format_relative_time, strip_control_chars, truncate_to_width};
use chrono::Utc;
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
    Frame,
};

/// Render the topic list panel.
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 3 || area.height < 3 {
        return;
    }

    let palette = &app.palette;
    let inner_width = area.width.saturating_sub(2) as usize;
    let visible = app.visible_topics();

    let items: Vec<ListItem> = if visible.is_empty() {
        let msg = if app.filter.is_empty() {
            "No topics"
        } else {
            "No topics match the filter"
        };
        vec![ListItem::new(msg)]
    } else {
        visible
            .iter()
            .enumerate()
            .map(|(i, topic)| topic_item(app, topic, i == app.selected_topic, inner_width))
            .collect()
    };

    let title = if app.filter_mode {
        format!(" Filter: {}_ ", app.filter)
    } else if !app.filter.is_empty() {
        format!(" Topics ({}/{}) [{}] ", visible.len(), app.topics.topics.len(), app.filter)
    } else {
        let more = if app.topics.has_more() { "+" } else { "" };
        format!(" Topics ({}{}) ", app.topics.topics.len(), more)
    };

    let border = if app.view == View::Browse {
        palette.border_focused
    } else {
        palette.border
    };

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(Span::styled(title, palette.title)),
    );

    // ListState keeps the selected row scrolled into view.
    let mut state = ListState::default();
    if !visible.is_empty() {
        state.select(Some(app.selected_topic));
    }
    f.render_stateful_widget(list, area, &mut state);
}

/// Two lines: title, then `[category] {tags} N replies • N views  age`.
fn topic_item(app: &App, topic: &Topic, selected: bool, width: usize) -> ListItem<'static> {
    let palette = &app.palette;
    let title_style = if selected { palette.selected } else { palette.item };

    let mut title_spans = Vec::new();
    if topic.pinned {
        title_spans.push(Span::styled("📌 ", palette.pinned));
    }
    if topic.closed {
        title_spans.push(Span::styled("🔒 ", palette.metadata));
    }
    let title = strip_control_chars(&topic.title);
    title_spans.push(Span::styled(
        truncate_to_width(&title, width.saturating_sub(3)).into_owned(),
        title_style,
    ));

    let mut meta = Vec::new();
    if let Some(name) = topic.category_name.as_deref() {
        meta.push(Span::styled(
            format!("[{}] ", name),
            palette.category(topic.category_color.as_deref()),
        ));
    }
    if !topic.tags.is_empty() {
        meta.push(Span::styled(
            format!("{{{}}} ", topic.tags.join(", ")),
            palette.metadata,
        ));
    }
    let age = format_relative_time(topic.bumped_at.or(topic.created_at), Utc::now());
    meta.push(Span::styled(
        format!("{} replies • {} views  {}", topic.reply_count, topic.views, age),
        palette.metadata,
    ));

    ListItem::new(vec![
        Line::from(title_spans),
        Line::from(meta),
    ])
}
