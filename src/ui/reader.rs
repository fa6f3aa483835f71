//! Post viewport for the open topic.
//!
//! Bodies are pre-wrapped here instead of relying on `Paragraph` wrapping so
//! the line offset of every post is known, which `n`/`p` use to jump.

use crate::app::{App, View, MAX_SCROLL};
use crate::discourse::Post;
use crate::theme::Palette;
use crate::util::{display_width, strip_control_chars};
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthChar;

/// Render the viewport and record per-post line offsets.
pub fn render(f: &mut Frame, app: &mut App, area: Rect) {
    if area.width < 3 || area.height < 3 {
        return;
    }

    let focused = app.view == View::Reader;
    let palette = app.palette.clone();
    let border = if focused {
        palette.border_focused
    } else {
        palette.border
    };
    let width = area.width.saturating_sub(2) as usize;
    let height = area.height.saturating_sub(2) as usize;

    let Some(reader) = app.reader.as_mut() else {
        let paragraph = Paragraph::new("Select a topic and press Enter")
            .style(palette.metadata)
            .block(Block::default().borders(Borders::ALL).border_style(border).title(" Posts "));
        f.render_widget(paragraph, area);
        return;
    };

    let title = format!(" {} ", strip_control_chars(&reader.title));
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(Span::styled(title, palette.title));

    let lines: Vec<Line<'static>> = match (&reader.posts, &reader.error) {
        (Some(page), _) => {
            let mut lines = Vec::new();
            reader.post_offsets.clear();
            for (i, (post, body)) in page.posts.iter().zip(&reader.bodies).enumerate() {
                reader.post_offsets.push(lines.len());
                lines.extend(post_lines(post, body, i == reader.selected_post, &palette, width));
            }
            if lines.is_empty() {
                lines.push(Line::from("This topic has no posts"));
            }
            lines
        }
        (None, Some(error)) => vec![Line::from(Span::styled(
            format!("Failed to load posts: {}", error),
            palette.error,
        ))],
        (None, None) => vec![Line::from(Span::styled("Loading posts...", palette.metadata))],
    };

    let max_scroll = lines.len().saturating_sub(height).min(MAX_SCROLL);
    reader.scroll = reader.scroll.min(max_scroll);

    let paragraph = Paragraph::new(lines)
        .block(block)
        .style(palette.post_body)
        .scroll((reader.scroll as u16, 0));
    f.render_widget(paragraph, area);
}

/// One post: header, date, wrapped body, stats footer, separator.
pub(super) fn post_lines(
    post: &Post,
    body: &str,
    selected: bool,
    palette: &Palette,
    width: usize,
) -> Vec<Line<'static>> {
    let header_style = if selected {
        palette.selected
    } else {
        palette.post_header
    };

    let mut lines = vec![Line::from(Span::styled(
        format!(
            "Post #{} by {}",
            post.post_number,
            strip_control_chars(&post.author())
        ),
        header_style,
    ))];

    if let Some(at) = post.created_at {
        lines.push(Line::from(Span::styled(
            format!("Posted: {}", at.format("%Y-%m-%d %H:%M UTC")),
            palette.metadata,
        )));
    }
    lines.push(Line::from(""));

    lines.extend(
        wrap_text(body, width)
            .into_iter()
            .map(|l| Line::from(Span::styled(l, palette.post_body))),
    );
    lines.push(Line::from(""));

    let mut footer = vec![Span::styled(
        format!(
            "Reads: {} | Score: {:.1} | Likes: {}",
            post.reads,
            post.score,
            post.like_count()
        ),
        palette.post_footer,
    )];
    if post.liked() {
        footer.push(Span::styled(" (You liked this)", palette.liked));
    }
    lines.push(Line::from(footer));
    lines.push(Line::from(Span::styled(
        "─".repeat(width.min(80)),
        palette.border,
    )));
    lines
}

/// Greedy word wrap by display width. Words wider than `width` are split.
pub(super) fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut out = Vec::new();

    for raw in text.lines() {
        if display_width(raw) <= width {
            out.push(raw.to_string());
            continue;
        }

        let mut line = String::new();
        let mut line_width = 0;
        for word in raw.split(' ') {
            let word_width = display_width(word);
            let gap = usize::from(!line.is_empty());

            if line_width + gap + word_width <= width {
                if gap == 1 {
                    line.push(' ');
                }
                line.push_str(word);
                line_width += gap + word_width;
                continue;
            }

            if !line.is_empty() {
                out.push(std::mem::take(&mut line));
                line_width = 0;
            }

            for c in word.chars() {
                let w = c.width().unwrap_or(0);
                if line_width + w > width && !line.is_empty() {
                    out.push(std::mem::take(&mut line));
                    line_width = 0;
                }
                line.push(c);
                line_width += w;
            }
        }
        out.push(line);
    }
    out
}
