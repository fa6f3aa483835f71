//! Color palette for the TUI.
//!
//! Semantic roles map to ratatui `Style` values. The palette is built once
//! from [`ColorConfig`] and threaded through `App`; there is no global style
//! state.

use crate::config::ColorConfig;
use ratatui::style::{Color, Modifier, Style};

/// Parse `#RRGGBB` or `RRGGBB` (Discourse category colors omit the `#`).
///
/// ```
/// use lurk::theme::parse_hex_color;
/// use ratatui::style::Color;
///
/// assert_eq!(parse_hex_color("#FF8800"), Some(Color::Rgb(255, 136, 0)));
/// assert_eq!(parse_hex_color("0088CC"), Some(Color::Rgb(0, 136, 204)));
/// assert_eq!(parse_hex_color("red"), None);
/// ```
pub fn parse_hex_color(s: &str) -> Option<Color> {
    let hex = s.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(Color::Rgb(channel(0)?, channel(2)?, channel(4)?))
}

/// Every semantic UI role resolved to a `Style`.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    // -- Chrome --
    pub title: Style,
    pub status_bar: Style,
    pub error: Style,
    pub border: Style,
    pub border_focused: Style,

    // -- Topic list --
    pub item: Style,
    pub selected: Style,
    pub metadata: Style,
    pub pinned: Style,

    // -- Reader --
    pub post_header: Style,
    pub post_body: Style,
    pub post_footer: Style,
    pub liked: Style,
}

impl Palette {
    /// Build from configured hex colors. Unparseable entries fall back to the
    /// default for that role with a warning.
    pub fn from_config(colors: &ColorConfig) -> Self {
        let defaults = ColorConfig::default();
        let resolve = |role: &str, value: &str, fallback: &str| {
            parse_hex_color(value).unwrap_or_else(|| {
                tracing::warn!(role, value, "Invalid color in config, using default");
                parse_hex_color(fallback).unwrap_or(Color::Reset)
            })
        };

        let title = resolve("title", &colors.title, &defaults.title);
        let item = resolve("item", &colors.item, &defaults.item);
        let selected = resolve("selected", &colors.selected, &defaults.selected);
        let status = resolve("status", &colors.status, &defaults.status);
        let error = resolve("error", &colors.error, &defaults.error);

        Self {
            title: Style::default().fg(title).add_modifier(Modifier::BOLD),
            status_bar: Style::default().fg(status),
            error: Style::default().fg(error).add_modifier(Modifier::BOLD),
            border: Style::default().fg(Color::DarkGray),
            border_focused: Style::default().fg(title),

            item: Style::default().fg(item),
            selected: Style::default()
                .fg(selected)
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
            metadata: Style::default().fg(Color::DarkGray),
            pinned: Style::default().fg(Color::Yellow),

            post_header: Style::default().fg(title).add_modifier(Modifier::BOLD),
            post_body: Style::default(),
            post_footer: Style::default().fg(Color::DarkGray),
            liked: Style::default().fg(selected),
        }
    }

    /// Style for a `[category]` badge in the forum's own category color.
    pub fn category(&self, hex: Option<&str>) -> Style {
        hex.and_then(parse_hex_color)
            .map(|c| Style::default().fg(c))
            .unwrap_or(self.metadata)
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::from_config(&ColorConfig::default())
    }
}
