//! Reduce Discourse "cooked" post HTML to plain terminal text.

use scraper::{node::Node, ElementRef, Html};

use super::strip_control_chars;

/// Elements that start a new line before and after their content.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "br", "li", "ul", "ol", "blockquote", "pre", "aside", "h1", "h2", "h3", "h4",
    "h5", "h6", "hr", "table", "tr",
];

/// Convert cooked HTML into readable text.
///
/// Block elements become line breaks, list items get a `- ` bullet, image
/// tags become `[image]`, and runs of more than one blank line collapse.
///
/// ```
/// use lurk::util::cooked_to_text;
///
/// let text = cooked_to_text("<p>Hello <b>world</b></p><p>Second</p>");
/// assert_eq!(text, "Hello world\n\nSecond");
/// ```
pub fn cooked_to_text(cooked: &str) -> String {
    let fragment = Html::parse_fragment(cooked);
    let mut out = String::with_capacity(cooked.len());
    walk(fragment.root_element(), &mut out);
    collapse_blank_lines(&strip_control_chars(&out))
}

fn walk(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let tag = el.name();
                let block = BLOCK_TAGS.contains(&tag);
                if block {
                    out.push('\n');
                }
                match tag {
                    "img" => {
                        // Emoji images carry their shortcode as alt text.
                        match el.attr("alt") {
                            Some(alt) if !alt.is_empty() => out.push_str(alt),
                            _ => out.push_str("[image]"),
                        }
                    }
                    "li" => out.push_str("- "),
                    _ => {}
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    walk(child_el, out);
                }
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;
    for line in text.lines().map(str::trim_end) {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim().to_string()
}
