use super::{Export, ExportError, Formatter};
use crate::util::{cooked_to_text, strip_control_chars};
use std::fmt::Write;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Plain text, one block per topic with its posts reduced to text.
pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format(&self, export: &Export) -> Result<Vec<u8>, ExportError> {
        let mut out = String::new();
        for entry in &export.topics {
            let topic = &entry.topic;
            // Writing to a String cannot fail.
            let _ = writeln!(out, "Topic: {}", strip_control_chars(&topic.title));
            if let Some(category) = topic.category_name.as_deref() {
                let _ = writeln!(out, "Category: {}", category);
            }
            if !topic.tags.is_empty() {
                let _ = writeln!(out, "Tags: {}", topic.tags.join(", "));
            }
            if let Some(created) = topic.created_at {
                let _ = writeln!(out, "Created: {}", created.format(DATE_FORMAT));
            }
            let _ = writeln!(out, "Replies: {}", topic.reply_count);
            let _ = writeln!(out, "Views: {}", topic.views);
            out.push_str("\nPosts:\n");

            for post in &entry.posts {
                let _ = writeln!(out, "\nPost #{} by {}", post.post_number, post.author());
                if let Some(at) = post.created_at {
                    let _ = writeln!(out, "Posted: {}", at.format(DATE_FORMAT));
                }
                let _ = writeln!(out, "Content:\n{}", cooked_to_text(&post.cooked));
                let _ = writeln!(
                    out,
                    "Reads: {} | Score: {:.1} | Likes: {}",
                    post.reads,
                    post.score,
                    post.like_count()
                );
                out.push_str("\n---\n");
            }
            out.push_str("\n========================================\n\n");
        }
        Ok(out.into_bytes())
    }
}
