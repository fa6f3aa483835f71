use super::{Export, ExportError, Formatter};
use std::fmt::Write;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Discourse Topics</title>
    <style>
        body { font-family: Arial, sans-serif; max-width: 800px; margin: 0 auto; padding: 20px; }
        .topic { margin-bottom: 40px; border-bottom: 2px solid #eee; padding-bottom: 20px; }
        .post { margin: 20px 0; padding: 15px; background: #f9f9f9; border-radius: 5px; }
        .meta { color: #666; font-size: 0.9em; }
        .content { margin-top: 10px; }
        .tags { color: #0066cc; }
        .category { color: #666; }
    </style>
</head>
<body>
"#;

/// Standalone HTML page. Titles and metadata are escaped; post bodies are
/// the forum's own cooked HTML and are embedded unchanged.
pub struct HtmlFormatter;

impl Formatter for HtmlFormatter {
    fn format(&self, export: &Export) -> Result<Vec<u8>, ExportError> {
        let mut out = String::from(HEAD);
        for entry in &export.topics {
            let topic = &entry.topic;
            let _ = write!(out, "<div class=\"topic\">\n    <h2>{}</h2>\n", escape(&topic.title));
            if let Some(category) = topic.category_name.as_deref() {
                let _ = writeln!(out, "<div class=\"category\">Category: {}</div>", escape(category));
            }
            if !topic.tags.is_empty() {
                let _ = writeln!(out, "<div class=\"tags\">Tags: {}</div>", escape(&topic.tags.join(", ")));
            }
            let created = topic
                .created_at
                .map(|t| t.format(DATE_FORMAT).to_string())
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "<div class=\"meta\">Created: {}<br>Replies: {}<br>Views: {}</div>",
                created, topic.reply_count, topic.views
            );

            out.push_str("<div class=\"posts\">\n");
            for post in &entry.posts {
                let posted = post
                    .created_at
                    .map(|t| t.format(DATE_FORMAT).to_string())
                    .unwrap_or_default();
                let _ = writeln!(
                    out,
                    "<div class=\"post\">\n    <div class=\"meta\">Post #{} by {}<br>Posted: {}<br>Reads: {} | Score: {:.1} | Likes: {}</div>\n    <div class=\"content\">{}</div>\n</div>",
                    post.post_number,
                    escape(&post.author()),
                    posted,
                    post.reads,
                    post.score,
                    post.like_count(),
                    post.cooked
                );
            }
            out.push_str("</div></div>\n");
        }
        out.push_str("</body></html>\n");
        Ok(out.into_bytes())
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::fixtures::sample_export;

    #[test]
    fn test_html_escapes_titles_but_keeps_cooked() {
        let bytes = HtmlFormatter.format(&sample_export()).unwrap();
        let html = String::from_utf8(bytes).unwrap();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<h2>Rust &lt;3 &amp; friends</h2>"));
        assert!(html.contains("<div class=\"content\"><p>Hello <b>world</b></p></div>"));
        assert!(html.contains("Category: Support"));
        assert!(html.trim_end().ends_with("</body></html>"));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
    }
}
