//! One-shot export of the topic list with every topic's posts.
//!
//! The output format follows the file extension. The extension is checked
//! before any network traffic so a typo fails fast.

mod html;
mod json;
mod text;

pub use html::HtmlFormatter;
pub use json::JsonFormatter;
pub use text::TextFormatter;

use crate::discourse::{ClientError, DiscourseClient, Post, Topic, TopicPage};
use crate::util::write_atomic;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Unsupported output format for {0} (use .json, .txt or .html)")]
    UnsupportedFormat(PathBuf),

    #[error("Failed to fetch posts for topic {topic_id}: {source}")]
    Fetch {
        topic_id: i64,
        #[source]
        source: ClientError,
    },

    #[error("Failed to serialize export: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Everything an export contains.
#[derive(Debug, Clone, Serialize)]
pub struct Export {
    pub instance: String,
    pub generated_at: DateTime<Utc>,
    pub topics: Vec<TopicExport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopicExport {
    #[serde(flatten)]
    pub topic: Topic,
    pub posts: Vec<Post>,
}

/// Renders an [`Export`] into file bytes.
pub trait Formatter {
    fn format(&self, export: &Export) -> Result<Vec<u8>, ExportError>;
}

/// Pick a formatter from the extension of `path`.
pub fn formatter_for(path: &Path) -> Result<Box<dyn Formatter>, ExportError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("json") => Ok(Box::new(JsonFormatter)),
        Some("txt") => Ok(Box::new(TextFormatter)),
        Some("html") | Some("htm") => Ok(Box::new(HtmlFormatter)),
        _ => Err(ExportError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Fetch every topic's posts, one topic at a time with the page cooldown
/// in between. The first failing topic aborts the export.
pub async fn collect(client: &DiscourseClient, page: &TopicPage) -> Result<Export, ExportError> {
    let mut topics = Vec::with_capacity(page.topics.len());
    for (i, topic) in page.topics.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(client.page_cooldown()).await;
        }
        let posts = client
            .topic_posts(topic.id)
            .await
            .map_err(|source| ExportError::Fetch {
                topic_id: topic.id,
                source,
            })?;
        tracing::debug!(topic_id = topic.id, posts = posts.posts.len(), "Collected topic for export");
        topics.push(TopicExport {
            topic: topic.clone(),
            posts: posts.posts,
        });
    }

    Ok(Export {
        instance: client.base().to_string(),
        generated_at: Utc::now(),
        topics,
    })
}

/// Export `page` to `path`. Returns the number of topics written.
pub async fn write_export(
    client: &DiscourseClient,
    page: &TopicPage,
    path: &Path,
) -> Result<usize, ExportError> {
    let formatter = formatter_for(path)?;
    let export = collect(client, page).await?;
    let bytes = formatter.format(&export)?;

    write_atomic(path, &bytes).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::info!(
        path = %path.display(),
        topics = export.topics.len(),
        bytes = bytes.len(),
        "Wrote export"
    );
    Ok(export.topics.len())
}
