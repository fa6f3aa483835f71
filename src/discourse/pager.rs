//! Topic-list pagination and per-topic post retrieval.

use super::types::{PostPage, TopicDocument, TopicPage};
use super::{ClientError, DiscourseClient};
use url::Url;

/// Page cap used when a caller passes 0.
pub const DEFAULT_MAX_PAGES: usize = 10;

impl DiscourseClient {
    /// Follow a `more_topics_url` cursor.
    ///
    /// Absolute cursors are used as-is; relative ones are resolved against
    /// the base URL. Continuation pages are enriched but not cached; the
    /// cache holds the first page only.
    pub async fn more_topics(&self, cursor: &str) -> Result<TopicPage, ClientError> {
        let cursor = cursor.trim();
        if cursor.is_empty() {
            return Err(ClientError::Validation(
                "no more-topics cursor to follow".to_string(),
            ));
        }

        let url = if cursor.starts_with("http://") || cursor.starts_with("https://") {
            cursor.to_string()
        } else {
            self.url(cursor)
        };

        let body = self.get_json(&url).await?;
        let mut page = TopicPage::from_json(&body).map_err(ClientError::decode("more topics"))?;
        self.enrich(&mut page).await;
        tracing::debug!(
            cursor = %cursor,
            topics = page.topics.len(),
            has_more = page.has_more(),
            "Fetched more topics"
        );
        Ok(page)
    }

    /// Fetch up to `max_pages` pages (first page included) and merge them.
    ///
    /// Stops at an empty cursor, an empty page, or the cap. If a continuation
    /// page fails, the pages fetched so far are returned as a success and the
    /// cursor still points at the page that failed. Only a failure of the
    /// first page is an error.
    pub async fn load_all_topics(&self, max_pages: usize) -> Result<TopicPage, ClientError> {
        let max_pages = if max_pages == 0 {
            DEFAULT_MAX_PAGES
        } else {
            max_pages
        };

        let mut all = self.latest_topics().await?;
        let mut pages = 1;

        while pages < max_pages && all.has_more() {
            tokio::time::sleep(self.page_cooldown).await;

            let cursor = all.more_cursor.clone();
            match self.more_topics(&cursor).await {
                Ok(next) => {
                    let fetched = next.topics.len();
                    all.append(next);
                    pages += 1;
                    if fetched == 0 {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        page = pages + 1,
                        error = %e,
                        "Stopping early, keeping pages fetched so far"
                    );
                    break;
                }
            }
        }

        tracing::info!(pages, topics = all.topics.len(), "Loaded all topics");
        Ok(all)
    }

    async fn topic_document(&self, topic_id: i64) -> Result<TopicDocument, ClientError> {
        let body = self.get_json(&self.url(&format!("/t/{}.json", topic_id))).await?;
        serde_json::from_slice(&body).map_err(ClientError::decode("topic"))
    }

    /// Every post of a topic.
    ///
    /// Reads the ordered post-id stream from the topic document, waits the
    /// page cooldown, then fetches all ids in one batch request. A topic with
    /// an empty stream is parsed from the first document alone.
    pub async fn topic_posts(&self, topic_id: i64) -> Result<PostPage, ClientError> {
        let doc = self.topic_document(topic_id).await?;
        let stream = doc.post_stream.stream;
        if stream.is_empty() {
            return Ok(PostPage::new(topic_id, doc.post_stream.posts));
        }

        tokio::time::sleep(self.page_cooldown).await;

        let mut url = Url::parse(&self.url(&format!("/t/{}/posts.json", topic_id)))
            .map_err(|e| ClientError::Config(e.to_string()))?;
        {
            let mut query = url.query_pairs_mut();
            for id in &stream {
                query.append_pair("post_ids[]", &id.to_string());
            }
            query.append_pair("include_suggested", "false");
        }

        let body = self.get_json(url.as_str()).await?;
        let batch: TopicDocument =
            serde_json::from_slice(&body).map_err(ClientError::decode("post batch"))?;

        tracing::debug!(
            topic_id,
            requested = stream.len(),
            received = batch.post_stream.posts.len(),
            "Fetched topic posts"
        );
        Ok(PostPage::new(topic_id, batch.post_stream.posts))
    }

    /// One page of a topic's posts.
    ///
    /// Page 1 comes straight from the topic document (one request). Any
    /// other page falls back to [`topic_posts`](Self::topic_posts).
    pub async fn topic_posts_page(&self, topic_id: i64, page: u32) -> Result<PostPage, ClientError> {
        if page != 1 {
            return self.topic_posts(topic_id).await;
        }
        let doc = self.topic_document(topic_id).await?;
        Ok(PostPage::new(topic_id, doc.post_stream.posts))
    }
}
