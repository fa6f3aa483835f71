//! Category lookup and topic enrichment.
//!
//! The category list is treated as authoritative once cached: any parseable
//! `categories.json` in the instance cache is returned without touching the
//! network, however old it is. Only an explicit cache reset forces a refetch.

use super::types::{CategoryIndex, CategoryList, TopicPage};
use super::{ClientError, DiscourseClient};
use crate::storage::CacheResource;

impl DiscourseClient {
    /// Categories for this instance, cache first.
    pub async fn categories(&self) -> Result<CategoryList, ClientError> {
        match self.cache.read(CacheResource::Categories) {
            Ok(Some(entry)) => match CategoryList::from_json(&entry.payload) {
                Ok(list) => {
                    tracing::debug!(
                        categories = list.categories.len(),
                        "Using cached categories"
                    );
                    return Ok(list);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Cached categories are unreadable, refetching");
                }
            },
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read cached categories, refetching");
            }
        }

        self.fetch_categories().await
    }

    /// Always hit `/categories.json`, then overwrite the cached copy.
    pub async fn fetch_categories(&self) -> Result<CategoryList, ClientError> {
        let body = self.get_json(&self.url("/categories.json")).await?;
        let list =
            CategoryList::from_json(&body).map_err(ClientError::decode("/categories.json"))?;
        self.cache.store(CacheResource::Categories, &body);
        tracing::debug!(categories = list.categories.len(), "Fetched categories");
        Ok(list)
    }

    /// Join `page`'s topics against the category list.
    ///
    /// Runs on every topic-list fetch, continuation pages included. Failure
    /// is logged and the topics are delivered unenriched.
    pub(super) async fn enrich(&self, page: &mut TopicPage) {
        match self.categories().await {
            Ok(list) => {
                let index = CategoryIndex::new(&list.categories);
                let enriched = index.enrich(&mut page.topics);
                tracing::trace!(
                    enriched,
                    topics = page.topics.len(),
                    categories = index.len(),
                    "Enriched topics with categories"
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "Category enrichment failed, continuing without it");
            }
        }
    }
}
