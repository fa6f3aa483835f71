//! Forum value objects and their wire shapes.
//!
//! Discourse freely sends `null` for strings and counters, so most fields go
//! through [`null_default`] instead of failing the whole document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{HashMap, HashSet};

/// Post action type id Discourse uses for "like".
pub const LIKE_ACTION_ID: i64 = 2;

fn null_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// Tags arrive as plain strings on older instances and as `{id, name, slug}`
/// objects on newer ones.
fn tag_names<'de, D>(d: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Tag {
        Name(String),
        Object { name: String },
    }

    let tags: Option<Vec<Tag>> = Option::deserialize(d)?;
    Ok(tags
        .unwrap_or_default()
        .into_iter()
        .map(|t| match t {
            Tag::Name(name) | Tag::Object { name } => name,
        })
        .collect())
}

// ============================================================================
// Users and Topics
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: i64,
    #[serde(deserialize_with = "null_default")]
    pub username: String,
    pub name: Option<String>,
    #[serde(deserialize_with = "null_default")]
    pub avatar_template: String,
    #[serde(deserialize_with = "null_default")]
    pub trust_level: u8,
    #[serde(deserialize_with = "null_default")]
    pub moderator: bool,
}

/// One row of a topic list.
///
/// `category_name` and `category_color` never come from the forum; they are
/// filled by [`CategoryIndex::enrich`] and stay `None` when no category
/// matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Topic {
    pub id: i64,
    #[serde(deserialize_with = "null_default")]
    pub title: String,
    #[serde(deserialize_with = "null_default")]
    pub fancy_title: String,
    #[serde(deserialize_with = "null_default")]
    pub slug: String,
    pub category_id: Option<i64>,
    #[serde(deserialize_with = "tag_names")]
    pub tags: Vec<String>,
    #[serde(deserialize_with = "null_default")]
    pub posts_count: u32,
    #[serde(deserialize_with = "null_default")]
    pub reply_count: u32,
    #[serde(deserialize_with = "null_default")]
    pub highest_post_number: u32,
    #[serde(deserialize_with = "null_default")]
    pub views: u64,
    #[serde(deserialize_with = "null_default")]
    pub like_count: u32,
    pub created_at: Option<DateTime<Utc>>,
    pub last_posted_at: Option<DateTime<Utc>>,
    pub bumped_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "null_default")]
    pub pinned: bool,
    #[serde(deserialize_with = "null_default")]
    pub closed: bool,
    #[serde(deserialize_with = "null_default")]
    pub archived: bool,
    #[serde(deserialize_with = "null_default")]
    pub visible: bool,
    #[serde(deserialize_with = "null_default")]
    pub unseen: bool,
    pub last_poster_username: Option<String>,
    pub image_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_color: Option<String>,
}

impl Topic {
    /// Case-insensitive title substring match used by the list filter.
    pub fn title_matches(&self, needle_lower: &str) -> bool {
        needle_lower.is_empty() || self.title.to_lowercase().contains(needle_lower)
    }
}

/// An ordered run of topics plus the forum's opaque continuation cursor.
///
/// An empty `more_cursor` means the list is exhausted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TopicPage {
    pub users: Vec<User>,
    pub can_create_topic: bool,
    pub more_cursor: String,
    pub per_page: u32,
    pub topics: Vec<Topic>,
}

#[derive(Deserialize)]
struct TopicListDocument {
    #[serde(default, deserialize_with = "null_default")]
    users: Vec<User>,
    topic_list: TopicListWire,
}

#[derive(Deserialize)]
struct TopicListWire {
    #[serde(default, deserialize_with = "null_default")]
    can_create_topic: bool,
    #[serde(default, deserialize_with = "null_default")]
    more_topics_url: String,
    #[serde(default, deserialize_with = "null_default")]
    per_page: u32,
    #[serde(default, deserialize_with = "null_default")]
    topics: Vec<Topic>,
}

impl TopicPage {
    /// Parse a `latest.json`-shaped document. A missing `topic_list` object
    /// is an error; missing fields inside it are not.
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        let doc: TopicListDocument = serde_json::from_slice(body)?;
        Ok(Self {
            users: doc.users,
            can_create_topic: doc.topic_list.can_create_topic,
            more_cursor: doc.topic_list.more_topics_url,
            per_page: doc.topic_list.per_page,
            topics: doc.topic_list.topics,
        })
    }

    pub fn has_more(&self) -> bool {
        !self.more_cursor.is_empty()
    }

    /// Append `next` after the current topics and adopt its cursor.
    ///
    /// Topics whose id is already present are skipped so a page boundary
    /// that shifted between requests cannot duplicate rows. Returns how many
    /// topics were actually added.
    pub fn append(&mut self, next: TopicPage) -> usize {
        let seen: HashSet<i64> = self.topics.iter().map(|t| t.id).collect();
        let before = self.topics.len();
        self.topics
            .extend(next.topics.into_iter().filter(|t| !seen.contains(&t.id)));

        let known_users: HashSet<i64> = self.users.iter().map(|u| u.id).collect();
        self.users
            .extend(next.users.into_iter().filter(|u| !known_users.contains(&u.id)));

        self.more_cursor = next.more_cursor;
        self.topics.len() - before
    }

    pub fn topic(&self, id: i64) -> Option<&Topic> {
        self.topics.iter().find(|t| t.id == id)
    }
}

// ============================================================================
// Posts
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionSummary {
    pub id: i64,
    #[serde(deserialize_with = "null_default")]
    pub count: u32,
    #[serde(deserialize_with = "null_default")]
    pub acted: bool,
    #[serde(deserialize_with = "null_default")]
    pub can_undo: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Post {
    pub id: i64,
    pub name: Option<String>,
    #[serde(deserialize_with = "null_default")]
    pub username: String,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "null_default")]
    pub cooked: String,
    #[serde(deserialize_with = "null_default")]
    pub post_number: u32,
    #[serde(deserialize_with = "null_default")]
    pub reply_count: u32,
    #[serde(deserialize_with = "null_default")]
    pub topic_id: i64,
    #[serde(deserialize_with = "null_default")]
    pub topic_slug: String,
    #[serde(deserialize_with = "null_default")]
    pub reads: u32,
    #[serde(deserialize_with = "null_default")]
    pub score: f64,
    #[serde(deserialize_with = "null_default")]
    pub actions_summary: Vec<ActionSummary>,
}

impl Post {
    fn like_action(&self) -> Option<&ActionSummary> {
        self.actions_summary
            .iter()
            .find(|a| a.id == LIKE_ACTION_ID)
    }

    pub fn like_count(&self) -> u32 {
        self.like_action().map_or(0, |a| a.count)
    }

    /// Whether the signed-in user has liked this post.
    pub fn liked(&self) -> bool {
        self.like_action().is_some_and(|a| a.acted)
    }

    /// "Display Name (username)", or just the username when no name is set.
    pub fn author(&self) -> String {
        match self.name.as_deref().filter(|n| !n.trim().is_empty()) {
            Some(name) => format!("{} ({})", name, self.username),
            None => self.username.clone(),
        }
    }
}

/// Posts of one topic ordered by `post_number`, unique on it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PostPage {
    pub topic_id: i64,
    pub posts: Vec<Post>,
}

impl PostPage {
    pub fn new(topic_id: i64, mut posts: Vec<Post>) -> Self {
        posts.sort_by_key(|p| p.post_number);
        posts.dedup_by_key(|p| p.post_number);
        Self { topic_id, posts }
    }

    /// Swap in an updated copy of a post (matched by id). Returns false if
    /// the post is not part of this page.
    pub fn replace_post(&mut self, updated: Post) -> bool {
        match self.posts.iter_mut().find(|p| p.id == updated.id) {
            Some(slot) => {
                *slot = updated;
                true
            }
            None => false,
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct TopicDocument {
    pub post_stream: PostStreamWire,
}

#[derive(Deserialize)]
pub(crate) struct PostStreamWire {
    #[serde(default, deserialize_with = "null_default")]
    pub posts: Vec<Post>,
    #[serde(default, deserialize_with = "null_default")]
    pub stream: Vec<i64>,
}

// ============================================================================
// Categories
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Category {
    pub id: i64,
    #[serde(deserialize_with = "null_default")]
    pub name: String,
    #[serde(deserialize_with = "null_default")]
    pub color: String,
    #[serde(deserialize_with = "null_default")]
    pub text_color: String,
    #[serde(deserialize_with = "null_default")]
    pub slug: String,
    #[serde(deserialize_with = "null_default")]
    pub topic_count: u32,
    #[serde(deserialize_with = "null_default")]
    pub post_count: u32,
    #[serde(deserialize_with = "null_default")]
    pub position: i32,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryList {
    pub can_create_category: bool,
    pub can_create_topic: bool,
    pub categories: Vec<Category>,
}

#[derive(Deserialize)]
struct CategoriesDocument {
    category_list: CategoryListWire,
}

#[derive(Deserialize)]
struct CategoryListWire {
    #[serde(default, deserialize_with = "null_default")]
    can_create_category: bool,
    #[serde(default, deserialize_with = "null_default")]
    can_create_topic: bool,
    #[serde(default, deserialize_with = "null_default")]
    categories: Vec<Category>,
}

impl CategoryList {
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        let doc: CategoriesDocument = serde_json::from_slice(body)?;
        Ok(Self {
            can_create_category: doc.category_list.can_create_category,
            can_create_topic: doc.category_list.can_create_topic,
            categories: doc.category_list.categories,
        })
    }
}

/// id → (name, color) lookup for enriching topics.
#[derive(Debug, Clone, Default)]
pub struct CategoryIndex {
    by_id: HashMap<i64, (String, String)>,
}

impl CategoryIndex {
    pub fn new(categories: &[Category]) -> Self {
        Self {
            by_id: categories
                .iter()
                .map(|c| (c.id, (c.name.clone(), c.color.clone())))
                .collect(),
        }
    }

    /// Fill `category_name`/`category_color` for every topic whose category
    /// is known. Unknown or absent ids are left untouched. Returns the number
    /// of topics enriched.
    pub fn enrich(&self, topics: &mut [Topic]) -> usize {
        let mut enriched = 0;
        for topic in topics {
            let Some((name, color)) = topic.category_id.and_then(|id| self.by_id.get(&id)) else {
                continue;
            };
            topic.category_name = Some(name.clone());
            topic.category_color = Some(color.clone());
            enriched += 1;
        }
        enriched
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

// ============================================================================
// Requests
// ============================================================================

/// Body of `POST /posts.json` when opening a new topic.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewTopic {
    pub title: String,
    pub raw: String,
    /// Left out when unset so the forum picks its default category.
    /// Discourse rejects an explicit `null` category on some sites.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<i64>,
    pub tags: Vec<String>,
    pub archetype: &'static str,
}

impl NewTopic {
    pub fn new(title: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            raw: raw.into(),
            category: None,
            tags: Vec::new(),
            archetype: "regular",
        }
    }

    pub fn category(mut self, id: Option<i64>) -> Self {
        self.category = id;
        self
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn topic(id: i64) -> Topic {
        Topic {
            id,
            title: format!("Topic {id}"),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_latest_with_nulls_and_object_tags() {
        let body = br#"{
            "users": [{"id": 1, "username": "alice", "name": null, "avatar_template": "/a/{size}.png", "trust_level": 2}],
            "topic_list": {
                "can_create_topic": true,
                "more_topics_url": "/latest?page=1",
                "per_page": 30,
                "topics": [
                    {"id": 10, "title": "Hello", "category_id": 4, "tags": ["rust", "tui"],
                     "reply_count": 3, "views": 99, "created_at": "2024-01-02T03:04:05.000Z",
                     "pinned": true, "closed": false, "image_url": null, "last_poster_username": "bob"},
                    {"id": 11, "title": "World", "category_id": null,
                     "tags": [{"id": 1, "name": "meta", "slug": "meta"}], "views": null}
                ]
            }
        }"#;

        let page = TopicPage::from_json(body).unwrap();
        assert_eq!(page.more_cursor, "/latest?page=1");
        assert!(page.can_create_topic);
        assert_eq!(page.per_page, 30);
        assert_eq!(page.users[0].username, "alice");
        assert_eq!(page.topics.len(), 2);
        assert_eq!(page.topics[0].tags, vec!["rust", "tui"]);
        assert!(page.topics[0].pinned);
        assert!(page.topics[0].created_at.is_some());
        assert_eq!(page.topics[1].category_id, None);
        assert_eq!(page.topics[1].tags, vec!["meta"]);
        assert_eq!(page.topics[1].views, 0);
    }

    #[test]
    fn test_missing_topic_list_is_error() {
        assert!(TopicPage::from_json(br#"{"users": []}"#).is_err());
        assert!(TopicPage::from_json(b"<html>").is_err());
    }

    #[test]
    fn test_append_skips_duplicates_and_takes_cursor() {
        let mut page = TopicPage {
            topics: vec![topic(1), topic(2)],
            more_cursor: "/latest?page=1".into(),
            ..Default::default()
        };
        let next = TopicPage {
            topics: vec![topic(2), topic(3)],
            more_cursor: String::new(),
            ..Default::default()
        };

        assert_eq!(page.append(next), 1);
        let ids: Vec<i64> = page.topics.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(!page.has_more());
    }

    #[test]
    fn test_post_likes_from_actions_summary() {
        let post: Post = serde_json::from_str(
            r#"{"id": 5, "username": "carol", "name": "Carol", "post_number": 1,
                "actions_summary": [{"id": 3, "count": 9}, {"id": 2, "count": 4, "acted": true}]}"#,
        )
        .unwrap();
        assert_eq!(post.like_count(), 4);
        assert!(post.liked());
        assert_eq!(post.author(), "Carol (carol)");

        let unliked = Post::default();
        assert_eq!(unliked.like_count(), 0);
        assert!(!unliked.liked());
    }

    #[test]
    fn test_post_page_orders_and_dedups() {
        let post = |id, n| Post {
            id,
            post_number: n,
            ..Default::default()
        };
        let page = PostPage::new(7, vec![post(3, 3), post(1, 1), post(2, 2), post(9, 1)]);
        let numbers: Vec<u32> = page.posts.iter().map(|p| p.post_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_replace_post() {
        let mut page = PostPage::new(
            7,
            vec![Post {
                id: 1,
                post_number: 1,
                ..Default::default()
            }],
        );
        let updated = Post {
            id: 1,
            post_number: 1,
            reads: 42,
            ..Default::default()
        };
        assert!(page.replace_post(updated));
        assert_eq!(page.posts[0].reads, 42);
        assert!(!page.replace_post(Post {
            id: 99,
            ..Default::default()
        }));
    }

    #[test]
    fn test_enrich_leaves_unknown_categories_alone() {
        let index = CategoryIndex::new(&[Category {
            id: 4,
            name: "Support".into(),
            color: "0088CC".into(),
            ..Default::default()
        }]);
        let mut topics = vec![
            Topic {
                category_id: Some(4),
                ..topic(1)
            },
            Topic {
                category_id: Some(99),
                ..topic(2)
            },
            topic(3),
        ];

        assert_eq!(index.enrich(&mut topics), 1);
        assert_eq!(topics[0].category_name.as_deref(), Some("Support"));
        assert_eq!(topics[0].category_color.as_deref(), Some("0088CC"));
        assert_eq!(topics[1].category_name, None);
        assert_eq!(topics[2].category_color, None);
    }

    #[test]
    fn test_new_topic_always_sends_tags() {
        let body = serde_json::to_value(NewTopic::new("Title", "Body").category(Some(3))).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "title": "Title",
                "raw": "Body",
                "category": 3,
                "tags": [],
                "archetype": "regular"
            })
        );
    }

    #[test]
    fn test_new_topic_without_category_omits_it() {
        let topic = NewTopic::new("Title", "Body").tags(vec!["rust".to_string()]);
        let body = serde_json::to_value(topic).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "title": "Title",
                "raw": "Body",
                "tags": ["rust"],
                "archetype": "regular"
            })
        );
    }
}
