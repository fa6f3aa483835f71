//! Discourse forum access over a cookie-authenticated browser session.
//!
//! - `client` - construction, CSRF, login, latest topics, writes
//! - `pager` - continuation cursors, load-all, post batches
//! - `categories` - cache-first category list and topic enrichment
//! - `types` - value objects shared with the UI and exporters

mod categories;
mod client;
mod error;
mod pager;
mod types;

pub use client::{
    normalize_base_url, ClientOptions, DiscourseClient, DEFAULT_PAGE_COOLDOWN, DEFAULT_TIMEOUT,
};
pub use error::ClientError;
pub use pager::DEFAULT_MAX_PAGES;
pub use types::{
    ActionSummary, Category, CategoryIndex, CategoryList, NewTopic, Post, PostPage, Topic,
    TopicPage, User, LIKE_ACTION_ID,
};
