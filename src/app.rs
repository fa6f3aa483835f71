use crate::config::Config;
use crate::discourse::{ClientError, DiscourseClient, NewTopic, Post, PostPage, Topic, TopicPage};
use crate::theme::Palette;
use crate::util::cooked_to_text;
use chrono::{DateTime, Local};
use std::borrow::Cow;
use std::time::Duration;
use tokio::time::Instant;

/// Maximum scroll offset for the viewport (ratatui u16 limit).
pub const MAX_SCROLL: usize = u16::MAX as usize;

// ============================================================================
// View and Sync State
// ============================================================================

/// Current view mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Browse,  // Topic list + post viewport
    Reader,  // Full-screen post viewport
    Compose, // New topic form
}

/// Which of the two concurrent post fetches produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostsOrigin {
    /// Page 1 straight from the topic document.
    FirstPage,
    /// Every post via the id-batch endpoint.
    Full,
}

/// In-flight flags, one per operation kind.
///
/// Kinds are independent: a refresh may run while a load-more is pending.
/// A second request of a kind that is already in flight is dropped.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncState {
    pub refreshing: bool,
    pub loading_more: bool,
    pub loading_all: bool,
    /// Outstanding post fetches for the open topic (0, 1 or 2).
    pub posts_in_flight: u8,
    pub creating_topic: bool,
}

impl SyncState {
    pub fn loading_posts(&self) -> bool {
        self.posts_in_flight > 0
    }

    pub fn is_idle(&self) -> bool {
        *self == SyncState::default()
    }
}

/// Background operations, for routing panics back to the right flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Refresh,
    LoadMore,
    LoadAll,
    Posts(PostsOrigin),
    CreateTopic,
    PostAction,
}

impl Task {
    pub fn name(self) -> &'static str {
        match self {
            Task::Refresh => "refresh",
            Task::LoadMore => "load more",
            Task::LoadAll => "load all",
            Task::Posts(_) => "load posts",
            Task::CreateTopic => "create topic",
            Task::PostAction => "post action",
        }
    }
}

/// Events from background tasks
pub enum AppEvent {
    TopicsRefreshed(Result<TopicPage, ClientError>),
    MoreTopicsLoaded(Result<TopicPage, ClientError>),
    AllTopicsLoaded(Result<TopicPage, ClientError>),
    PostsLoaded {
        topic_id: i64,
        origin: PostsOrigin,
        result: Result<PostPage, ClientError>,
    },
    TopicCreated(Result<Post, ClientError>),
    PostActionCompleted {
        post_id: i64,
        result: Result<Post, ClientError>,
    },
    /// A background task panicked.
    ///
    /// Fields:
    /// - `task`: Which operation panicked, so its flag can be cleared
    /// - `error`: The panic message extracted from the panic payload
    TaskPanicked { task: Task, error: String },
}

// ============================================================================
// Reader
// ============================================================================

/// The post viewport for the open topic.
///
/// Both post fetches write into this one slot and the later arrival wins,
/// except that a first-page result never replaces a full result for the
/// same topic.
pub struct ReaderState {
    pub topic_id: i64,
    pub title: String,
    pub slug: String,
    pub posts: Option<PostPage>,
    pub origin: Option<PostsOrigin>,
    /// Plain-text bodies, parallel to `posts.posts`.
    pub bodies: Vec<String>,
    pub error: Option<String>,
    pub selected_post: usize,
    pub scroll: usize,
    /// Line offset of each post in the last render, for jumping between posts.
    pub post_offsets: Vec<usize>,
}

impl ReaderState {
    pub fn new(topic: &Topic) -> Self {
        Self {
            topic_id: topic.id,
            title: topic.title.clone(),
            slug: topic.slug.clone(),
            posts: None,
            origin: None,
            bodies: Vec::new(),
            error: None,
            selected_post: 0,
            scroll: 0,
            post_offsets: Vec::new(),
        }
    }

    fn set_posts(&mut self, page: PostPage, origin: PostsOrigin) {
        self.bodies = page.posts.iter().map(|p| cooked_to_text(&p.cooked)).collect();
        self.selected_post = self.selected_post.min(page.posts.len().saturating_sub(1));
        self.posts = Some(page);
        self.origin = Some(origin);
        self.error = None;
    }

    pub fn selected(&self) -> Option<&Post> {
        self.posts.as_ref()?.posts.get(self.selected_post)
    }

    pub fn post_count(&self) -> usize {
        self.posts.as_ref().map_or(0, |p| p.posts.len())
    }

    /// Move the post selection and scroll to it.
    pub fn select_post(&mut self, delta: isize) {
        let count = self.post_count();
        if count == 0 {
            return;
        }
        self.selected_post = self
            .selected_post
            .saturating_add_signed(delta)
            .min(count - 1);
        if let Some(&offset) = self.post_offsets.get(self.selected_post) {
            self.scroll = offset;
        }
    }

    pub fn scroll_by(&mut self, delta: isize) {
        self.scroll = self.scroll.saturating_add_signed(delta).min(MAX_SCROLL);
    }

    /// Some action responses omit `cooked`; the shown body is kept then.
    fn replace_post(&mut self, mut post: Post) -> bool {
        let Some(page) = self.posts.as_mut() else {
            return false;
        };
        let Some(idx) = page.posts.iter().position(|p| p.id == post.id) else {
            return false;
        };
        if post.cooked.is_empty() {
            post.cooked = std::mem::take(&mut page.posts[idx].cooked);
        } else if let Some(body) = self.bodies.get_mut(idx) {
            *body = cooked_to_text(&post.cooked);
        }
        page.replace_post(post)
    }
}

// ============================================================================
// Compose Form
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeField {
    Title,
    Body,
    Category,
    Tags,
}

impl ComposeField {
    pub fn next(self) -> Self {
        match self {
            Self::Title => Self::Body,
            Self::Body => Self::Category,
            Self::Category => Self::Tags,
            Self::Tags => Self::Title,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeForm {
    pub title: String,
    pub body: String,
    pub category: String,
    pub tags: String,
    pub focus: ComposeField,
    pub submitting: bool,
    pub error: Option<String>,
}

impl Default for ComposeForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            body: String::new(),
            category: String::new(),
            tags: String::new(),
            focus: ComposeField::Title,
            submitting: false,
            error: None,
        }
    }
}

impl ComposeForm {
    pub fn field_mut(&mut self) -> &mut String {
        match self.focus {
            ComposeField::Title => &mut self.title,
            ComposeField::Body => &mut self.body,
            ComposeField::Category => &mut self.category,
            ComposeField::Tags => &mut self.tags,
        }
    }

    /// Validate the form into a request body.
    pub fn to_draft(&self) -> Result<NewTopic, String> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err("Title is required".to_string());
        }
        if self.body.trim().is_empty() {
            return Err("Body is required".to_string());
        }

        let category = match self.category.trim() {
            "" => None,
            raw => Some(
                raw.parse::<i64>()
                    .map_err(|_| format!("Category must be a numeric id, got '{}'", raw))?,
            ),
        };

        let tags = self
            .tags
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();

        Ok(NewTopic::new(title, self.body.clone())
            .category(category)
            .tags(tags))
    }
}

// ============================================================================
// Application State
// ============================================================================

/// Interactive state. Mutated only on the UI task; background results
/// arrive as [`AppEvent`]s and are applied one at a time.
pub struct App {
    pub client: DiscourseClient,
    pub palette: Palette,

    pub topics: TopicPage,
    /// Index into `visible_topics()`.
    pub selected_topic: usize,
    pub filter: String,
    pub filter_mode: bool,

    pub sync: SyncState,
    pub reader: Option<ReaderState>,
    pub compose: Option<ComposeForm>,
    pub view: View,
    pub show_help: bool,
    pub help_scroll: usize,

    pub status_message: Option<(Cow<'static, str>, Instant)>,
    pub needs_redraw: bool,

    pub refresh_interval: Duration,
    pub next_auto_refresh: Instant,
    pub last_refreshed: Option<DateTime<Local>>,
    pub max_pages: usize,
}

impl App {
    pub fn new(client: DiscourseClient, topics: TopicPage, config: &Config) -> Self {
        let refresh_interval = Duration::from_secs(config.refresh_interval_minutes.max(1) * 60);
        Self {
            client,
            palette: Palette::from_config(&config.colors),
            topics,
            selected_topic: 0,
            filter: String::new(),
            filter_mode: false,
            sync: SyncState::default(),
            reader: None,
            compose: None,
            view: View::Browse,
            show_help: false,
            help_scroll: 0,
            status_message: None,
            needs_redraw: true,
            refresh_interval,
            next_auto_refresh: Instant::now() + refresh_interval,
            last_refreshed: None,
            max_pages: config.max_pages,
        }
    }

    /// Set a status message that expires after 3 seconds.
    pub fn set_status(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.status_message = Some((msg.into(), Instant::now()));
    }

    /// Clear status message if expired (older than 3 seconds)
    /// Returns true if a message was actually cleared
    pub fn clear_expired_status(&mut self) -> bool {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed().as_secs() >= 3 {
                self.status_message = None;
                return true;
            }
        }
        false
    }

    // ========================================================================
    // Topic list
    // ========================================================================

    /// Topics passing the title filter, in list order.
    pub fn visible_topics(&self) -> Vec<&Topic> {
        let needle = self.filter.to_lowercase();
        self.topics
            .topics
            .iter()
            .filter(|t| t.title_matches(&needle))
            .collect()
    }

    pub fn selected_topic(&self) -> Option<&Topic> {
        self.visible_topics().get(self.selected_topic).copied()
    }

    pub fn move_selection(&mut self, delta: isize) {
        let len = self.visible_topics().len();
        if len == 0 {
            self.selected_topic = 0;
            return;
        }
        self.selected_topic = self
            .selected_topic
            .saturating_add_signed(delta)
            .min(len - 1);
    }

    pub fn set_filter(&mut self, filter: String) {
        self.filter = filter;
        self.selected_topic = 0;
    }

    /// Swap in a new topic set, keeping the cursor on the same topic when it
    /// is still present.
    fn replace_topics(&mut self, page: TopicPage) {
        let keep = self.selected_topic().map(|t| t.id);
        self.topics = page;
        self.selected_topic = keep
            .and_then(|id| self.visible_topics().iter().position(|t| t.id == id))
            .unwrap_or(0);
        self.move_selection(0);
    }

    // ========================================================================
    // Refresh timer
    // ========================================================================

    /// True when the periodic refresh is due. Firing re-arms the timer
    /// unconditionally, whatever the refresh outcome turns out to be.
    pub fn take_refresh_due(&mut self, now: Instant) -> bool {
        if now < self.next_auto_refresh {
            return false;
        }
        self.next_auto_refresh = now + self.refresh_interval;
        true
    }

    // ========================================================================
    // Result merging
    // ========================================================================

    pub fn apply_refresh(&mut self, result: Result<TopicPage, ClientError>) {
        self.sync.refreshing = false;
        match result {
            Ok(page) => {
                let count = page.topics.len();
                self.replace_topics(page);
                self.last_refreshed = Some(Local::now());
                self.set_status(format!("Refreshed: {} topics", count));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Refresh failed");
                self.set_status(format!("Refresh failed: {}", e));
            }
        }
    }

    pub fn apply_more(&mut self, result: Result<TopicPage, ClientError>) {
        self.sync.loading_more = false;
        match result {
            Ok(page) => {
                let added = self.topics.append(page);
                let tail = if self.topics.has_more() { "" } else { " (end of list)" };
                self.set_status(format!("Loaded {} more topics{}", added, tail));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Load more failed");
                self.set_status(format!("Load more failed: {}", e));
            }
        }
    }

    pub fn apply_all(&mut self, result: Result<TopicPage, ClientError>) {
        self.sync.loading_all = false;
        match result {
            Ok(page) => {
                let count = page.topics.len();
                self.replace_topics(page);
                self.last_refreshed = Some(Local::now());
                self.set_status(format!("Loaded {} topics", count));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Load all failed");
                self.set_status(format!("Load all failed: {}", e));
            }
        }
    }

    pub fn apply_posts(
        &mut self,
        topic_id: i64,
        origin: PostsOrigin,
        result: Result<PostPage, ClientError>,
    ) {
        self.sync.posts_in_flight = self.sync.posts_in_flight.saturating_sub(1);

        let Some(reader) = self.reader.as_mut().filter(|r| r.topic_id == topic_id) else {
            tracing::debug!(topic_id, "Dropping posts for a topic that is no longer open");
            return;
        };

        match result {
            Ok(page) => {
                if origin == PostsOrigin::FirstPage && reader.origin == Some(PostsOrigin::Full) {
                    tracing::debug!(topic_id, "Full post set already shown, ignoring first page");
                    return;
                }
                reader.set_posts(page, origin);
            }
            Err(e) => {
                tracing::warn!(topic_id, ?origin, error = %e, "Loading posts failed");
                if reader.posts.is_none() {
                    reader.error = Some(e.to_string());
                }
                self.set_status(format!("Loading posts failed: {}", e));
            }
        }
    }

    pub fn apply_topic_created(&mut self, result: Result<Post, ClientError>) -> bool {
        self.sync.creating_topic = false;
        match result {
            Ok(post) => {
                tracing::info!(topic_id = post.topic_id, "Topic created");
                self.compose = None;
                self.view = View::Browse;
                self.set_status("Topic created");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Create topic failed");
                if let Some(form) = self.compose.as_mut() {
                    form.submitting = false;
                    form.error = Some(e.to_string());
                }
                self.set_status(format!("Create topic failed: {}", e));
                false
            }
        }
    }

    pub fn apply_post_action(&mut self, post_id: i64, result: Result<Post, ClientError>) {
        match result {
            Ok(post) => {
                let liked = post.liked();
                let replaced = self
                    .reader
                    .as_mut()
                    .is_some_and(|r| r.replace_post(post));
                if !replaced {
                    tracing::debug!(post_id, "Updated post is not in the open topic");
                }
                self.set_status(if liked { "Liked" } else { "Post updated" });
            }
            Err(e) => {
                tracing::warn!(post_id, error = %e, "Post action failed");
                self.set_status(format!("Like failed: {}", e));
            }
        }
    }

    /// Clear the flag owned by a task that panicked.
    pub fn apply_task_panic(&mut self, task: Task, error: &str) {
        tracing::error!(task = task.name(), error, "Background task panicked");
        match task {
            Task::Refresh => self.sync.refreshing = false,
            Task::LoadMore => self.sync.loading_more = false,
            Task::LoadAll => self.sync.loading_all = false,
            Task::Posts(_) => {
                self.sync.posts_in_flight = self.sync.posts_in_flight.saturating_sub(1)
            }
            Task::CreateTopic => {
                self.sync.creating_topic = false;
                if let Some(form) = self.compose.as_mut() {
                    form.submitting = false;
                }
            }
            Task::PostAction => {}
        }
        self.set_status(format!("Internal error in {} task", task.name()));
    }
}
