use super::types::{NewTopic, Post, TopicPage, LIKE_ACTION_ID};
use super::ClientError;
use crate::session::{Session, SessionStore};
use crate::storage::{CacheResource, InstanceCache};
use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::redirect::Policy;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use url::{form_urlencoded, Url};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_PAGE_COOLDOWN: Duration = Duration::from_millis(500);

const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// The forum serves the same endpoints to its own web app; looking like a
/// browser keeps cookie-authenticated requests on that code path.
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";
const XHR_ACCEPT: &str = "application/json, text/javascript, */*; q=0.01";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";

/// Tunables for [`DiscourseClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Client-wide per-request timeout.
    pub timeout: Duration,
    /// Pause between successive paginated requests.
    pub page_cooldown: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            page_cooldown: DEFAULT_PAGE_COOLDOWN,
        }
    }
}

/// Cookie-authenticated client for one Discourse instance.
///
/// Cloning is cheap: clones share the HTTP connection pool, the cookie jar,
/// and the session store, so a clone can be moved into a spawned task.
#[derive(Clone)]
pub struct DiscourseClient {
    pub(super) http: reqwest::Client,
    base: Arc<str>,
    base_url: Url,
    session: Session,
    store: Arc<SessionStore>,
    pub(super) cache: InstanceCache,
    pub(super) page_cooldown: Duration,
}

/// Limit redirects to 3 hops and fail on loops.
fn create_redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= 3 {
            return attempt.error("Too many redirects (max 3)");
        }
        let url = attempt.url();
        if attempt.previous().iter().any(|prev| prev.as_str() == url.as_str()) {
            return attempt.error("Redirect loop detected");
        }
        tracing::debug!(to = %url, hop = attempt.previous().len() + 1, "Following redirect");
        attempt.follow()
    })
}

/// Normalize a user-supplied instance address.
///
/// A missing scheme defaults to `https://`; the trailing slash, query and
/// fragment are dropped.
///
/// ```
/// use lurk::discourse::normalize_base_url;
///
/// assert_eq!(normalize_base_url("forum.example.com").unwrap(), "https://forum.example.com");
/// assert_eq!(normalize_base_url("http://localhost:3000/").unwrap(), "http://localhost:3000");
/// ```
pub fn normalize_base_url(raw: &str) -> Result<String, ClientError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ClientError::Config("instance URL is empty".to_string()));
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let mut url = Url::parse(&with_scheme)
        .map_err(|e| ClientError::Config(format!("{}: {}", trimmed, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ClientError::Config(format!(
            "{}: unsupported scheme '{}'",
            trimmed,
            url.scheme()
        )));
    }
    if url.host_str().is_none() {
        return Err(ClientError::Config(format!("{}: missing host", trimmed)));
    }
    url.set_query(None);
    url.set_fragment(None);

    Ok(url.as_str().trim_end_matches('/').to_string())
}

/// Read a response body through `bytes_stream`, refusing anything over `limit`.
async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, ClientError> {
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(ClientError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(ClientError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

/// Discourse answers a rejected login with HTTP 200 and `{"error": "..."}`.
fn login_rejection(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    let reason = value.get("error")?.as_str()?.trim();
    (!reason.is_empty()).then(|| reason.to_string())
}

impl DiscourseClient {
    pub fn new(
        base_url: &str,
        store: SessionStore,
        cache_root: impl Into<PathBuf>,
    ) -> Result<Self, ClientError> {
        Self::with_options(base_url, store, cache_root, ClientOptions::default())
    }

    pub fn with_options(
        base_url: &str,
        store: SessionStore,
        cache_root: impl Into<PathBuf>,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        let base = normalize_base_url(base_url)?;
        let url = Url::parse(&format!("{}/", base))
            .map_err(|e| ClientError::Config(format!("{}: {}", base, e)))?;

        let session = Session::new(url.clone());
        let http = reqwest::Client::builder()
            .cookie_provider(session.jar())
            .user_agent(USER_AGENT)
            .redirect(create_redirect_policy())
            .timeout(options.timeout)
            .build()
            .map_err(ClientError::Transport)?;

        tracing::debug!(
            base_url = %base,
            timeout_ms = options.timeout.as_millis() as u64,
            cooldown_ms = options.page_cooldown.as_millis() as u64,
            "Created forum client"
        );

        Ok(Self {
            http,
            cache: InstanceCache::new(cache_root, &url),
            base: Arc::from(base),
            base_url: url,
            session,
            store: Arc::new(store),
            page_cooldown: options.page_cooldown,
        })
    }

    /// Normalized base URL without trailing slash.
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn cache(&self) -> &InstanceCache {
        &self.cache
    }

    pub fn page_cooldown(&self) -> Duration {
        self.page_cooldown
    }

    pub(super) fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base, path)
        } else {
            format!("{}/{}", self.base, path)
        }
    }

    /// Browser URL for a topic, for "open in browser".
    pub fn topic_web_url(&self, topic_id: i64, slug: &str) -> String {
        if slug.is_empty() {
            self.url(&format!("/t/{}", topic_id))
        } else {
            self.url(&format!("/t/{}/{}", slug, topic_id))
        }
    }

    // ========================================================================
    // Session persistence
    // ========================================================================

    /// Load persisted cookies into the live jar. Returns the cookie count.
    pub fn load_session(&self) -> Result<usize, ClientError> {
        Ok(self.store.load_into(&self.session)?)
    }

    pub fn save_session(&self) -> Result<(), ClientError> {
        Ok(self.store.save(&self.session)?)
    }

    // ========================================================================
    // Request plumbing
    // ========================================================================

    pub(super) async fn execute(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<(StatusCode, Vec<u8>), ClientError> {
        let response = request.send().await?;
        let status = response.status();
        let body = read_limited_bytes(response, MAX_RESPONSE_SIZE).await?;
        Ok((status, body))
    }

    /// Execute and require a 2xx status.
    pub(super) async fn send(&self, request: reqwest::RequestBuilder) -> Result<Vec<u8>, ClientError> {
        let (status, body) = self.execute(request).await?;
        if !status.is_success() {
            return Err(ClientError::protocol(status, &body));
        }
        Ok(body)
    }

    pub(super) async fn get_json(&self, url: &str) -> Result<Vec<u8>, ClientError> {
        tracing::debug!(url = %url, "GET");
        self.send(self.http.get(url).header(ACCEPT, "application/json"))
            .await
    }

    fn xhr_post(&self, path: &str, csrf: &str) -> reqwest::RequestBuilder {
        self.http
            .post(self.url(path))
            .header("X-CSRF-Token", csrf)
            .header("X-Requested-With", "XMLHttpRequest")
    }

    // ========================================================================
    // Authentication
    // ========================================================================

    /// Fetch a fresh CSRF token.
    ///
    /// A response without a `csrf` field is a decode error; a present but
    /// empty token is an auth error.
    pub async fn fetch_csrf_token(&self) -> Result<String, ClientError> {
        #[derive(Deserialize)]
        struct CsrfResponse {
            csrf: String,
        }

        let body = self
            .send(
                self.http
                    .get(self.url("/session/csrf"))
                    .header(ACCEPT, XHR_ACCEPT)
                    .header("Discourse-Present", "true")
                    .header("X-Requested-With", "XMLHttpRequest"),
            )
            .await?;

        let parsed: CsrfResponse =
            serde_json::from_slice(&body).map_err(ClientError::decode("/session/csrf"))?;
        if parsed.csrf.trim().is_empty() {
            return Err(ClientError::Auth(
                "forum returned an empty CSRF token".to_string(),
            ));
        }
        Ok(parsed.csrf)
    }

    /// Sign in with username/email and password, then persist the session.
    ///
    /// Nothing is written unless the forum answered 200 without an error
    /// payload and actually set at least one cookie.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<(), ClientError> {
        let csrf = self.fetch_csrf_token().await?;

        let form = form_urlencoded::Serializer::new(String::new())
            .append_pair("login", username)
            .append_pair("password", password.expose_secret())
            .append_pair("authenticity_token", &csrf)
            .finish();

        let (status, body) = self
            .execute(
                self.xhr_post("/session", &csrf)
                    .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
                    .header(ACCEPT, XHR_ACCEPT)
                    .body(form),
            )
            .await?;

        if status != StatusCode::OK {
            return Err(ClientError::protocol(status, &body));
        }
        if let Some(reason) = login_rejection(&body) {
            return Err(ClientError::Auth(reason));
        }

        self.save_session()?;
        tracing::info!(base_url = %self.base, user = %username, "Logged in");
        Ok(())
    }

    // ========================================================================
    // Topic lists
    // ========================================================================

    /// First page of the latest-topics list.
    ///
    /// The raw body is written to the instance cache (best-effort) and the
    /// topics are enriched with category metadata (best-effort).
    pub async fn latest_topics(&self) -> Result<TopicPage, ClientError> {
        let body = self.get_json(&self.url("/latest.json")).await?;
        let mut page = TopicPage::from_json(&body).map_err(ClientError::decode("/latest.json"))?;
        self.cache.store(CacheResource::Latest, &body);
        self.enrich(&mut page).await;
        tracing::debug!(
            topics = page.topics.len(),
            has_more = page.has_more(),
            "Fetched latest topics"
        );
        Ok(page)
    }

    /// Re-fetch the first page, replacing the cached snapshot.
    pub async fn refresh_topics(&self) -> Result<TopicPage, ClientError> {
        tracing::debug!("Refreshing topics");
        self.latest_topics().await
    }

    /// Topic list from the instance cache, if a parseable snapshot exists.
    pub async fn cached_topics(&self) -> Option<TopicPage> {
        let entry = match self.cache.read(CacheResource::Latest) {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read cached topics");
                return None;
            }
        };

        match TopicPage::from_json(&entry.payload) {
            Ok(mut page) if !page.topics.is_empty() => {
                self.enrich(&mut page).await;
                tracing::info!(
                    instance = %entry.instance_key,
                    topics = page.topics.len(),
                    "Loaded topics from cache"
                );
                Some(page)
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Cached topic list is unreadable, ignoring");
                None
            }
        }
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Open a new topic. Returns its first post.
    pub async fn create_topic(&self, draft: &NewTopic) -> Result<Post, ClientError> {
        let csrf = self.fetch_csrf_token().await?;
        let payload =
            serde_json::to_vec(draft).map_err(|e| ClientError::Validation(e.to_string()))?;

        let (status, body) = self
            .execute(
                self.xhr_post("/posts.json", &csrf)
                    .header(CONTENT_TYPE, "application/json")
                    .header(ACCEPT, "application/json")
                    .body(payload),
            )
            .await?;

        if status != StatusCode::OK && status != StatusCode::CREATED {
            return Err(ClientError::protocol(status, &body));
        }

        let post: Post =
            serde_json::from_slice(&body).map_err(ClientError::decode("/posts.json"))?;
        if post.id == 0 {
            return Err(ClientError::Validation(
                "forum reported success but the created post has id 0".to_string(),
            ));
        }

        tracing::info!(post_id = post.id, topic_id = post.topic_id, "Created topic");
        Ok(post)
    }

    /// Apply a post action (like, flag, ...). Returns the updated post with
    /// a refreshed `actions_summary`.
    pub async fn perform_post_action(
        &self,
        post_id: i64,
        action_type_id: i64,
        flag_topic: bool,
    ) -> Result<Post, ClientError> {
        let csrf = self.fetch_csrf_token().await?;

        let form = form_urlencoded::Serializer::new(String::new())
            .append_pair("id", &post_id.to_string())
            .append_pair("post_action_type_id", &action_type_id.to_string())
            .append_pair("flag_topic", if flag_topic { "true" } else { "false" })
            .finish();

        let (status, body) = self
            .execute(
                self.xhr_post("/post_actions", &csrf)
                    .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
                    .header(ACCEPT, XHR_ACCEPT)
                    .body(form),
            )
            .await?;

        if status != StatusCode::OK {
            return Err(ClientError::protocol(status, &body));
        }

        let post: Post =
            serde_json::from_slice(&body).map_err(ClientError::decode("/post_actions"))?;
        tracing::debug!(post_id, action_type_id, "Post action applied");
        Ok(post)
    }

    pub async fn like_post(&self, post_id: i64) -> Result<Post, ClientError> {
        self.perform_post_action(post_id, LIKE_ACTION_ID, false)
            .await
    }
}

impl std::fmt::Debug for DiscourseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscourseClient")
            .field("base", &self.base)
            .field("session", &self.session)
            .field("page_cooldown", &self.page_cooldown)
            .finish_non_exhaustive()
    }
}
