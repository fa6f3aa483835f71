//! Browser-style forum session: an in-memory cookie jar bound to one
//! instance URL, plus the on-disk store that persists it between runs.
//!
//! The jar is shared with `reqwest` as its cookie provider, so every request
//! made through the HTTP client reads and updates the same cookies that
//! [`SessionStore::save`] later writes out.

mod crypto;
mod store;

use reqwest::cookie::{CookieStore, Jar};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

pub use crypto::{decrypt, encrypt};
pub use store::{parse_cookie_lines, SessionStore};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum SessionError {
    /// No session file exists yet (first run or after logout).
    #[error("No session file at {0}")]
    NotFound(PathBuf),

    /// The jar held zero cookies for the instance; nothing worth persisting.
    #[error("No cookies to save")]
    NoCookies,

    /// Authenticated decryption failed (wrong passphrase or tampered file).
    #[error("Could not decrypt session file: wrong passphrase?")]
    AuthFailed,

    /// The file is structurally unusable (truncated blob, non-UTF-8 payload).
    #[error("Session file is corrupt: {0}")]
    Corrupt(String),

    #[error("Session file I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Session
// ============================================================================

/// A single `name=value` cookie as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CookiePair {
    pub name: String,
    pub value: String,
}

impl CookiePair {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Cookie jar scoped to one forum instance.
///
/// Cloning is cheap and every clone shares the same jar.
#[derive(Clone)]
pub struct Session {
    base_url: Url,
    jar: Arc<Jar>,
}

impl Session {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            jar: Arc::new(Jar::default()),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Handle to hand to `reqwest::ClientBuilder::cookie_provider`.
    pub fn jar(&self) -> Arc<Jar> {
        Arc::clone(&self.jar)
    }

    /// Insert a cookie as if the instance had set it with `Path=/`.
    pub fn insert(&self, cookie: &CookiePair) {
        let header = format!("{}={}; Path=/", cookie.name, cookie.value);
        self.jar.add_cookie_str(&header, &self.base_url);
    }

    pub fn insert_all(&self, cookies: &[CookiePair]) {
        for cookie in cookies {
            self.insert(cookie);
        }
    }

    /// Cookies the jar would currently send to the instance root.
    pub fn cookies(&self) -> Vec<CookiePair> {
        let Some(header) = self.jar.cookies(&self.base_url) else {
            return Vec::new();
        };
        let Ok(header) = header.to_str() else {
            tracing::warn!("Cookie header for instance is not valid UTF-8, ignoring");
            return Vec::new();
        };

        header
            .split(';')
            .filter_map(|part| {
                let (name, value) = part.trim().split_once('=')?;
                let name = name.trim();
                (!name.is_empty()).then(|| CookiePair::new(name, value.trim()))
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies().is_empty()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Cookie values are credentials; only the count is shown.
        f.debug_struct("Session")
            .field("base_url", &self.base_url.as_str())
            .field("cookies", &self.cookies().len())
            .finish()
    }
}
