use crate::session::SessionError;
use thiserror::Error;

/// Longest response body kept inside a `Protocol` error.
const MAX_ERROR_BODY: usize = 512;

/// Errors returned by [`DiscourseClient`](super::DiscourseClient).
///
/// Every failure is returned to the caller. The client never swallows
/// errors except best-effort cache writes and category enrichment.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Missing or unusable instance URL.
    #[error("Invalid instance URL: {0}")]
    Config(String),

    /// DNS, connect, TLS, or body-stream failure.
    #[error("Network error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The 10 second client-wide timeout elapsed.
    #[error("Request timed out")]
    Timeout,

    /// Non-2xx response.
    #[error("{status_line}: {body}")]
    Protocol {
        status: u16,
        status_line: String,
        body: String,
    },

    /// Malformed JSON or a required field is missing.
    #[error("Unexpected response from {context}: {source}")]
    Decode {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),

    /// Empty CSRF token or credentials rejected by the forum.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The forum accepted the request but the result is unusable.
    #[error("Rejected by forum: {0}")]
    Validation(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout
        } else {
            ClientError::Transport(e)
        }
    }
}

impl ClientError {
    pub(crate) fn protocol(status: reqwest::StatusCode, body: &[u8]) -> Self {
        let mut body = String::from_utf8_lossy(body).into_owned();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
            body.push_str("...");
        }
        ClientError::Protocol {
            status: status.as_u16(),
            status_line: status.to_string(),
            body,
        }
    }

    pub(crate) fn decode(context: &'static str) -> impl FnOnce(serde_json::Error) -> Self {
        move |source| ClientError::Decode { context, source }
    }

    /// Returns true if retrying the same request later could succeed.
    ///
    /// Transport failures, timeouts, 5xx and 429 are transient. Everything
    /// else is structural and should be surfaced, not retried.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Transport(_) | ClientError::Timeout => true,
            ClientError::Protocol { status, .. } => *status >= 500 || *status == 429,
            ClientError::Config(_)
            | ClientError::Decode { .. }
            | ClientError::ResponseTooLarge(_)
            | ClientError::Auth(_)
            | ClientError::Validation(_)
            | ClientError::Session(_) => false,
        }
    }
}
