//! The single error value surfaced by every API call.

use wire::ErrorBody;

/// Errors produced by [`super::api::ApiClient`] and everything layered on it.
///
/// Cloneable so that one failed in-flight read can be handed to every caller
/// that was waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The request never produced an HTTP response (connect, timeout, TLS).
    #[error("request failed: {0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status {
        status: u16,
        message: String,
        /// Form field the backend attributed the error to, if any.
        field: Option<String>,
    },

    /// Success status but the payload did not have the expected shape.
    #[error("invalid response shape: {0}")]
    InvalidResponse(String),

    /// Authorization failed and could not be recovered; credentials were cleared.
    #[error("session expired, please sign in again")]
    SessionExpired,

    /// A read was skipped because no user is signed in.
    #[error("not signed in")]
    NotAuthenticated,

    /// A by-id read was skipped because the id was empty.
    #[error("an id is required")]
    MissingId,

    /// The credential store could not be read or written.
    #[error("credential storage failed: {0}")]
    Storage(String),
}

impl ApiError {
    /// Build a status error from a raw response body.
    #[must_use]
    pub fn from_status(status: u16, body: &str) -> Self {
        let parsed = ErrorBody::parse(body).unwrap_or_default();
        let message = parsed
            .message
            .or(parsed.error)
            .unwrap_or_else(|| default_status_message(status).to_owned());
        Self::Status { status, message, field: parsed.field }
    }

    /// HTTP status associated with this error, if there is one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::SessionExpired => Some(401),
            _ => None,
        }
    }

    /// Human-readable message, without the status prefix.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Status { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// True for 4xx responses, which are never retried.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self.status(), Some(400..=499))
    }

    /// True when repeating the same read could plausibly succeed.
    #[must_use]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Status { status: 429 | 500..=599, .. })
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

impl From<crate::storage::StorageError> for ApiError {
    fn from(e: crate::storage::StorageError) -> Self {
        Self::Storage(e.to_string())
    }
}

fn default_status_message(status: u16) -> &'static str {
    match status {
        400 => "bad request",
        401 => "unauthorized",
        403 => "forbidden",
        404 => "not found",
        409 => "conflict",
        422 => "unprocessable entity",
        429 => "too many requests",
        500..=599 => "server error",
        _ => "request failed",
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
