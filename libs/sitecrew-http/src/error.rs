use std::time::Duration;

use http::StatusCode;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Everything that can go wrong between building a request and decoding
/// its response.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HttpError {
    #[error("invalid request: {0}")]
    Request(#[from] http::Error),

    #[error("invalid header value: {0}")]
    Header(#[from] http::header::InvalidHeaderValue),

    #[error("failed to encode request body: {0}")]
    Encode(#[source] BoxError),

    /// The URL does not parse, has no host, or its scheme is not allowed
    #[error("refusing to send to '{url}': {reason}")]
    InvalidUrl { url: String, reason: &'static str },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Connection, DNS or protocol failure; no response was received
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    #[error("TLS setup failed: {0}")]
    Tls(#[source] BoxError),

    /// The request queue's worker is gone
    #[error("HTTP client is shut down")]
    Closed,

    /// Non-2xx response. `body` holds the start of the response body.
    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("response body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("malformed JSON response: {0}")]
    Json(#[source] serde_json::Error),
}

impl HttpError {
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the request failed before any response arrived.
    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout(_))
    }
}

impl From<hyper_util::client::legacy::Error> for HttpError {
    fn from(err: hyper_util::client::legacy::Error) -> Self {
        Self::Transport(Box::new(err))
    }
}
