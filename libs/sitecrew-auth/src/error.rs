use std::path::PathBuf;

use sitecrew_http::HttpError;
use thiserror::Error;

/// Errors from token storage and token refresh.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AuthError {
    /// Reading or writing the token file failed
    #[error("token file {path:?}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Token file contents could not be (de)serialized
    #[error("token file is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Token endpoint request failed (transport, timeout or non-2xx)
    #[error("token refresh request failed: {0}")]
    Http(#[from] HttpError),

    /// Token endpoint URL is unusable
    #[error("invalid token endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },
}
