//! Wire envelopes for the users endpoints.

use serde::{Deserialize, Serialize};
use users_sdk::User;

/// `GET /api/users` reply; a missing `users` field reads as empty.
#[derive(Debug, Default, Deserialize)]
pub struct UsersEnvelope {
    #[serde(default)]
    pub users: Vec<User>,
}

/// Single-entity reply: `{ "user": ... }`.
#[derive(Debug, Deserialize)]
pub struct UserEnvelope<T> {
    pub user: T,
}

#[derive(Debug, Serialize)]
pub struct PhotoPatch<'a> {
    #[serde(rename = "photoURL")]
    pub photo_url: &'a str,
}

/// Error body shapes the backend is known to send.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<ErrorDetail>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Text(String),
    Object {
        #[serde(default)]
        message: Option<String>,
    },
}

impl ErrorBody {
    /// First non-blank message, `error` before `message`.
    pub fn into_message(self) -> Option<String> {
        let from_error = match self.error {
            Some(ErrorDetail::Text(text)) => Some(text),
            Some(ErrorDetail::Object { message }) => message,
            None => None,
        };
        from_error
            .into_iter()
            .chain(self.message)
            .find(|m| !m.trim().is_empty())
    }
}
