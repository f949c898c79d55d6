//! Error types for the users SDK.

use thiserror::Error;

/// Failure of a users operation, already classified for display.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsersError {
    /// Transport failure: DNS, connection refused, reset
    #[error("network error: {message}")]
    Network { message: String },

    /// Per-attempt timeout elapsed
    #[error("request timed out")]
    Timeout,

    /// 401 that survived the refresh-and-retry path
    #[error("not authorized")]
    Unauthorized,

    #[error("forbidden: {message}")]
    Forbidden { message: String },

    #[error("user not found: {id}")]
    NotFound { id: String },

    /// Server-side validation or conflict (400, 409, 422)
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Body could not be decoded
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },

    /// Client-side validation; never reaches the network
    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// Another mutation on the same user has not finished
    #[error("a change to user {id} is already in progress")]
    MutationInFlight { id: String },
}

impl UsersError {
    #[must_use]
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Text for the list view's error banner.
    ///
    /// Server-supplied messages are shown as-is; everything else gets a
    /// fixed sentence.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Network { .. } => {
                "Unable to reach the server. Check your connection and try again.".to_owned()
            }
            Self::Timeout => "The server took too long to respond. Please try again.".to_owned(),
            Self::Unauthorized => "Your session has expired. Please sign in again.".to_owned(),
            Self::Forbidden { message } => non_empty_or(
                message,
                "You do not have permission to perform this action.",
            ),
            Self::NotFound { .. } => "User not found.".to_owned(),
            Self::Rejected { message, .. } => {
                non_empty_or(message, "The server rejected the request.")
            }
            Self::Server { message, .. } => non_empty_or(
                message,
                "Something went wrong on the server. Please try again later.",
            ),
            Self::InvalidResponse { .. } => "Unexpected response from the server.".to_owned(),
            Self::Validation { message, .. } => message.clone(),
            Self::MutationInFlight { .. } => {
                "This user is already being updated. Please wait.".to_owned()
            }
        }
    }
}

fn non_empty_or(message: &str, fallback: &str) -> String {
    if message.trim().is_empty() {
        fallback.to_owned()
    } else {
        message.to_owned()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn server_message_preferred() {
        let err = UsersError::Rejected {
            status: 409,
            message: "Email already in use".to_owned(),
        };
        assert_eq!(err.user_message(), "Email already in use");
    }

    #[test]
    fn blank_server_message_falls_back() {
        let err = UsersError::Server {
            status: 500,
            message: "  ".to_owned(),
        };
        assert_eq!(
            err.user_message(),
            "Something went wrong on the server. Please try again later."
        );
    }

    #[test]
    fn validation_message_passes_through() {
        let err = UsersError::validation("email", "Enter a valid email address");
        assert_eq!(err.user_message(), "Enter a valid email address");
        assert_eq!(err.to_string(), "invalid email: Enter a valid email address");
    }
}
