use http::StatusCode;
use sitecrew_http::HttpError;
use users_sdk::UsersError;

use super::dto::ErrorBody;

/// Classify a transport-level failure. `id` fills `NotFound` for item calls.
pub fn map_http_error(err: HttpError, id: Option<&str>) -> UsersError {
    match err {
        HttpError::Status { status, body } => map_status(status, &body, id),
        HttpError::Timeout(_) => UsersError::Timeout,
        HttpError::Json(e) => UsersError::InvalidResponse {
            message: e.to_string(),
        },
        e @ HttpError::BodyTooLarge { .. } => UsersError::InvalidResponse {
            message: e.to_string(),
        },
        other => UsersError::Network {
            message: other.to_string(),
        },
    }
}

fn map_status(status: StatusCode, body: &str, id: Option<&str>) -> UsersError {
    let message = server_message(body).unwrap_or_default();
    match status {
        StatusCode::UNAUTHORIZED => UsersError::Unauthorized,
        StatusCode::FORBIDDEN => UsersError::Forbidden { message },
        StatusCode::NOT_FOUND => UsersError::not_found(id.unwrap_or_default()),
        s if s.is_server_error() => UsersError::Server {
            status: s.as_u16(),
            message,
        },
        s => UsersError::Rejected {
            status: s.as_u16(),
            message,
        },
    }
}

fn server_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(ErrorBody::into_message)
}
