use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Shown for every flavour of missing session: unknown, already used or expired.
pub const SESSION_NOT_FOUND_MESSAGE: &str =
    "Session not found. It may have already been used or expired.";

pub const REMOTE_UNAVAILABLE_MESSAGE: &str =
    "The validation service is temporarily unavailable. Please try again later.";

pub const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred.";

/// Failures of the validation workflow, as seen by the request layer.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Remote workflow unavailable")]
    RemoteUnavailable,

    #[error("Remote workflow rejected the request: {0}")]
    RemoteRejected(String),

    #[error("Session not found")]
    SessionNotFound,

    #[error("Session storage error: {0}")]
    Storage(String),
}

impl ValidationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ValidationError::RemoteUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ValidationError::RemoteRejected(_) => StatusCode::BAD_GATEWAY,
            ValidationError::SessionNotFound => StatusCode::NOT_FOUND,
            ValidationError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text that is safe to show to the end user. Only the remote-supplied
    /// rejection message is passed through verbatim.
    pub fn user_message(&self) -> String {
        match self {
            ValidationError::RemoteUnavailable => REMOTE_UNAVAILABLE_MESSAGE.to_string(),
            ValidationError::RemoteRejected(msg) => msg.clone(),
            ValidationError::SessionNotFound => SESSION_NOT_FOUND_MESSAGE.to_string(),
            ValidationError::Storage(_) => INTERNAL_ERROR_MESSAGE.to_string(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ValidationError::RemoteUnavailable => "remote_unavailable",
            ValidationError::RemoteRejected(_) => "remote_rejected",
            ValidationError::SessionNotFound => "session_not_found",
            ValidationError::Storage(_) => "internal",
        }
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid upload: {0}")]
    Upload(#[from] MultipartError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ServerError::Upload(err) => (err.status(), "bad_request", err.body_text()),
            ServerError::Configuration(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
                INTERNAL_ERROR_MESSAGE.to_string(),
            ),
            ServerError::Validation(err) => (err.status_code(), err.kind(), err.user_message()),
        };

        let body = Json(json!({
            "error": kind,
            "message": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_detail_is_not_shown_to_users() {
        let err = ValidationError::Storage("/var/lib/cnh/abc.json: permission denied".to_string());

        assert_eq!(err.user_message(), INTERNAL_ERROR_MESSAGE);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn remote_rejection_message_passes_through() {
        let err = ValidationError::RemoteRejected("bad image".to_string());

        assert_eq!(err.user_message(), "bad image");
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn unavailable_maps_to_service_unavailable() {
        let response = ServerError::from(ValidationError::RemoteUnavailable).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
