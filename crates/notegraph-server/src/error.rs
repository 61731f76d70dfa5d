//! JSON error responses

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use notegraph_core::NoteError;
use serde_json::json;
use tracing::{error, warn};

/// An API failure rendered as `{"error": message}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Note not found")
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<NoteError> for ApiError {
    fn from(err: NoteError) -> Self {
        if err.is_not_found() {
            if let NoteError::SecurityViolation(name) = &err {
                warn!("Refused access outside notes directory: {}", name);
            }
            return ApiError::not_found();
        }
        error!("Note operation failed: {}", err);
        ApiError::internal(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        error!("Blocking task failed: {}", err);
        ApiError::internal("internal error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_note_error_mapping() {
        assert_eq!(
            ApiError::from(NoteError::NotFound("x".into())).status,
            StatusCode::NOT_FOUND
        );
        let hidden = ApiError::from(NoteError::SecurityViolation("../etc/passwd".into()));
        assert_eq!(hidden, ApiError::not_found());

        let range = ApiError::from(NoteError::OutOfRange { index: 9, count: 2 });
        assert_eq!(range.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(range.message, "Checkbox index 9 out of range (2 checkboxes)");

        let decode = ApiError::from(NoteError::Decode(PathBuf::from("bad.md")));
        assert_eq!(decode.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_error_body() {
        let response = ApiError::bad_request("Missing path parameter").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, json!({"error": "Missing path parameter"}));
    }
}
