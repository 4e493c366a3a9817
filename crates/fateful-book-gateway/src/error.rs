//! ApiError — every failure leaves the gateway as `{ "error", "details" }`.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fateful_book_core::{ConversationError, CounselError, DiagnosisError, GenerateError, LedgerError};
use serde_json::json;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: &'static str,
    pub details: String,
}

impl ApiError {
    pub fn new(status: StatusCode, error: &'static str, details: impl Into<String>) -> Self {
        Self {
            status,
            error,
            details: details.into(),
        }
    }

    pub fn bad_request(details: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid request", details)
    }

    pub fn internal(error: &'static str, details: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error, details)
    }

    pub fn session_not_found(id: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, "session not found", format!("no session with id {id}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::warn!(status = %self.status, details = %self.details, "{}", self.error);
        }
        let body = Json(json!({ "error": self.error, "details": self.details }));
        (self.status, body).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<ConversationError> for ApiError {
    fn from(e: ConversationError) -> Self {
        if e.is_validation() {
            Self::bad_request(e.to_string())
        } else {
            Self::new(StatusCode::CONFLICT, "session state conflict", e.to_string())
        }
    }
}

impl From<GenerateError> for ApiError {
    fn from(e: GenerateError) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, "generation failed", e.to_string())
    }
}

impl From<CounselError> for ApiError {
    fn from(e: CounselError) -> Self {
        match e {
            CounselError::Conversation(e) => e.into(),
            CounselError::Generate(e) => e.into(),
        }
    }
}

impl From<DiagnosisError> for ApiError {
    fn from(e: DiagnosisError) -> Self {
        Self::bad_request(e.to_string())
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "ledger unavailable", e.to_string())
    }
}
