//! Error envelope returned to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use scangate_common::{Language, MessageKey};
use scangate_scan_config::ValidationError;
use serde_json::json;

/// `{"status": "error", "msg": ...}` with an HTTP status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub msg: String,
}

impl ApiError {
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            msg: msg.into(),
        }
    }

    pub fn localized(status: StatusCode, key: MessageKey, language: Language) -> Self {
        Self::new(status, key.text(language))
    }

    pub fn bad_request(key: MessageKey, language: Language) -> Self {
        Self::localized(StatusCode::BAD_REQUEST, key, language)
    }

    pub fn not_found(language: Language) -> Self {
        Self::localized(StatusCode::NOT_FOUND, MessageKey::NotFound, language)
    }

    pub fn internal(language: Language) -> Self {
        Self::localized(
            StatusCode::INTERNAL_SERVER_ERROR,
            MessageKey::Internal,
            language,
        )
    }

    pub fn validation(err: &ValidationError, language: Language) -> Self {
        Self::new(StatusCode::BAD_REQUEST, err.message(language))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "status": "error", "msg": self.msg })),
        )
            .into_response()
    }
}

/// `{"status": "ok", "msg": ...}`
pub fn ok_message(key: MessageKey, language: Language) -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "msg": key.text(language) }))
}
