//! Response helpers shared by the handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::documents::DocumentError;

/// JSON error body: `{"error": message}`.
pub fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({ "error": message.into() })),
    )
        .into_response()
}

/// Map a facade failure to a response. Caller mistakes keep their own
/// status; engine failures become a 500 with the operation's message.
pub fn operation_error(err: &DocumentError, message: &str) -> Response {
    match err {
        DocumentError::InvalidName(_) => json_error(StatusCode::BAD_REQUEST, "Invalid file name"),
        DocumentError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "File not found"),
        _ => json_error(StatusCode::INTERNAL_SERVER_ERROR, message),
    }
}

/// A success message followed by the operation's own fields.
#[derive(Debug, Serialize)]
pub struct MessageResponse<T: Serialize> {
    pub message: &'static str,
    #[serde(flatten)]
    pub body: T,
}

impl<T: Serialize> MessageResponse<T> {
    pub fn new(message: &'static str, body: T) -> Self {
        Self { message, body }
    }
}

impl<T: Serialize> IntoResponse for MessageResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
