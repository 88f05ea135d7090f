//! Artifact downloads and the JSON not-found fallback.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use super::helpers::{json_error, operation_error};
use super::super::AppState;

/// Serve a generated PDF as an attachment.
pub async fn download_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Response {
    let path = match state.facade.artifact_path(&filename) {
        Ok(path) => path,
        Err(e) => return operation_error(&e, "Failed to download file"),
    };

    let content = match tokio::fs::read(&path).await {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to read {}: {}", path.display(), e);
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read file");
        }
    };

    let mime = mime_guess::from_path(&path)
        .first_or_octet_stream()
        .to_string();
    let disposition = format!(
        "attachment; filename=\"{}\"",
        filename.replace(['"', '\\'], "_")
    );

    (
        [
            (header::CONTENT_TYPE, mime),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        content,
    )
        .into_response()
}

/// Fallback for paths no route or static file matched.
pub async fn not_found() -> Response {
    json_error(StatusCode::NOT_FOUND, "Endpoint not found")
}
