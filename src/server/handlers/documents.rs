//! Handlers for operations on uploaded PDFs.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::helpers::{json_error, operation_error, MessageResponse};
use super::upload::{self, Upload};
use crate::documents::WatermarkOptions;
use crate::server::AppState;

/// Most files one merge request may upload.
pub const MAX_MERGE_FILES: usize = 10;

/// Merge the uploaded `pdfs` in upload order.
pub async fn merge_pdfs(State(state): State<AppState>, multipart: Multipart) -> Response {
    let upload = match upload::receive(&state, multipart, "pdfs", MAX_MERGE_FILES).await {
        Ok(upload) => upload,
        Err(response) => return response,
    };
    if upload.files.len() < 2 {
        return json_error(
            StatusCode::BAD_REQUEST,
            "At least 2 PDF files are required",
        );
    }

    let filename = upload.field("filename").unwrap_or("merged.pdf");
    match state.facade.merge(&upload.paths(), filename).await {
        Ok(result) => MessageResponse::new("PDFs merged successfully", result).into_response(),
        Err(e) => operation_error(&e, "Failed to merge PDFs"),
    }
}

/// Extract text and metadata from the uploaded `pdf`.
pub async fn extract_text(State(state): State<AppState>, multipart: Multipart) -> Response {
    let upload = match upload::receive(&state, multipart, "pdf", 1).await {
        Ok(upload) => upload,
        Err(response) => return response,
    };
    let Some(file) = upload.files.first() else {
        return json_error(StatusCode::BAD_REQUEST, "PDF file is required");
    };

    match state.facade.extract_text(&file.path).await {
        Ok(extracted) => MessageResponse::new(
            "Text extracted successfully",
            json!({
                "success": true,
                "text": extracted.text,
                "pages": extracted.page_count,
                "info": extracted.metadata,
            }),
        )
        .into_response(),
        Err(e) => operation_error(&e, "Failed to extract text from PDF"),
    }
}

/// Watermark the uploaded `pdf` with `watermarkText`.
pub async fn add_watermark(State(state): State<AppState>, multipart: Multipart) -> Response {
    let upload = match upload::receive(&state, multipart, "pdf", 1).await {
        Ok(upload) => upload,
        Err(response) => return response,
    };
    let (Some(file), Some(text)) = (upload.files.first(), upload.field("watermarkText")) else {
        return json_error(
            StatusCode::BAD_REQUEST,
            "PDF file and watermark text are required",
        );
    };

    let filename = upload.field("filename").unwrap_or("watermarked.pdf");
    let options = watermark_options(&upload);
    match state
        .facade
        .apply_watermark(&file.path, text, filename, &options)
        .await
    {
        Ok(result) => MessageResponse::new("Watermark added successfully", result).into_response(),
        Err(e) => operation_error(&e, "Failed to add watermark"),
    }
}

/// Read watermark appearance from form fields, keeping defaults for
/// anything absent or unparsable.
fn watermark_options(upload: &Upload) -> WatermarkOptions {
    let defaults = WatermarkOptions::default();
    let number = |name: &str, default: f32| {
        upload
            .field(name)
            .and_then(|v| v.parse::<f32>().ok())
            .unwrap_or(default)
    };
    WatermarkOptions {
        opacity: number("opacity", defaults.opacity),
        font_size: number("fontSize", defaults.font_size),
        rotation_degrees: number("rotation", defaults.rotation_degrees),
    }
}
