//! Service endpoints: health, API description and artifact listing.

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use super::super::AppState;

/// Health check endpoint for container orchestration.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "OK",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime": state.started_at.elapsed().as_secs_f64(),
    }))
}

/// Static description of the HTTP API.
pub async fn api_docs() -> impl IntoResponse {
    Json(json!({
        "name": "PDF Generate Bot API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "GET /health": "Service health and uptime",
            "POST /api/generate/html": {
                "description": "Generate a PDF from HTML",
                "body": { "html": "string (required)", "filename": "string (default output.pdf)", "options": "object" },
            },
            "POST /api/generate/text": {
                "description": "Generate a PDF from plain text",
                "body": { "text": "string (required)", "filename": "string (default text-output.pdf)", "options": "object" },
            },
            "POST /api/merge": {
                "description": "Merge PDFs in upload order",
                "multipart": { "pdfs": "2 to 10 PDF files", "filename": "string (default merged.pdf)" },
            },
            "POST /api/extract": {
                "description": "Extract text and metadata from a PDF",
                "multipart": { "pdf": "PDF file" },
            },
            "POST /api/watermark": {
                "description": "Stamp text over every page of a PDF",
                "multipart": {
                    "pdf": "PDF file",
                    "watermarkText": "string (required)",
                    "filename": "string (default watermarked.pdf)",
                    "opacity": "number (default 0.3)",
                    "fontSize": "number (default 50)",
                    "rotation": "number (default 45)",
                },
            },
            "GET /api/files": "List generated PDFs",
            "GET /api/download/:filename": "Download a generated PDF",
            "GET /api/docs": "This document",
        },
    }))
}

/// List PDFs in the output directory.
pub async fn list_files(State(state): State<AppState>) -> impl IntoResponse {
    let files = state.facade.list_artifacts().await;
    Json(json!({ "files": files }))
}
