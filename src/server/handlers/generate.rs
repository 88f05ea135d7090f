//! PDF generation from JSON requests.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use super::helpers::{json_error, operation_error, MessageResponse};
use crate::documents::OptionMap;
use crate::server::AppState;

/// Body of `POST /api/generate/html`.
#[derive(Debug, Deserialize)]
pub struct HtmlRequest {
    pub html: Option<String>,
    #[serde(default = "default_html_filename")]
    pub filename: String,
    #[serde(default)]
    pub options: OptionMap,
}

fn default_html_filename() -> String {
    "output.pdf".to_string()
}

/// Body of `POST /api/generate/text`.
#[derive(Debug, Deserialize)]
pub struct TextRequest {
    pub text: Option<String>,
    #[serde(default = "default_text_filename")]
    pub filename: String,
    #[serde(default)]
    pub options: OptionMap,
}

fn default_text_filename() -> String {
    "text-output.pdf".to_string()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Render posted HTML to a PDF.
pub async fn generate_html(
    State(state): State<AppState>,
    body: Result<Json<HtmlRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return json_error(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    let Some(html) = non_empty(request.html) else {
        return json_error(StatusCode::BAD_REQUEST, "HTML content is required");
    };

    match state
        .facade
        .render_html(&html, &request.filename, &request.options)
        .await
    {
        Ok(result) => MessageResponse::new("PDF generated successfully", result).into_response(),
        Err(e) => operation_error(&e, "Failed to generate PDF from HTML"),
    }
}

/// Lay out posted plain text as a PDF.
pub async fn generate_text(
    State(state): State<AppState>,
    body: Result<Json<TextRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return json_error(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    let Some(text) = non_empty(request.text) else {
        return json_error(StatusCode::BAD_REQUEST, "Text content is required");
    };

    match state
        .facade
        .compose_text(&text, &request.filename, &request.options)
        .await
    {
        Ok(result) => {
            MessageResponse::new("PDF generated successfully from text", result).into_response()
        }
        Err(e) => operation_error(&e, "Failed to generate PDF from text"),
    }
}
