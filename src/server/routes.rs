//! Route configuration for the web server.

use axum::{
    extract::DefaultBodyLimit,
    handler::HandlerWithoutStateExt,
    http::{header, HeaderValue},
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, services::ServeDir,
    set_header::SetResponseHeaderLayer, trace::TraceLayer,
};

use super::handlers;
use super::AppState;

/// Headroom on top of the uploaded files for form fields and boundaries.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    let body_limit = state
        .max_upload_bytes
        .saturating_mul(handlers::MAX_MERGE_FILES)
        .saturating_add(FORM_OVERHEAD_BYTES);

    // Anything not routed is looked up in the public directory
    let public = ServeDir::new(&state.public_dir)
        .call_fallback_on_method_not_allowed(true)
        .not_found_service(handlers::not_found.into_service());

    Router::new()
        .route("/health", get(handlers::health))
        // Generation
        .route("/api/generate/html", post(handlers::generate_html))
        .route("/api/generate/text", post(handlers::generate_text))
        // Operations on uploaded PDFs
        .route("/api/merge", post(handlers::merge_pdfs))
        .route("/api/extract", post(handlers::extract_text))
        .route("/api/watermark", post(handlers::add_watermark))
        // Artifacts
        .route("/api/files", get(handlers::list_files))
        .route("/api/download/:filename", get(handlers::download_file))
        .route("/api/docs", get(handlers::api_docs))
        .fallback_service(public)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
