//! HTTP request handlers for the web server.

mod api;
mod documents;
mod generate;
mod helpers;
mod static_files;
mod upload;

// Re-export handlers for use by the router
pub use api::{api_docs, health, list_files};
pub use documents::{add_watermark, extract_text, merge_pdfs, MAX_MERGE_FILES};
pub use generate::{generate_html, generate_text};
pub use static_files::{download_file, not_found};
