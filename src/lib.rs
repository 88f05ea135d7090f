//! pdfbot - PDF generation and manipulation service.
//!
//! Renders HTML through a headless browser, lays out plain text, merges,
//! extracts text from and watermarks PDFs. Exposed as a library, an HTTP
//! server and a command-line tool.

pub mod cli;
pub mod config;
pub mod documents;
pub mod providers;
pub mod server;
