//! HTTP front end for the document facade.
//!
//! Provides JSON and multipart endpoints for:
//! - Rendering HTML and laying out plain text as PDF
//! - Merging, extracting text from and watermarking uploaded PDFs
//! - Listing and downloading generated files

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Instant;

use crate::config::Settings;
use crate::documents::DocumentFacade;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub facade: DocumentFacade,
    /// Uploads are staged here for the lifetime of one request.
    pub upload_dir: PathBuf,
    pub public_dir: PathBuf,
    /// Per-file upload limit, in bytes.
    pub max_upload_bytes: usize,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        let facade = DocumentFacade::new(settings.facade_config(), settings.providers())?;
        Self::with_facade(facade, settings)
    }

    /// Build state around an existing facade.
    pub fn with_facade(facade: DocumentFacade, settings: &Settings) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&settings.upload_dir).map_err(|e| {
            anyhow::anyhow!(
                "Failed to create upload directory {}: {}",
                settings.upload_dir.display(),
                e
            )
        })?;

        Ok(Self {
            facade,
            upload_dir: settings.upload_dir.clone(),
            public_dir: settings.public_dir.clone(),
            max_upload_bytes: settings.max_upload_bytes,
            started_at: Instant::now(),
        })
    }
}

/// Start the web server.
pub async fn serve(settings: &Settings, host: &str, port: u16) -> anyhow::Result<()> {
    let state = AppState::new(settings)?;
    tracing::info!(
        "Writing PDFs to {}",
        state.facade.output_dir().display()
    );
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
