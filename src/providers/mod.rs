//! Capability providers consumed by the document facade.
//!
//! Each document capability sits behind a narrow trait so the engine doing
//! the real work can be swapped out:
//! - Rendering: HTML markup to PDF bytes (headless Chrome)
//! - Compose: paginated text documents (lopdf)
//! - Merge: page-order-preserving concatenation (lopdf)
//! - Extract: text, page count and document info (pdf-extract + lopdf)
//! - Overlay: text drawn over existing pages (lopdf)

pub mod browser;
mod compose;
mod extract;
mod fonts;
mod merge;
mod overlay;
mod pdf;

pub use browser::{BrowserEngineConfig, ChromiumRenderer};
pub use compose::LopdfComposer;
pub use extract::PdfTextExtractor;
pub use merge::LopdfMerger;
pub use overlay::LopdfOverlay;

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::documents::OptionMap;

/// Errors raised by capability providers.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Provider not available: {0}")]
    Unavailable(String),

    #[error("Provider produced no output")]
    Empty,

    #[error("Provider task failed: {0}")]
    Task(String),
}

impl From<lopdf::Error> for ProviderError {
    fn from(e: lopdf::Error) -> Self {
        ProviderError::Pdf(e.to_string())
    }
}

impl From<tokio::task::JoinError> for ProviderError {
    fn from(e: tokio::task::JoinError) -> Self {
        ProviderError::Task(e.to_string())
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Renders markup into PDF bytes.
#[async_trait]
pub trait RenderingProvider: Send + Sync {
    async fn render(&self, markup: &str, options: &OptionMap) -> ProviderResult<Vec<u8>>;
}

/// Page geometry for composed documents, in PDF points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
}

/// Horizontal alignment of a composed text block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
}

/// Styling for one block of composed text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font_size: f32,
    pub align: TextAlign,
    /// Extra space between lines, in points.
    pub line_gap: f32,
}

/// A document being composed from text blocks.
pub trait ComposedDocument: Send {
    fn add_text(&mut self, text: &str, style: TextStyle);

    /// Advance the cursor by `lines` lines of the most recent font size.
    fn move_down(&mut self, lines: f32);

    /// Set a document information entry (Title, Author, ...).
    fn set_info(&mut self, key: &str, value: &str);

    /// Serialize the finished document into `sink`.
    fn finish(self: Box<Self>, sink: &mut dyn Write) -> ProviderResult<()>;
}

/// Creates composed documents.
pub trait ComposeProvider: Send + Sync {
    fn new_document(&self, layout: PageLayout) -> Box<dyn ComposedDocument>;
}

/// An in-progress merge. Sources are appended in order.
pub trait MergeSession: Send {
    fn append(&mut self, path: &Path) -> ProviderResult<()>;

    /// Write the combined document and return its page count.
    fn save(self: Box<Self>, destination: &Path) -> ProviderResult<usize>;
}

/// Starts merge sessions.
pub trait MergeProvider: Send + Sync {
    fn begin(&self) -> Box<dyn MergeSession>;
}

/// Text and metadata pulled out of a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedText {
    pub text: String,
    pub page_count: usize,
    pub metadata: BTreeMap<String, String>,
}

/// Parses document bytes into text and metadata.
pub trait ExtractProvider: Send + Sync {
    fn parse(&self, bytes: &[u8]) -> ProviderResult<ExtractedText>;
}

/// Text to draw over a page.
#[derive(Debug, Clone, PartialEq)]
pub struct TextOverlay {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
    /// RGB components in 0..=1.
    pub color: (f32, f32, f32),
    pub opacity: f32,
    /// Counter-clockwise rotation around (x, y).
    pub rotation_degrees: f32,
}

/// A loaded document that can be drawn on and serialized back.
pub trait OverlayDocument: Send {
    fn page_count(&self) -> usize;

    /// Width and height of a zero-based page, in points.
    fn page_size(&self, index: usize) -> ProviderResult<(f32, f32)>;

    fn draw_text(&mut self, index: usize, overlay: &TextOverlay) -> ProviderResult<()>;

    fn save(&mut self) -> ProviderResult<Vec<u8>>;
}

/// Loads documents for overlay drawing.
pub trait OverlayProvider: Send + Sync {
    fn load(&self, bytes: &[u8]) -> ProviderResult<Box<dyn OverlayDocument>>;
}

/// One provider per capability, shared by every facade clone.
#[derive(Clone)]
pub struct Providers {
    pub renderer: Arc<dyn RenderingProvider>,
    pub composer: Arc<dyn ComposeProvider>,
    pub merger: Arc<dyn MergeProvider>,
    pub extractor: Arc<dyn ExtractProvider>,
    pub overlay: Arc<dyn OverlayProvider>,
}

impl Providers {
    /// Default providers with the given browser configuration.
    pub fn with_browser(config: BrowserEngineConfig) -> Self {
        Self {
            renderer: Arc::new(ChromiumRenderer::new(config)),
            composer: Arc::new(LopdfComposer),
            merger: Arc::new(LopdfMerger),
            extractor: Arc::new(PdfTextExtractor),
            overlay: Arc::new(LopdfOverlay),
        }
    }

    /// Replace the rendering provider.
    pub fn renderer(mut self, renderer: Arc<dyn RenderingProvider>) -> Self {
        self.renderer = renderer;
        self
    }
}

impl Default for Providers {
    fn default() -> Self {
        Self::with_browser(BrowserEngineConfig::default().with_env_overrides())
    }
}
