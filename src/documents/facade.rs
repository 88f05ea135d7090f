//! The document facade: one async operation per capability.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use super::error::{DocumentError, DocumentResult};
use super::options::{
    merge_options, option_page_format, option_str, render_defaults, OptionMap, PageFormat,
    QualityHint,
};
use super::store::OutputStore;
use super::types::{
    ArtifactInfo, OperationOutcome, OperationRequest, ResultDescriptor, WatermarkOptions,
};
use crate::providers::{
    ComposedDocument, ExtractedText, PageLayout, ProviderError, ProviderResult, Providers,
    TextAlign, TextOverlay, TextStyle,
};

/// Margin on every side of composed text pages, in points.
const COMPOSE_MARGIN: f32 = 50.0;

const TITLE_STYLE: TextStyle = TextStyle {
    font_size: 20.0,
    align: TextAlign::Center,
    line_gap: 0.0,
};

const BODY_STYLE: TextStyle = TextStyle {
    font_size: 12.0,
    align: TextAlign::Left,
    line_gap: 5.0,
};

/// Watermark color (light grey).
const WATERMARK_GREY: (f32, f32, f32) = (0.7, 0.7, 0.7);

/// Facade settings.
#[derive(Debug, Clone)]
pub struct FacadeConfig {
    pub output_dir: PathBuf,
    pub default_page_format: PageFormat,
    pub quality: QualityHint,
    /// Render options applied over the component defaults for every call.
    pub render_options: OptionMap,
}

impl Default for FacadeConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./generated-pdfs"),
            default_page_format: PageFormat::default(),
            quality: QualityHint::default(),
            render_options: OptionMap::new(),
        }
    }
}

/// Entry point for every document operation.
///
/// Cheap to clone: configuration plus shared providers.
#[derive(Clone)]
pub struct DocumentFacade {
    config: FacadeConfig,
    store: OutputStore,
    providers: Providers,
}

impl DocumentFacade {
    /// Create the facade, making sure the output directory exists.
    pub fn new(config: FacadeConfig, providers: Providers) -> DocumentResult<Self> {
        let store = OutputStore::open(&config.output_dir)?;
        Ok(Self {
            config,
            store,
            providers,
        })
    }

    pub fn config(&self) -> &FacadeConfig {
        &self.config
    }

    pub fn output_dir(&self) -> &Path {
        self.store.dir()
    }

    /// Dispatch a request to the matching operation.
    pub async fn execute(&self, request: OperationRequest) -> DocumentResult<OperationOutcome> {
        debug!("Executing {}", request.name());
        let outcome = match request {
            OperationRequest::RenderHtml {
                markup,
                destination,
                options,
            } => OperationOutcome::Written(self.render_html(&markup, &destination, &options).await?),
            OperationRequest::RenderText {
                text,
                destination,
                options,
            } => OperationOutcome::Written(self.compose_text(&text, &destination, &options).await?),
            OperationRequest::Merge {
                sources,
                destination,
            } => OperationOutcome::Written(self.merge(&sources, &destination).await?),
            OperationRequest::ExtractText { source } => {
                OperationOutcome::Extracted(self.extract_text(&source).await?)
            }
            OperationRequest::Watermark {
                source,
                text,
                destination,
                options,
            } => OperationOutcome::Written(
                self.apply_watermark(&source, &text, &destination, &options)
                    .await?,
            ),
        };
        Ok(outcome)
    }

    /// Render HTML markup to a PDF in the output directory.
    pub async fn render_html(
        &self,
        markup: &str,
        destination: &str,
        options: &OptionMap,
    ) -> DocumentResult<ResultDescriptor> {
        let path = self.store.resolve(destination)?;
        let defaults = render_defaults(self.config.default_page_format, self.config.quality);
        let merged = merge_options(&[&defaults, &self.config.render_options, options]);

        match self.render_to(markup, &merged, &path).await {
            Ok(size) => {
                info!("PDF generated successfully: {} ({} bytes)", destination, size);
                Ok(ResultDescriptor::new(path))
            }
            Err(source) => {
                error!("Error generating PDF from HTML for {}: {}", destination, source);
                Err(DocumentError::Render {
                    destination: path,
                    source,
                })
            }
        }
    }

    async fn render_to(&self, markup: &str, options: &OptionMap, path: &Path) -> ProviderResult<usize> {
        let bytes = self.providers.renderer.render(markup, options).await?;
        if bytes.is_empty() {
            return Err(ProviderError::Empty);
        }
        tokio::fs::write(path, &bytes).await?;
        Ok(bytes.len())
    }

    /// Compose a paginated text document.
    ///
    /// Recognized options: `size` or `format` (page format), `layout`
    /// (`"landscape"` swaps the page axes) and `title`.
    pub async fn compose_text(
        &self,
        text: &str,
        destination: &str,
        options: &OptionMap,
    ) -> DocumentResult<ResultDescriptor> {
        let path = self.store.resolve(destination)?;

        let format = option_page_format(options, &["size", "format"])
            .unwrap_or(self.config.default_page_format);
        let (mut width, mut height) = format.size_points();
        if option_str(options, "layout").is_some_and(|l| l.eq_ignore_ascii_case("landscape")) {
            std::mem::swap(&mut width, &mut height);
        }

        let mut document = self.providers.composer.new_document(PageLayout {
            width,
            height,
            margin: COMPOSE_MARGIN,
        });
        if let Some(title) = option_str(options, "title") {
            document.set_info("Title", title);
            document.add_text(title, TITLE_STYLE);
            document.move_down(2.0);
        }
        document.add_text(text, BODY_STYLE);

        // The writer reports through a single-use channel, so the operation
        // settles exactly once even if the writer task dies.
        let (tx, rx) = oneshot::channel();
        let target = path.clone();
        tokio::task::spawn_blocking(move || {
            let _ = tx.send(write_composed(document, &target));
        });
        let result = rx.await.unwrap_or_else(|_| {
            Err(ProviderError::Task(
                "text writer exited without reporting".to_string(),
            ))
        });

        match result {
            Ok(()) => {
                info!("Text PDF generated successfully: {}", destination);
                Ok(ResultDescriptor::new(path))
            }
            Err(source) => {
                error!("Error generating PDF from text for {}: {}", destination, source);
                Err(DocumentError::Compose {
                    destination: path,
                    source,
                })
            }
        }
    }

    /// Merge PDFs in the given order. Missing sources are skipped.
    pub async fn merge(
        &self,
        sources: &[PathBuf],
        destination: &str,
    ) -> DocumentResult<ResultDescriptor> {
        let path = self.store.resolve(destination)?;

        let mut existing = Vec::with_capacity(sources.len());
        for source in sources {
            match tokio::fs::metadata(source).await {
                Ok(meta) if meta.is_file() => existing.push(source.clone()),
                _ => warn!("PDF file not found: {}", source.display()),
            }
        }

        let merger = self.providers.merger.clone();
        let target = path.clone();
        let result = tokio::task::spawn_blocking(move || {
            let mut session = merger.begin();
            for source in &existing {
                session.append(source)?;
            }
            session.save(&target)
        })
        .await
        .map_err(ProviderError::from)
        .and_then(|r| r);

        match result {
            Ok(pages) => {
                info!("PDFs merged successfully: {} ({} pages)", destination, pages);
                Ok(ResultDescriptor::new(path).with("pages", pages))
            }
            Err(source) => {
                error!("Error merging PDFs into {}: {}", destination, source);
                Err(DocumentError::Merge {
                    destination: path,
                    source,
                })
            }
        }
    }

    /// Extract text, page count and document info from a PDF.
    pub async fn extract_text(&self, source_path: &Path) -> DocumentResult<ExtractedText> {
        match self.extract_from(source_path).await {
            Ok(extracted) => {
                info!("Text extracted from: {}", source_path.display());
                Ok(extracted)
            }
            Err(source) => {
                error!(
                    "Error extracting text from {}: {}",
                    source_path.display(),
                    source
                );
                Err(DocumentError::Extract {
                    source_path: source_path.to_path_buf(),
                    source,
                })
            }
        }
    }

    async fn extract_from(&self, source_path: &Path) -> ProviderResult<ExtractedText> {
        let bytes = tokio::fs::read(source_path).await?;
        let extractor = self.providers.extractor.clone();
        tokio::task::spawn_blocking(move || extractor.parse(&bytes)).await?
    }

    /// Draw `text` across the middle of every page of `source_path`.
    pub async fn apply_watermark(
        &self,
        source_path: &Path,
        text: &str,
        destination: &str,
        options: &WatermarkOptions,
    ) -> DocumentResult<ResultDescriptor> {
        let path = self.store.resolve(destination)?;
        let options = options.normalized();

        match self.watermark_to(source_path, text, options, &path).await {
            Ok(pages) => {
                info!("Watermark added successfully: {} ({} pages)", destination, pages);
                Ok(ResultDescriptor::new(path).with("pages", pages))
            }
            Err(source) => {
                error!(
                    "Error adding watermark to {}: {}",
                    source_path.display(),
                    source
                );
                Err(DocumentError::Watermark {
                    source_path: source_path.to_path_buf(),
                    destination: path,
                    source,
                })
            }
        }
    }

    async fn watermark_to(
        &self,
        source_path: &Path,
        text: &str,
        options: WatermarkOptions,
        path: &Path,
    ) -> ProviderResult<usize> {
        let bytes = tokio::fs::read(source_path).await?;
        let overlay = self.providers.overlay.clone();
        let text = text.to_string();

        let (output, pages) = tokio::task::spawn_blocking(move || {
            let mut document = overlay.load(&bytes)?;
            let pages = document.page_count();
            for index in 0..pages {
                let (width, height) = document.page_size(index)?;
                let (x, y) = watermark_position(&text, width, height);
                document.draw_text(
                    index,
                    &TextOverlay {
                        text: text.clone(),
                        x,
                        y,
                        font_size: options.font_size,
                        color: WATERMARK_GREY,
                        opacity: options.opacity,
                        rotation_degrees: options.rotation_degrees,
                    },
                )?;
            }
            Ok::<_, ProviderError>((document.save()?, pages))
        })
        .await??;

        tokio::fs::write(path, &output).await?;
        Ok(pages)
    }

    /// PDFs in the output directory. Never fails; errors yield an empty list.
    pub async fn list_artifacts(&self) -> Vec<ArtifactInfo> {
        match self.store.list().await {
            Ok(files) => files,
            Err(source) => {
                let err = DocumentError::Listing {
                    dir: self.store.dir().to_path_buf(),
                    source,
                };
                error!("Error getting generated files: {}", err);
                Vec::new()
            }
        }
    }

    /// Path of an existing artifact in the output directory.
    pub fn artifact_path(&self, name: &str) -> DocumentResult<PathBuf> {
        self.store.locate(name)
    }
}

/// Position of the watermark baseline origin.
///
/// Centering uses a fixed 10pt per character rather than real glyph
/// metrics, so long or wide text drifts off center.
pub fn watermark_position(text: &str, width: f32, height: f32) -> (f32, f32) {
    let chars = text.chars().count() as f32;
    (width / 2.0 - chars * 10.0, height / 2.0)
}

fn write_composed(document: Box<dyn ComposedDocument>, path: &Path) -> ProviderResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    document.finish(&mut writer)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;
    use tempfile::tempdir;
    use tokio::sync::Mutex;

    use crate::providers::RenderingProvider;

    /// Renders by composing the markup as plain text, and records the
    /// options it was called with.
    #[derive(Default)]
    struct FakeRenderer {
        seen: Mutex<Vec<OptionMap>>,
        empty: bool,
    }

    #[async_trait]
    impl RenderingProvider for FakeRenderer {
        async fn render(&self, markup: &str, options: &OptionMap) -> ProviderResult<Vec<u8>> {
            self.seen.lock().await.push(options.clone());
            if self.empty {
                return Ok(Vec::new());
            }
            let mut document = crate::providers::LopdfComposer.new_document(PageLayout {
                width: 300.0,
                height: 300.0,
                margin: 20.0,
            });
            document.add_text(markup, BODY_STYLE);
            let mut bytes = Vec::new();
            document.finish(&mut bytes)?;
            Ok(bytes)
        }
    }

    use crate::providers::ComposeProvider;

    fn facade_with(dir: &Path, renderer: Arc<FakeRenderer>) -> DocumentFacade {
        let config = FacadeConfig {
            output_dir: dir.join("out"),
            ..FacadeConfig::default()
        };
        let providers = Providers::default().renderer(renderer);
        DocumentFacade::new(config, providers).unwrap()
    }

    fn facade(dir: &Path) -> DocumentFacade {
        facade_with(dir, Arc::new(FakeRenderer::default()))
    }

    fn options(value: serde_json::Value) -> OptionMap {
        value.as_object().cloned().unwrap()
    }

    async fn page_count(facade: &DocumentFacade, path: &Path) -> usize {
        facade.extract_text(path).await.unwrap().page_count
    }

    #[tokio::test]
    async fn test_new_creates_output_dir() {
        let dir = tempdir().unwrap();
        let facade = facade(dir.path());
        assert!(facade.output_dir().is_dir());
    }

    #[tokio::test]
    async fn test_render_html_writes_under_output_dir() {
        let dir = tempdir().unwrap();
        let facade = facade(dir.path());

        let result = facade
            .render_html("<h1>Hi</h1>", "page.pdf", &OptionMap::new())
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.path.starts_with(facade.output_dir()));
        assert!(std::fs::metadata(&result.path).unwrap().len() > 0);
    }

    #[tokio::test]
    async fn test_render_html_option_precedence() {
        let dir = tempdir().unwrap();
        let renderer = Arc::new(FakeRenderer::default());
        let mut facade = facade_with(dir.path(), renderer.clone());
        facade.config.render_options = options(json!({"format": "Legal", "scale": 0.8}));

        facade
            .render_html(
                "x",
                "o.pdf",
                &options(json!({"format": "Letter", "margin": {"top": "1in"}})),
            )
            .await
            .unwrap();

        let seen = renderer.seen.lock().await;
        let used = &seen[0];
        assert_eq!(used["format"], "Letter");
        assert_eq!(used["scale"], 0.8);
        assert_eq!(used["printBackground"], true);
        assert_eq!(used["margin"]["top"], "1in");
        assert_eq!(used["margin"]["bottom"], "20px");
    }

    #[tokio::test]
    async fn test_render_html_empty_output_fails() {
        let dir = tempdir().unwrap();
        let renderer = Arc::new(FakeRenderer {
            empty: true,
            ..FakeRenderer::default()
        });
        let facade = facade_with(dir.path(), renderer);

        let err = facade
            .render_html("x", "o.pdf", &OptionMap::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DocumentError::Render {
                source: ProviderError::Empty,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_invalid_destination_rejected_before_provider() {
        let dir = tempdir().unwrap();
        let renderer = Arc::new(FakeRenderer::default());
        let facade = facade_with(dir.path(), renderer.clone());

        let err = facade
            .render_html("x", "../escape.pdf", &OptionMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::InvalidName(_)));
        assert!(renderer.seen.lock().await.is_empty());
        assert!(!dir.path().join("escape.pdf").exists());
    }

    #[tokio::test]
    async fn test_compose_with_title_round_trips_text() {
        let dir = tempdir().unwrap();
        let facade = facade(dir.path());

        let result = facade
            .compose_text("Hello world", "t.pdf", &options(json!({"title": "Greeting"})))
            .await
            .unwrap();
        assert!(result.success);

        let extracted = facade.extract_text(&result.path).await.unwrap();
        assert!(extracted.page_count >= 1);
        assert!(extracted.text.contains("Hello world"));
        assert!(extracted.text.contains("Greeting"));
        assert_eq!(extracted.metadata.get("Title").map(String::as_str), Some("Greeting"));
    }

    #[tokio::test]
    async fn test_compose_text_preserves_words() {
        let dir = tempdir().unwrap();
        let facade = facade(dir.path());
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(40);

        let result = facade
            .compose_text(&text, "long.pdf", &OptionMap::new())
            .await
            .unwrap();
        let extracted = facade.extract_text(&result.path).await.unwrap();

        let normalize = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ");
        assert_eq!(normalize(&extracted.text), normalize(&text));
    }

    #[tokio::test]
    async fn test_compose_text_keeps_typographic_punctuation() {
        let dir = tempdir().unwrap();
        let facade = facade(dir.path());
        let text = "It\u{2019}s \u{201c}quoted\u{201d} \u{2014} costs \u{20ac}5\u{2026}";

        let result = facade
            .compose_text(text, "punct.pdf", &OptionMap::new())
            .await
            .unwrap();
        let extracted = facade.extract_text(&result.path).await.unwrap();

        let normalize = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ");
        assert_eq!(normalize(&extracted.text), normalize(text));
    }

    #[tokio::test]
    async fn test_compose_text_write_failure_settles_once() {
        let dir = tempdir().unwrap();
        let facade = facade(dir.path());
        std::fs::create_dir(facade.output_dir().join("t.pdf")).unwrap();

        let err = facade
            .compose_text("Hello", "t.pdf", &OptionMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::Compose { .. }));

        let result = facade
            .compose_text("Hello", "ok.pdf", &OptionMap::new())
            .await
            .unwrap();
        assert!(result.path.is_file());
    }

    #[tokio::test]
    async fn test_merge_is_order_preserving() {
        let dir = tempdir().unwrap();
        let facade = facade(dir.path());
        let long = "line\n".repeat(120);

        let a = facade.compose_text(&long, "a.pdf", &OptionMap::new()).await.unwrap();
        let b = facade.compose_text("short", "b.pdf", &OptionMap::new()).await.unwrap();
        let a_pages = page_count(&facade, &a.path).await;
        let b_pages = page_count(&facade, &b.path).await;

        let merged = facade
            .merge(&[a.path.clone(), b.path.clone()], "ab.pdf")
            .await
            .unwrap();
        assert_eq!(merged.pages(), Some((a_pages + b_pages) as u64));
        assert_eq!(page_count(&facade, &merged.path).await, a_pages + b_pages);

        let text = facade.extract_text(&merged.path).await.unwrap().text;
        let last_line = text.rfind("line").unwrap();
        assert!(text.find("short").unwrap() > last_line);
        // sources are left in place
        assert!(a.path.exists() && b.path.exists());
    }

    #[tokio::test]
    async fn test_merge_skips_missing_source() {
        let dir = tempdir().unwrap();
        let facade = facade(dir.path());
        let a = facade.compose_text("only me", "a.pdf", &OptionMap::new()).await.unwrap();

        let merged = facade
            .merge(&[a.path.clone(), dir.path().join("missing.pdf")], "m.pdf")
            .await
            .unwrap();
        assert_eq!(merged.pages(), Some(1));
        let text = facade.extract_text(&merged.path).await.unwrap().text;
        assert!(text.contains("only me"));
    }

    #[tokio::test]
    async fn test_merge_zero_sources_writes_empty_document() {
        let dir = tempdir().unwrap();
        let facade = facade(dir.path());
        let merged = facade.merge(&[], "none.pdf").await.unwrap();
        assert_eq!(merged.pages(), Some(0));
        assert!(merged.path.exists());
    }

    #[tokio::test]
    async fn test_merge_unparsable_source_fails() {
        let dir = tempdir().unwrap();
        let facade = facade(dir.path());
        let bogus = dir.path().join("bogus.pdf");
        std::fs::write(&bogus, b"definitely not a pdf").unwrap();

        let err = facade.merge(&[bogus], "m.pdf").await.unwrap_err();
        assert!(matches!(err, DocumentError::Merge { .. }));
    }

    #[tokio::test]
    async fn test_extract_missing_file_fails() {
        let dir = tempdir().unwrap();
        let facade = facade(dir.path());
        let err = facade
            .extract_text(&dir.path().join("nope.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::Extract { .. }));
    }

    #[tokio::test]
    async fn test_watermark_leaves_source_untouched() {
        let dir = tempdir().unwrap();
        let facade = facade(dir.path());
        let source = facade
            .compose_text(&"page\n".repeat(80), "src.pdf", &OptionMap::new())
            .await
            .unwrap();
        let before = std::fs::read(&source.path).unwrap();
        let pages = page_count(&facade, &source.path).await;

        let options = WatermarkOptions::default();
        let first = facade
            .apply_watermark(&source.path, "CONFIDENTIAL", "w1.pdf", &options)
            .await
            .unwrap();
        let second = facade
            .apply_watermark(&source.path, "CONFIDENTIAL", "w2.pdf", &options)
            .await
            .unwrap();

        assert_eq!(first.pages(), Some(pages as u64));
        assert_eq!(second.pages(), first.pages());
        assert!(std::fs::metadata(&first.path).unwrap().len() > 0);
        assert_eq!(std::fs::read(&source.path).unwrap(), before);
        assert_eq!(page_count(&facade, &first.path).await, pages);
    }

    #[tokio::test]
    async fn test_watermark_unparsable_source_fails() {
        let dir = tempdir().unwrap();
        let facade = facade(dir.path());
        let bogus = dir.path().join("bogus.pdf");
        std::fs::write(&bogus, b"nope").unwrap();

        let err = facade
            .apply_watermark(&bogus, "X", "w.pdf", &WatermarkOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::Watermark { .. }));
    }

    #[test]
    fn test_watermark_position_approximation() {
        assert_eq!(watermark_position("DRAFT", 600.0, 800.0), (250.0, 400.0));
    }

    #[tokio::test]
    async fn test_list_artifacts_includes_new_file() {
        let dir = tempdir().unwrap();
        let facade = facade(dir.path());
        facade.compose_text("x", "listed.pdf", &OptionMap::new()).await.unwrap();

        let files = facade.list_artifacts().await;
        let listed = files.iter().find(|f| f.name == "listed.pdf").unwrap();
        assert!(listed.size_bytes > 0);
    }

    #[tokio::test]
    async fn test_list_artifacts_degrades_to_empty() {
        let dir = tempdir().unwrap();
        let facade = facade(dir.path());
        std::fs::remove_dir_all(facade.output_dir()).unwrap();
        assert!(facade.list_artifacts().await.is_empty());
    }

    #[tokio::test]
    async fn test_execute_dispatches() {
        let dir = tempdir().unwrap();
        let facade = facade(dir.path());

        let outcome = facade
            .execute(OperationRequest::RenderText {
                text: "dispatched".to_string(),
                destination: "d.pdf".to_string(),
                options: OptionMap::new(),
            })
            .await
            .unwrap();
        let OperationOutcome::Written(descriptor) = outcome else {
            panic!("expected a written artifact");
        };

        let outcome = facade
            .execute(OperationRequest::ExtractText {
                source: descriptor.path,
            })
            .await
            .unwrap();
        let OperationOutcome::Extracted(extracted) = outcome else {
            panic!("expected extracted text");
        };
        assert!(extracted.text.contains("dispatched"));
    }

    #[tokio::test]
    async fn test_artifact_path() {
        let dir = tempdir().unwrap();
        let facade = facade(dir.path());
        facade.compose_text("x", "here.pdf", &OptionMap::new()).await.unwrap();

        assert!(facade.artifact_path("here.pdf").unwrap().is_file());
        assert!(matches!(
            facade.artifact_path("gone.pdf"),
            Err(DocumentError::NotFound(_))
        ));
        assert!(matches!(
            facade.artifact_path("../here.pdf"),
            Err(DocumentError::InvalidName(_))
        ));
    }
}
