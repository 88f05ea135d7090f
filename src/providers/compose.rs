//! Paginated text documents written with lopdf.

use std::io::Write;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, StringFormat, Stream};

use super::fonts::{encode_win_ansi, text_width, wrap_text};
use super::pdf::{helvetica_font, pdf_error, set_catalog};
use super::{ComposeProvider, ComposedDocument, PageLayout, ProviderResult, TextAlign, TextStyle};

/// Line height as a multiple of the font size, before the line gap.
const LINE_HEIGHT_FACTOR: f32 = 1.2;

/// Resource name of the body font.
const FONT_RESOURCE: &str = "F1";

/// Composes text documents in the standard Helvetica font.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfComposer;

impl ComposeProvider for LopdfComposer {
    fn new_document(&self, layout: PageLayout) -> Box<dyn ComposedDocument> {
        Box::new(TextDocument::new(layout))
    }
}

struct TextDocument {
    layout: PageLayout,
    pages: Vec<Vec<Operation>>,
    /// Distance from the top edge of the current page to the next line.
    cursor: f32,
    line_height: f32,
    info: Vec<(String, String)>,
}

impl TextDocument {
    fn new(layout: PageLayout) -> Self {
        Self {
            layout,
            pages: vec![Vec::new()],
            cursor: layout.margin,
            line_height: 12.0 * LINE_HEIGHT_FACTOR,
            info: Vec::new(),
        }
    }

    fn usable_width(&self) -> f32 {
        (self.layout.width - 2.0 * self.layout.margin).max(1.0)
    }

    fn bottom_limit(&self) -> f32 {
        self.layout.height - self.layout.margin
    }

    fn new_page(&mut self) {
        self.pages.push(Vec::new());
        self.cursor = self.layout.margin;
    }

    fn write_line(&mut self, line: &str, style: TextStyle) {
        let advance = style.font_size * LINE_HEIGHT_FACTOR + style.line_gap;
        if self.cursor + style.font_size > self.bottom_limit() && self.cursor > self.layout.margin
        {
            self.new_page();
        }

        let x = match style.align {
            TextAlign::Left => self.layout.margin,
            TextAlign::Center => {
                let free = self.usable_width() - text_width(line, style.font_size);
                self.layout.margin + (free / 2.0).max(0.0)
            }
        };
        let y = self.layout.height - self.cursor - style.font_size;

        if let Some(ops) = self.pages.last_mut().filter(|_| !line.is_empty()) {
            ops.push(Operation::new("BT", vec![]));
            ops.push(Operation::new(
                "Tf",
                vec![Object::Name(FONT_RESOURCE.as_bytes().to_vec()), style.font_size.into()],
            ));
            ops.push(Operation::new("Td", vec![x.into(), y.into()]));
            ops.push(Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(line), StringFormat::Literal)],
            ));
            ops.push(Operation::new("ET", vec![]));
        }

        self.cursor += advance;
        self.line_height = advance;
    }

    fn build(self) -> ProviderResult<Document> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(helvetica_font());
        let resources_id = doc.add_object(Dictionary::from_iter([(
            "Font",
            Object::Dictionary(Dictionary::from_iter([(
                FONT_RESOURCE,
                Object::Reference(font_id),
            )])),
        )]));

        let mut kids = Vec::with_capacity(self.pages.len());
        for operations in self.pages {
            let content = Content { operations }
                .encode()
                .map_err(|e| pdf_error("Failed to encode page content", e))?;
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content));
            let page_id = doc.add_object(Dictionary::from_iter([
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(pages_id)),
                ("Contents", Object::Reference(content_id)),
                ("Resources", Object::Reference(resources_id)),
                (
                    "MediaBox",
                    Object::Array(vec![
                        0.into(),
                        0.into(),
                        self.layout.width.into(),
                        self.layout.height.into(),
                    ]),
                ),
            ]));
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(Dictionary::from_iter([
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Kids", Object::Array(kids)),
                ("Count", Object::Integer(count)),
            ])),
        );
        set_catalog(&mut doc, pages_id);

        let mut info = Dictionary::from_iter([
            (
                "Producer",
                Object::string_literal(concat!("pdfbot ", env!("CARGO_PKG_VERSION"))),
            ),
            (
                "CreationDate",
                Object::string_literal(chrono::Utc::now().format("D:%Y%m%d%H%M%SZ").to_string()),
            ),
        ]);
        for (key, value) in &self.info {
            info.set(key.as_str(), Object::String(encode_win_ansi(value), StringFormat::Literal));
        }
        let info_id = doc.add_object(info);
        doc.trailer.set("Info", Object::Reference(info_id));

        doc.compress();
        Ok(doc)
    }
}

impl ComposedDocument for TextDocument {
    fn add_text(&mut self, text: &str, style: TextStyle) {
        let width = self.usable_width();
        for paragraph in text.lines() {
            for line in wrap_text(paragraph, width, style.font_size) {
                self.write_line(&line, style);
            }
        }
    }

    fn move_down(&mut self, lines: f32) {
        self.cursor += lines * self.line_height;
        if self.cursor > self.bottom_limit() {
            self.new_page();
        }
    }

    fn set_info(&mut self, key: &str, value: &str) {
        self.info.push((key.to_string(), value.to_string()));
    }

    fn finish(self: Box<Self>, mut sink: &mut dyn Write) -> ProviderResult<()> {
        let mut doc = self.build()?;
        doc.save_to(&mut sink)?;
        sink.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: TextStyle = TextStyle {
        font_size: 12.0,
        align: TextAlign::Left,
        line_gap: 5.0,
    };

    fn layout() -> PageLayout {
        PageLayout {
            width: 595.28,
            height: 841.89,
            margin: 50.0,
        }
    }

    fn finish(doc: Box<dyn ComposedDocument>) -> Document {
        let mut bytes = Vec::new();
        doc.finish(&mut bytes).unwrap();
        Document::load_mem(&bytes).unwrap()
    }

    #[test]
    fn test_empty_document_has_one_page() {
        let doc = finish(LopdfComposer.new_document(layout()));
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_long_text_paginates() {
        let mut doc = LopdfComposer.new_document(layout());
        let text = (0..200)
            .map(|i| format!("Line number {}", i))
            .collect::<Vec<_>>()
            .join("\n");
        doc.add_text(&text, BODY);

        let loaded = finish(doc);
        // 200 lines at ~19.4pt each cannot fit on one A4 page
        assert!(loaded.get_pages().len() >= 5);
    }

    #[test]
    fn test_info_title_is_written() {
        let mut doc = LopdfComposer.new_document(layout());
        doc.set_info("Title", "Report");
        doc.add_text("body", BODY);

        let loaded = finish(doc);
        let info = super::super::pdf::info_dictionary(&loaded).unwrap();
        assert_eq!(info.get(b"Title").unwrap().as_str().unwrap(), b"Report");
    }
}
