//! Text overlays drawn on top of existing pages.
//!
//! The overlay is appended as a separate content stream. The page's existing
//! content is wrapped in `q`/`Q` first so any graphics state it leaves behind
//! cannot leak into the overlay. Opacity goes through an ExtGState resource
//! and rotation through the text matrix.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};

use super::fonts::encode_win_ansi;
use super::pdf::{
    add_resource, append_page_content, helvetica_font, media_box, owned_resources, page_dimensions,
    pdf_error, resolve,
};
use super::{OverlayDocument, OverlayProvider, ProviderError, ProviderResult, TextOverlay};

const FONT_RESOURCE: &str = "PdfbotOverlayFont";
const STATE_RESOURCE_PREFIX: &str = "PdfbotOverlayGs";

#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfOverlay;

impl OverlayProvider for LopdfOverlay {
    fn load(&self, bytes: &[u8]) -> ProviderResult<Box<dyn OverlayDocument>> {
        let doc = Document::load_mem(bytes).map_err(|e| pdf_error("Failed to load PDF", e))?;
        let page_ids = doc.get_pages().into_values().collect();
        Ok(Box::new(LopdfOverlayDocument {
            doc,
            page_ids,
            font_id: None,
        }))
    }
}

struct LopdfOverlayDocument {
    doc: Document,
    page_ids: Vec<ObjectId>,
    /// Shared Helvetica object, added on first draw.
    font_id: Option<ObjectId>,
}

impl LopdfOverlayDocument {
    fn page_id(&self, index: usize) -> ProviderResult<ObjectId> {
        self.page_ids.get(index).copied().ok_or_else(|| {
            ProviderError::Pdf(format!(
                "Page {} out of range ({} pages)",
                index + 1,
                self.page_ids.len()
            ))
        })
    }

    fn font(&mut self) -> ObjectId {
        match self.font_id {
            Some(id) => id,
            None => {
                let id = self.doc.add_object(helvetica_font());
                self.font_id = Some(id);
                id
            }
        }
    }

    /// First `PdfbotOverlayGs<n>` not already bound in the page's ExtGState
    /// resources, so earlier overlays keep their own opacity.
    fn free_state_name(&self, resources: &Dictionary) -> String {
        let taken = resources
            .get(b"ExtGState")
            .ok()
            .and_then(|o| resolve(&self.doc, o).as_dict().ok());
        let mut n = 1usize;
        loop {
            let name = format!("{}{}", STATE_RESOURCE_PREFIX, n);
            if !taken.is_some_and(|d| d.has(name.as_bytes())) {
                return name;
            }
            n += 1;
        }
    }
}

impl OverlayDocument for LopdfOverlayDocument {
    fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn page_size(&self, index: usize) -> ProviderResult<(f32, f32)> {
        let page_id = self.page_id(index)?;
        Ok(page_dimensions(&self.doc, page_id))
    }

    fn draw_text(&mut self, index: usize, overlay: &TextOverlay) -> ProviderResult<()> {
        let page_id = self.page_id(index)?;
        let font_id = self.font();

        let opacity = overlay.opacity.clamp(0.0, 1.0);
        let state_id = self.doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"ExtGState".to_vec())),
            ("ca", opacity.into()),
            ("CA", opacity.into()),
        ]));
        let mut resources = owned_resources(&self.doc, page_id);
        let state_name = self.free_state_name(&resources);
        add_resource(
            &self.doc,
            &mut resources,
            "Font",
            FONT_RESOURCE,
            Object::Reference(font_id),
        );
        add_resource(
            &self.doc,
            &mut resources,
            "ExtGState",
            &state_name,
            Object::Reference(state_id),
        );
        self.doc
            .get_dictionary_mut(page_id)?
            .set("Resources", Object::Dictionary(resources));

        let [x0, y0, _, _] = media_box(&self.doc, page_id);
        let (sin, cos) = overlay.rotation_degrees.to_radians().sin_cos();
        let (r, g, b) = overlay.color;
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new("gs", vec![Object::Name(state_name.into_bytes())]),
                Operation::new("rg", vec![r.into(), g.into(), b.into()]),
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tf",
                    vec![
                        Object::Name(FONT_RESOURCE.as_bytes().to_vec()),
                        overlay.font_size.into(),
                    ],
                ),
                Operation::new(
                    "Tm",
                    vec![
                        cos.into(),
                        sin.into(),
                        (-sin).into(),
                        cos.into(),
                        (x0 + overlay.x).into(),
                        (y0 + overlay.y).into(),
                    ],
                ),
                Operation::new(
                    "Tj",
                    vec![Object::String(
                        encode_win_ansi(&overlay.text),
                        StringFormat::Literal,
                    )],
                ),
                Operation::new("ET", vec![]),
                Operation::new("Q", vec![]),
            ],
        }
        .encode()
        .map_err(|e| pdf_error("Failed to encode overlay", e))?;

        append_page_content(&mut self.doc, page_id, content)
    }

    fn save(&mut self) -> ProviderResult<Vec<u8>> {
        let mut bytes = Vec::new();
        self.doc.save_to(&mut bytes)?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::super::{ComposeProvider, LopdfComposer, PageLayout, TextAlign, TextStyle};
    use super::*;

    fn two_page_pdf() -> Vec<u8> {
        let mut doc = LopdfComposer.new_document(PageLayout {
            width: 300.0,
            height: 200.0,
            margin: 20.0,
        });
        doc.add_text(
            &vec!["filler"; 20].join("\n"),
            TextStyle {
                font_size: 12.0,
                align: TextAlign::Left,
                line_gap: 5.0,
            },
        );
        let mut bytes = Vec::new();
        doc.finish(&mut bytes).unwrap();
        bytes
    }

    fn stamp() -> TextOverlay {
        TextOverlay {
            text: "DRAFT".to_string(),
            x: 100.0,
            y: 100.0,
            font_size: 50.0,
            color: (0.7, 0.7, 0.7),
            opacity: 0.3,
            rotation_degrees: 45.0,
        }
    }

    #[test]
    fn test_draw_on_every_page() {
        let source = two_page_pdf();
        let mut doc = LopdfOverlay.load(&source).unwrap();
        let pages = doc.page_count();
        assert!(pages >= 2);
        assert_eq!(doc.page_size(0).unwrap(), (300.0, 200.0));

        for index in 0..pages {
            doc.draw_text(index, &stamp()).unwrap();
        }
        let out = doc.save().unwrap();

        let reloaded = Document::load_mem(&out).unwrap();
        assert_eq!(reloaded.get_pages().len(), pages);
        for page_id in reloaded.get_pages().into_values() {
            let content = reloaded.get_page_content(page_id).unwrap();
            let text = String::from_utf8_lossy(&content);
            assert!(text.contains("(DRAFT) Tj"));
            assert!(text.contains("PdfbotOverlayFont"));
        }
    }

    fn state_opacities(bytes: &[u8]) -> Vec<(String, f32)> {
        let doc = Document::load_mem(bytes).unwrap();
        let page_id = doc.get_pages().into_values().next().unwrap();
        let resources = owned_resources(&doc, page_id);
        let states = resolve(&doc, resources.get(b"ExtGState").unwrap())
            .as_dict()
            .unwrap();
        states
            .iter()
            .map(|(name, value)| {
                let state = resolve(&doc, value).as_dict().unwrap();
                let ca = state.get(b"ca").unwrap().as_float().unwrap();
                (String::from_utf8_lossy(name).into_owned(), ca)
            })
            .collect()
    }

    #[test]
    fn test_second_watermark_keeps_first_opacity() {
        let mut first = LopdfOverlay.load(&two_page_pdf()).unwrap();
        first
            .draw_text(0, &TextOverlay { opacity: 0.9, ..stamp() })
            .unwrap();
        let once = first.save().unwrap();

        let mut second = LopdfOverlay.load(&once).unwrap();
        second
            .draw_text(0, &TextOverlay { opacity: 0.1, ..stamp() })
            .unwrap();
        let twice = second.save().unwrap();

        let mut states = state_opacities(&twice);
        states.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(states.len(), 2);
        assert_eq!(states[0].0, "PdfbotOverlayGs1");
        assert!((states[0].1 - 0.9).abs() < 1e-4);
        assert_eq!(states[1].0, "PdfbotOverlayGs2");
        assert!((states[1].1 - 0.1).abs() < 1e-4);
    }

    #[test]
    fn test_page_out_of_range() {
        let mut doc = LopdfOverlay.load(&two_page_pdf()).unwrap();
        assert!(doc.draw_text(99, &stamp()).is_err());
        assert!(doc.page_size(99).is_err());
    }
}
