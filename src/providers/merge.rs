//! Page-order-preserving PDF concatenation with lopdf.

use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

use super::pdf::{materialize_inherited, pdf_error, set_catalog};
use super::{MergeProvider, MergeSession, ProviderResult};

/// Merges documents by renumbering each source into a shared object space
/// and hanging every page under one new page tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfMerger;

impl MergeProvider for LopdfMerger {
    fn begin(&self) -> Box<dyn MergeSession> {
        Box::new(LopdfMergeSession {
            document: Document::with_version("1.5"),
            pages: Vec::new(),
            next_id: 1,
        })
    }
}

struct LopdfMergeSession {
    document: Document,
    /// Page dictionaries in output order.
    pages: Vec<(ObjectId, Dictionary)>,
    next_id: u32,
}

impl MergeSession for LopdfMergeSession {
    fn append(&mut self, path: &Path) -> ProviderResult<()> {
        let mut source = Document::load(path)
            .map_err(|e| pdf_error(&format!("Failed to load {}", path.display()), e))?;

        source.renumber_objects_with(self.next_id);
        self.next_id = source.max_id + 1;

        // get_pages walks the tree in reading order
        let page_ids: Vec<ObjectId> = source.get_pages().into_values().collect();
        for &page_id in &page_ids {
            materialize_inherited(&mut source, page_id)?;
        }
        for &page_id in &page_ids {
            let page = source.get_dictionary(page_id)?.clone();
            self.pages.push((page_id, page));
        }

        for (object_id, object) in source.objects {
            match object.type_name().unwrap_or("") {
                "Catalog" | "Pages" | "Page" | "Outlines" | "Outline" => {}
                _ => {
                    self.document.objects.insert(object_id, object);
                }
            }
        }

        debug!("Appended {} pages from {}", page_ids.len(), path.display());
        Ok(())
    }

    fn save(self: Box<Self>, destination: &Path) -> ProviderResult<usize> {
        let Self {
            mut document,
            pages,
            next_id,
        } = *self;
        document.max_id = next_id.saturating_sub(1);

        let pages_id = document.new_object_id();
        let mut kids = Vec::with_capacity(pages.len());
        for (page_id, mut page) in pages {
            page.set("Parent", Object::Reference(pages_id));
            document.objects.insert(page_id, Object::Dictionary(page));
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len();
        document.objects.insert(
            pages_id,
            Object::Dictionary(Dictionary::from_iter([
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Kids", Object::Array(kids)),
                ("Count", Object::Integer(count as i64)),
            ])),
        );
        set_catalog(&mut document, pages_id);

        document.compress();
        document.save(destination)?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::super::pdf::page_dimensions;
    use super::super::{ComposeProvider, LopdfComposer, PageLayout, TextAlign, TextStyle};
    use super::*;

    fn write_document(path: &Path, width: f32, lines: usize) {
        let mut doc = LopdfComposer.new_document(PageLayout {
            width,
            height: 300.0,
            margin: 20.0,
        });
        let text = vec!["line"; lines].join("\n");
        doc.add_text(
            &text,
            TextStyle {
                font_size: 12.0,
                align: TextAlign::Left,
                line_gap: 5.0,
            },
        );
        let mut file = std::fs::File::create(path).unwrap();
        doc.finish(&mut file).unwrap();
    }

    fn widths(path: &Path) -> Vec<f32> {
        let doc = Document::load(path).unwrap();
        doc.get_pages()
            .into_values()
            .map(|id| page_dimensions(&doc, id).0)
            .collect()
    }

    #[test]
    fn test_merge_preserves_page_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.pdf");
        let b = dir.path().join("b.pdf");
        write_document(&a, 200.0, 30);
        write_document(&b, 400.0, 1);
        let a_pages = widths(&a).len();

        let mut session = LopdfMerger.begin();
        session.append(&a).unwrap();
        session.append(&b).unwrap();
        let out = dir.path().join("out.pdf");
        let count = session.save(&out).unwrap();

        let merged = widths(&out);
        assert_eq!(count, a_pages + 1);
        assert_eq!(merged.len(), count);
        assert!(merged[..a_pages].iter().all(|w| (*w - 200.0).abs() < 0.01));
        assert!((merged[a_pages] - 400.0).abs() < 0.01);
    }

    #[test]
    fn test_merge_nothing_yields_empty_tree() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("empty.pdf");
        let count = LopdfMerger.begin().save(&out).unwrap();
        assert_eq!(count, 0);
        assert!(Document::load(&out).unwrap().get_pages().is_empty());
    }

    #[test]
    fn test_append_garbage_fails() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("bogus.pdf");
        std::fs::write(&bogus, b"not a pdf").unwrap();
        assert!(LopdfMerger.begin().append(&bogus).is_err());
    }
}
