//! Text and metadata extraction.

use std::collections::BTreeMap;

use lopdf::{Document, Object};

use super::pdf::{decode_text_string, info_dictionary, pdf_error, resolve};
use super::{ExtractProvider, ExtractedText, ProviderError, ProviderResult};

/// Uses pdf-extract for the text layer and lopdf for structure.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl ExtractProvider for PdfTextExtractor {
    fn parse(&self, bytes: &[u8]) -> ProviderResult<ExtractedText> {
        let doc = Document::load_mem(bytes).map_err(|e| pdf_error("Failed to parse PDF", e))?;
        let page_count = doc.get_pages().len();
        let metadata = document_metadata(&doc);

        let text = if page_count == 0 {
            String::new()
        } else {
            pdf_extract::extract_text_from_mem(bytes)
                .map_err(|e| ProviderError::Pdf(format!("Failed to extract text: {}", e)))?
        };

        Ok(ExtractedText {
            text,
            page_count,
            metadata,
        })
    }
}

/// Document information entries as strings, plus the header version.
fn document_metadata(doc: &Document) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    metadata.insert("PDFFormatVersion".to_string(), doc.version.clone());

    let Some(info) = info_dictionary(doc) else {
        return metadata;
    };
    for (key, value) in info.iter() {
        let value = match resolve(doc, value) {
            Object::String(bytes, _) => decode_text_string(bytes),
            Object::Name(name) => String::from_utf8_lossy(name).into_owned(),
            Object::Integer(i) => i.to_string(),
            Object::Real(r) => r.to_string(),
            Object::Boolean(b) => b.to_string(),
            _ => continue,
        };
        metadata.insert(String::from_utf8_lossy(key).into_owned(), value);
    }
    metadata
}
