//! Shared lopdf helpers for page geometry, resources and text strings.

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use super::fonts::HELVETICA;
use super::{ProviderError, ProviderResult};

/// US Letter, used when a page tree carries no MediaBox at all.
const FALLBACK_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Attributes a page may inherit from its ancestors in the page tree.
pub const INHERITABLE_PAGE_KEYS: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Maximum page tree depth walked when resolving inherited attributes.
const MAX_TREE_DEPTH: usize = 32;

/// Dictionary for the standard Helvetica font with WinAnsiEncoding.
pub fn helvetica_font() -> Dictionary {
    Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(HELVETICA.as_bytes().to_vec())),
        ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
    ])
}

/// Follow a reference to the object it names; other objects pass through.
pub fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        _ => object,
    }
}

/// Look up `key` on a page, walking up `Parent` links for inherited values.
pub fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = page_id;
    for _ in 0..MAX_TREE_DEPTH {
        let dict = doc.get_dictionary(current).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value.clone());
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => current = *parent,
            _ => return None,
        }
    }
    None
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// Effective MediaBox of a page as `[x0, y0, x1, y1]`.
pub fn media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    let Some(object) = inherited_attribute(doc, page_id, b"MediaBox") else {
        return FALLBACK_MEDIA_BOX;
    };
    let Object::Array(values) = resolve(doc, &object) else {
        return FALLBACK_MEDIA_BOX;
    };
    let values: Vec<f32> = values
        .iter()
        .filter_map(|v| number(resolve(doc, v)))
        .collect();
    match values.as_slice() {
        [x0, y0, x1, y1] => [*x0, *y0, *x1, *y1],
        _ => FALLBACK_MEDIA_BOX,
    }
}

/// Width and height of a page in default user space (unrotated).
pub fn page_dimensions(doc: &Document, page_id: ObjectId) -> (f32, f32) {
    let [x0, y0, x1, y1] = media_box(doc, page_id);
    ((x1 - x0).abs(), (y1 - y0).abs())
}

/// Copy inherited attributes onto the page dictionary itself, so the page
/// keeps its geometry and resources when moved into another page tree.
pub fn materialize_inherited(doc: &mut Document, page_id: ObjectId) -> ProviderResult<()> {
    let inherited: Vec<(&[u8], Object)> = INHERITABLE_PAGE_KEYS
        .iter()
        .filter_map(|key| inherited_attribute(doc, page_id, key).map(|value| (*key, value)))
        .collect();

    let page = doc.get_dictionary_mut(page_id)?;
    for (key, value) in inherited {
        if !page.has(key) {
            page.set(key.to_vec(), value);
        }
    }
    Ok(())
}

/// A page's resource dictionary as an owned, directly editable copy.
pub fn owned_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    inherited_attribute(doc, page_id, b"Resources")
        .and_then(|r| resolve(doc, &r).as_dict().ok().cloned())
        .unwrap_or_default()
}

/// Insert `name -> value` into the sub-dictionary `category` (Font,
/// ExtGState, ...) of `resources`, resolving an indirect sub-dictionary.
pub fn add_resource(
    doc: &Document,
    resources: &mut Dictionary,
    category: &str,
    name: &str,
    value: Object,
) {
    let mut entries = resources
        .get(category.as_bytes())
        .ok()
        .and_then(|o| resolve(doc, o).as_dict().ok().cloned())
        .unwrap_or_default();
    entries.set(name, value);
    resources.set(category, Object::Dictionary(entries));
}

/// Wrap a page's existing content in `q`/`Q` and append `content` after it.
pub fn append_page_content(
    doc: &mut Document,
    page_id: ObjectId,
    content: Vec<u8>,
) -> ProviderResult<()> {
    let existing = match doc.get_dictionary(page_id)?.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => Some(Object::Array(items.clone())),
            _ => Some(Object::Reference(*id)),
        },
        Ok(other) => Some(other.clone()),
        Err(_) => None,
    };

    let mut streams = Vec::new();
    match existing {
        Some(Object::Array(items)) => {
            streams.push(Object::Reference(
                doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec())),
            ));
            streams.extend(items);
        }
        Some(item @ Object::Reference(_)) => {
            streams.push(Object::Reference(
                doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec())),
            ));
            streams.push(item);
        }
        _ => {}
    }

    let mut tail = if streams.is_empty() {
        Vec::new()
    } else {
        b"\nQ\n".to_vec()
    };
    tail.extend(content);
    streams.push(Object::Reference(
        doc.add_object(Stream::new(Dictionary::new(), tail)),
    ));

    doc.get_dictionary_mut(page_id)?
        .set("Contents", Object::Array(streams));
    Ok(())
}

/// Decode a PDF text string: UTF-16BE or UTF-8 when a byte order mark is
/// present, otherwise PDFDocEncoding approximated as Latin-1.
pub fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xfe, 0xff]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Some(rest) = bytes.strip_prefix(b"\xef\xbb\xbf") {
        return String::from_utf8_lossy(rest).into_owned();
    }
    bytes.iter().map(|&b| b as char).collect()
}

/// The trailer's Info dictionary, if any.
pub fn info_dictionary(doc: &Document) -> Option<&Dictionary> {
    let info = doc.trailer.get(b"Info").ok()?;
    resolve(doc, info).as_dict().ok()
}

/// Add a catalog for `pages_id` and make it the document root.
pub fn set_catalog(doc: &mut Document, pages_id: ObjectId) -> ObjectId {
    let catalog_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));
    catalog_id
}

/// Map a lopdf failure into a provider error with context.
pub fn pdf_error(context: &str, e: lopdf::Error) -> ProviderError {
    ProviderError::Pdf(format!("{}: {}", context, e))
}
