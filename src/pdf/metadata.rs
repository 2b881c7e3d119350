//! PDF metadata extraction

use lopdf::{Document, Object};
use crate::error::{Error, Result};
use crate::pdf::resources::get_resolved;

/// Count pages by reading the Count field from the Pages dictionary
/// This is more reliable than get_pages() which doesn't handle nested page trees
fn count_pages_from_catalog(doc: &Document) -> Result<usize> {
    let catalog = doc.catalog()
        .map_err(|_| Error::Decode("no document catalog".to_string()))?;

    let pages_dict = match get_resolved(doc, catalog, b"Pages") {
        Some(Object::Dictionary(dict)) => dict,
        Some(_) => return Err(Error::Decode("Pages is not a dictionary".to_string())),
        None => return Err(Error::Decode("no Pages in catalog".to_string())),
    };

    match get_resolved(doc, pages_dict, b"Count") {
        Some(Object::Integer(n)) if *n >= 0 => Ok(*n as usize),
        Some(_) => Err(Error::Decode("Count is not a page count".to_string())),
        None => Err(Error::Decode("no Count in Pages".to_string())),
    }
}

/// PDF metadata
#[derive(Debug, Clone)]
pub struct PdfMetadata {
    /// Number of pages in the PDF
    pub page_count: usize,
    /// Document title (if present)
    pub title: Option<String>,
    /// Document author (if present)
    pub author: Option<String>,
}

/// Decode an Info string, which is either UTF-16BE with a BOM or single-byte text
fn info_text(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Extract metadata from a loaded document
///
/// `name` identifies the document in errors.
pub fn extract_metadata(doc: &Document, name: &str) -> Result<PdfMetadata> {
    let page_count = count_pages(doc, name)?;

    let mut title = None;
    let mut author = None;

    if let Some(Object::Dictionary(info)) = get_resolved(doc, &doc.trailer, b"Info") {
        if let Some(Object::String(bytes, _)) = get_resolved(doc, info, b"Title") {
            title = Some(info_text(bytes));
        }
        if let Some(Object::String(bytes, _)) = get_resolved(doc, info, b"Author") {
            author = Some(info_text(bytes));
        }
    }

    Ok(PdfMetadata {
        page_count,
        title,
        author,
    })
}

/// Count the pages of a loaded document, rejecting documents without any
pub fn count_pages(doc: &Document, name: &str) -> Result<usize> {
    let page_count = count_pages_from_catalog(doc)?;

    if page_count == 0 || doc.get_pages().is_empty() {
        return Err(Error::EmptyPdf(name.to_string()));
    }

    Ok(page_count)
}
