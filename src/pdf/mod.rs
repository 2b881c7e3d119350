//! PDF label processing module

pub mod fonts;
pub mod metadata;
pub mod rewrite;
pub mod text;
pub(crate) mod resources;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used items
pub use metadata::{count_pages, extract_metadata, PdfMetadata};
pub use rewrite::{rewrite_document, rewrite_pdf, DocumentRewrite, PageEditor, PdfRewrite};
pub use text::{find_matches, PhraseLocator, TextSpan, TextSpanMatch, LEAD_IN_PHRASES};
