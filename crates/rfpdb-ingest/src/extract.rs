use rfpdb_core::error::Result;
use rfpdb_core::types::{DocumentFormat, ExtractedText, RawDocument};
use tracing::warn;

use crate::hwp::CompoundDocumentExtractor;
use crate::paginated::{extract_paginated, extract_plain};

/// Extract normalized text according to the document's declared format.
pub fn extract(doc: &RawDocument) -> Result<ExtractedText> {
    match doc.format {
        DocumentFormat::CompoundBinary => CompoundDocumentExtractor::new().extract_bytes(&doc.doc_id, &doc.bytes),
        DocumentFormat::Paginated => extract_paginated(&doc.doc_id, &doc.bytes),
        DocumentFormat::PlainText => Ok(extract_plain(&doc.doc_id, &doc.bytes)),
    }
}

/// Like [`extract`], but any failure degrades to empty text with the reason
/// recorded in `failure`.
pub fn extract_or_empty(doc: &RawDocument) -> ExtractedText {
    extract(doc).unwrap_or_else(|e| {
        warn!(doc_id = %doc.doc_id, format = doc.format.as_str(), error = %e, "extraction failed, using empty text");
        ExtractedText::failed(&doc.doc_id, e.to_string())
    })
}
