//! Page-based and plain-text extraction.

use std::panic::{catch_unwind, AssertUnwindSafe};

use rfpdb_core::error::{Error, Result};
use rfpdb_core::types::ExtractedText;

use crate::normalize::normalize_text;

/// Extract the text layer of a paginated document held in memory.
/// Scanned pages without a text layer yield empty text, not an error.
/// A parser panic on malformed input is reported as [`Error::Format`].
pub fn extract_paginated(doc_id: &str, bytes: &[u8]) -> Result<ExtractedText> {
    let text = catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes)))
        .map_err(|_| Error::Format("paginated document unreadable: extractor panicked".to_string()))?
        .map_err(|e| Error::Format(format!("paginated document unreadable: {}", e)))?;
    let mut warnings = Vec::new();
    if text.trim().is_empty() {
        warnings.push("no text layer found".to_string());
    }
    Ok(ExtractedText::new(doc_id, normalize_text(&text), warnings))
}

pub fn extract_plain(doc_id: &str, bytes: &[u8]) -> ExtractedText {
    let mut warnings = Vec::new();
    let text = match std::str::from_utf8(bytes) {
        Ok(s) => normalize_text(s),
        Err(e) => {
            warnings.push(format!("invalid UTF-8 at byte {}, decoded lossily", e.valid_up_to()));
            normalize_text(&String::from_utf8_lossy(bytes))
        }
    };
    ExtractedText::new(doc_id, text, warnings)
}
