//! Boundary-aware sliding-window chunking.
//!
//! All positions are character offsets; the text is addressed as a `Vec<char>`
//! so that windows never split a code point.

use std::sync::Arc;
use tracing::debug;

use crate::config::{ChunkingConfig, ChunkingSettings};
use crate::error::{Error, Result};
use crate::types::{Chunk, DocumentFormat, DocumentMetadata, ExtractedText};

/// How far back from a window end a sentence boundary is looked for.
pub const BOUNDARY_LOOKBACK: usize = 50;
/// How far forward from the next start a sentence boundary is looked for.
pub const BOUNDARY_LOOKAHEAD: usize = 100;

const SENTENCE_ENDINGS: &[&[char]] = &[
    &['.', ' '],
    &['.', '\n'],
    &['!', ' '],
    &['!', '\n'],
    &['?', ' '],
    &['?', '\n'],
    &['。'],
    &['\n', '\n'],
];

#[derive(Debug, Clone, Default)]
pub struct AdaptiveChunker {
    settings: ChunkingSettings,
}

impl AdaptiveChunker {
    pub fn new(settings: ChunkingSettings) -> Result<Self> {
        settings.default.validate()?;
        settings.compound_binary.validate()?;
        settings.paginated.validate()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &ChunkingSettings {
        &self.settings
    }

    /// Chunk with the parameters configured for `format`.
    pub fn chunk(
        &self,
        text: &ExtractedText,
        format: DocumentFormat,
        metadata: Arc<DocumentMetadata>,
    ) -> Result<Vec<Chunk>> {
        chunk_with(&self.settings.for_format(format), text, metadata)
    }
}

/// Split `text` into chunks using explicit parameters.
pub fn chunk_with(
    config: &ChunkingConfig,
    text: &ExtractedText,
    metadata: Arc<DocumentMetadata>,
) -> Result<Vec<Chunk>> {
    config.validate()?;
    let chars: Vec<char> = text.text.chars().collect();
    let n = chars.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    let chunk_size = config.chunk_size;
    let overlap = config.effective_overlap();
    let min_size = config.min_chunk_size;

    let mut spans: Vec<(usize, usize)> = Vec::new();
    let mut index = 0usize;

    while index < n {
        let mut end = (index + chunk_size).min(n);
        if end < n {
            if let Some(boundary) = boundary_before(&chars, end, index) {
                if boundary >= index + min_size {
                    end = boundary;
                }
            }
        }

        let piece_len = trimmed_len(&chars[index..end]);
        if piece_len < min_size && index > 0 {
            if let Some(last) = spans.last_mut() {
                last.1 = end;
            }
            if end >= n {
                break;
            }
            index = end;
            continue;
        }

        spans.push((index, end));
        if end >= n {
            break;
        }

        let mut next = end.saturating_sub(overlap).max(index + min_size);
        if next < n {
            if let Some(boundary) = boundary_after(&chars, next) {
                if boundary < end {
                    next = boundary;
                }
            }
        }
        if next <= index {
            return Err(Error::Boundary(format!(
                "{}: next window start {} does not advance past {}",
                text.doc_id, next, index
            )));
        }
        index = next;
    }

    if spans.len() >= 2 {
        if let Some(&(start, end)) = spans.last() {
            if end - start < min_size {
                spans.pop();
                if let Some(prev) = spans.last_mut() {
                    prev.1 = end;
                }
            }
        }
    }

    debug!(doc_id = %text.doc_id, chars = n, chunks = spans.len(), "chunked document");

    Ok(spans
        .into_iter()
        .enumerate()
        .map(|(chunk_index, (start, end))| Chunk {
            chunk_id: Chunk::make_id(&text.doc_id, chunk_index),
            doc_id: text.doc_id.clone(),
            chunk_index,
            text: chars[start..end].iter().collect(),
            char_offset_start: start,
            char_offset_end: end,
            metadata: Arc::clone(&metadata),
        })
        .collect())
}

fn trimmed_len(chars: &[char]) -> usize {
    let start = chars.iter().position(|c| !c.is_whitespace());
    let end = chars.iter().rposition(|c| !c.is_whitespace());
    match (start, end) {
        (Some(s), Some(e)) => e - s + 1,
        _ => 0,
    }
}

fn ends_with_boundary(chars: &[char], pos: usize) -> bool {
    SENTENCE_ENDINGS
        .iter()
        .any(|ending| pos >= ending.len() && chars[pos - ending.len()..pos] == **ending)
}

/// Nearest position `p` in `(floor, end]`, at most [`BOUNDARY_LOOKBACK`] back
/// from `end`, that immediately follows a sentence ending.
fn boundary_before(chars: &[char], end: usize, floor: usize) -> Option<usize> {
    let lowest = end.saturating_sub(BOUNDARY_LOOKBACK).max(floor + 1);
    (lowest..=end).rev().find(|&p| ends_with_boundary(chars, p))
}

/// First position after a sentence ending that starts within
/// [`BOUNDARY_LOOKAHEAD`] characters of `start`.
fn boundary_after(chars: &[char], start: usize) -> Option<usize> {
    let limit = (start + BOUNDARY_LOOKAHEAD).min(chars.len());
    (start..limit).find_map(|i| {
        SENTENCE_ENDINGS.iter().find_map(|ending| {
            let stop = i + ending.len();
            (stop <= chars.len() && chars[i..stop] == **ending).then_some(stop)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> ExtractedText {
        ExtractedText::new("doc", s.to_string(), Vec::new())
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        let chunks = chunk_with(&ChunkingConfig::default(), &text(""), Arc::default()).expect("chunk");
        assert!(chunks.is_empty());
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = chunk_with(&ChunkingConfig::default(), &text("짧은 문서입니다."), Arc::default()).expect("chunk");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_id, "doc_0");
        assert_eq!(chunks[0].char_offset_end, 9);
    }

    #[test]
    fn backward_boundary_snaps_window_end() {
        // 580 letters, a sentence end, then more text.
        let s = format!("{}. {}", "a".repeat(578), "b".repeat(400));
        let config = ChunkingConfig::new(600, 100, 100);
        let chunks = chunk_with(&config, &text(&s), Arc::default()).expect("chunk");
        assert_eq!(chunks[0].char_offset_end, 580);
        assert!(chunks[0].text.ends_with(". "));
    }

    #[test]
    fn forward_boundary_snaps_next_start() {
        let s = format!("{}. {}", "a".repeat(520), "b".repeat(300));
        let config = ChunkingConfig::new(600, 100, 100);
        let chunks = chunk_with(&config, &text(&s), Arc::default()).expect("chunk");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].char_offset_start, 522);
        assert!(chunks[1].text.starts_with('b'));
    }

    #[test]
    fn boundary_search_respects_floor() {
        let chars: Vec<char> = "ab. cd".chars().collect();
        assert_eq!(boundary_before(&chars, 6, 0), Some(4));
        assert_eq!(boundary_before(&chars, 6, 4), None);
        assert_eq!(boundary_after(&chars, 0), Some(4));
    }

    #[test]
    fn multibyte_offsets_are_characters() {
        let s = "가".repeat(1500);
        let config = ChunkingConfig::new(1000, 200, 100);
        let chunks = chunk_with(&config, &text(&s), Arc::default()).expect("chunk");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].char_offset_end, 1000);
        assert_eq!(chunks[0].text.chars().count(), 1000);
        assert_eq!(chunks[1].char_offset_start, 800);
        assert_eq!(chunks[1].char_offset_end, 1500);
    }
}
