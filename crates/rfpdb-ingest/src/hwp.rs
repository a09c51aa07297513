//! Compound-binary (`.hwp`) body text extraction.
//!
//! A document is a compound file whose `FileHeader` stream carries a
//! signature and property flags, and whose `BodyText/Section<N>` streams hold
//! (optionally raw-deflated) record streams. Paragraph text lives in records
//! tagged [`TAG_PARA_TEXT`] as UTF-16LE with inline control sequences.

use std::io::Read;

use flate2::read::DeflateDecoder;
use rfpdb_core::error::{Error, Result};
use rfpdb_core::types::ExtractedText;
use tracing::{debug, warn};

use crate::container::{CfbContainer, ContainerReader};
use crate::normalize::normalize_text;

pub const FILE_HEADER_STREAM: &str = "FileHeader";
pub const BODY_TEXT_STORAGE: &str = "BodyText";
pub const SIGNATURE: &[u8] = b"HWP Document File";
pub const TAG_PARA_TEXT: u16 = 67;

const PROPERTIES_OFFSET: usize = 36;
const FLAG_COMPRESSED: u32 = 0x1;
const FLAG_ENCRYPTED: u32 = 0x2;
const EXTENDED_SIZE: u32 = 0xFFF;

/// Flags read from the `FileHeader` stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub compressed: bool,
    pub encrypted: bool,
}

impl FileHeader {
    pub fn parse(data: &[u8]) -> Result<Self> {
        if !data.starts_with(SIGNATURE) {
            return Err(Error::Format("missing compound document signature".into()));
        }
        let word = data
            .get(PROPERTIES_OFFSET..PROPERTIES_OFFSET + 4)
            .ok_or_else(|| Error::Format(format!("file header too short ({} bytes)", data.len())))?;
        let props = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
        Ok(Self { compressed: props & FLAG_COMPRESSED != 0, encrypted: props & FLAG_ENCRYPTED != 0 })
    }
}

/// One record of a section stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record<'a> {
    pub tag: u16,
    pub level: u16,
    pub payload: &'a [u8],
}

/// Walks the records of a decompressed section.
///
/// Every successful step advances the cursor by at least the 4-byte header.
/// A header or payload that runs past the end of the buffer stops the walk;
/// [`RecordIter::truncated_at`] then reports the offset of that record.
#[derive(Debug)]
pub struct RecordIter<'a> {
    data: &'a [u8],
    pos: usize,
    truncated_at: Option<usize>,
}

impl<'a> RecordIter<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0, truncated_at: None }
    }

    pub fn truncated_at(&self) -> Option<usize> {
        self.truncated_at
    }

    fn read_u32(&self, at: usize) -> Option<u32> {
        let b = self.data.get(at..at.checked_add(4)?)?;
        Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}

impl<'a> Iterator for RecordIter<'a> {
    type Item = Record<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.truncated_at.is_some() || self.pos >= self.data.len() {
            return None;
        }
        let start = self.pos;
        let Some(header) = self.read_u32(start) else {
            self.truncated_at = Some(start);
            return None;
        };
        let tag = (header & 0x3ff) as u16;
        let level = ((header >> 10) & 0x3ff) as u16;
        let mut size = header >> 20;
        let mut body = start + 4;
        if size == EXTENDED_SIZE {
            let Some(extended) = self.read_u32(body) else {
                self.truncated_at = Some(start);
                return None;
            };
            size = extended;
            body += 4;
        }
        let end = body.checked_add(size as usize).filter(|end| *end <= self.data.len());
        let Some(end) = end else {
            self.truncated_at = Some(start);
            return None;
        };
        self.pos = end;
        Some(Record { tag, level, payload: &self.data[body..end] })
    }
}

/// Width in code units of a control character, and what it renders as.
fn control(unit: u16) -> Option<(usize, Option<char>)> {
    match unit {
        // char controls
        0 | 13 | 25..=29 => Some((1, None)),
        10 => Some((1, Some('\n'))),
        24 => Some((1, Some('-'))),
        30 | 31 => Some((1, Some(' '))),
        // inline and extended controls carry a 7-unit parameter block
        9 => Some((8, Some('\t'))),
        1..=8 | 11 | 12 | 14..=23 => Some((8, None)),
        _ => None,
    }
}

/// Decode a paragraph-text payload. Control sequences are collapsed to their
/// rendered character or dropped; unpaired surrogates are dropped.
pub fn decode_para_text(payload: &[u8]) -> String {
    let units: Vec<u16> = payload.chunks_exact(2).map(|b| u16::from_le_bytes([b[0], b[1]])).collect();
    let mut plain: Vec<u16> = Vec::with_capacity(units.len());
    let mut i = 0;
    while i < units.len() {
        match control(units[i]) {
            Some((width, rendered)) => {
                if let Some(c) = rendered {
                    plain.push(c as u16);
                }
                i += width;
            }
            None => {
                plain.push(units[i]);
                i += 1;
            }
        }
    }
    char::decode_utf16(plain).filter_map(|c| c.ok()).collect()
}

/// `Section<N>` streams under `BodyText`, ordered by `N` numerically.
/// Returns the ordered paths plus warnings for names that do not parse.
pub fn body_sections(names: &[String]) -> (Vec<String>, Vec<String>) {
    let prefix = format!("{}/", BODY_TEXT_STORAGE);
    let mut sections = Vec::new();
    let mut warnings = Vec::new();
    for name in names {
        let Some(leaf) = name.strip_prefix(&prefix) else { continue };
        match leaf.strip_prefix("Section").and_then(|n| n.parse::<u32>().ok()) {
            Some(n) => sections.push((n, name.clone())),
            None => warnings.push(format!("skipped unrecognized body stream {}", name)),
        }
    }
    sections.sort_by_key(|(n, _)| *n);
    (sections.into_iter().map(|(_, name)| name).collect(), warnings)
}

/// Raw deflate (no zlib wrapper).
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() * 4);
    DeflateDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| Error::Decompression(e.to_string()))?;
    Ok(out)
}

/// Append the paragraph text of one decompressed section to `out`.
/// Returns a warning when the record stream was cut short.
fn walk_section(section: &str, data: &[u8], out: &mut String) -> Option<String> {
    let mut records = RecordIter::new(data);
    let mut paragraphs = 0usize;
    for record in records.by_ref() {
        if record.tag == TAG_PARA_TEXT {
            out.push_str(&decode_para_text(record.payload));
            out.push('\n');
            paragraphs += 1;
        }
    }
    debug!(section, paragraphs, bytes = data.len(), "walked section");
    records
        .truncated_at()
        .map(|offset| format!("{}: truncated record at offset {}", section, offset))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CompoundDocumentExtractor;

impl CompoundDocumentExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract_bytes(&self, doc_id: &str, bytes: &[u8]) -> Result<ExtractedText> {
        let mut container = CfbContainer::from_bytes(bytes)?;
        self.extract_from(doc_id, &mut container)
    }

    pub fn extract_from<C: ContainerReader>(&self, doc_id: &str, container: &mut C) -> Result<ExtractedText> {
        let header = FileHeader::parse(&container.read_stream(FILE_HEADER_STREAM)?)?;
        if header.encrypted {
            return Err(Error::Format("document is password-protected".into()));
        }

        let (sections, mut warnings) = body_sections(&container.stream_names());
        if sections.is_empty() {
            warnings.push("no body sections found".into());
        }

        let mut text = String::new();
        for section in &sections {
            let raw = container.read_stream(section)?;
            let data = if header.compressed { inflate(&raw)? } else { raw };
            if let Some(warning) = walk_section(section, &data, &mut text) {
                warn!(doc_id, %warning, "record stream truncated");
                warnings.push(warning);
            }
        }

        Ok(ExtractedText::new(doc_id, normalize_text(&text), warnings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(tag: u16, payload: &[u8]) -> Vec<u8> {
        let header = u32::from(tag) | ((payload.len() as u32) << 20);
        let mut out = header.to_le_bytes().to_vec();
        out.extend_from_slice(payload);
        out
    }

    fn utf16(s: &str) -> Vec<u8> {
        s.encode_utf16().flat_map(u16::to_le_bytes).collect()
    }

    #[test]
    fn header_flags() {
        let mut data = vec![0u8; 256];
        data[..SIGNATURE.len()].copy_from_slice(SIGNATURE);
        data[36] = 0b11;
        let header = FileHeader::parse(&data).expect("header");
        assert!(header.compressed && header.encrypted);
        assert!(FileHeader::parse(b"HWP Document File").is_err());
        assert!(FileHeader::parse(&[0u8; 256]).is_err());
    }

    #[test]
    fn records_walk_and_extended_size() {
        let mut data = record(TAG_PARA_TEXT, &utf16("가나"));
        let long = vec![7u8; 5000];
        let header = 66u32 | (EXTENDED_SIZE << 20) | (1 << 10);
        data.extend_from_slice(&header.to_le_bytes());
        data.extend_from_slice(&(long.len() as u32).to_le_bytes());
        data.extend_from_slice(&long);

        let records: Vec<_> = RecordIter::new(&data).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].tag, TAG_PARA_TEXT);
        assert_eq!(records[1].tag, 66);
        assert_eq!(records[1].level, 1);
        assert_eq!(records[1].payload.len(), 5000);
    }

    #[test]
    fn truncated_payload_stops_walk() {
        let mut data = record(TAG_PARA_TEXT, &utf16("first"));
        let first_len = data.len();
        let header = u32::from(TAG_PARA_TEXT) | (100 << 20);
        data.extend_from_slice(&header.to_le_bytes());
        data.extend_from_slice(&[0u8; 10]);

        let mut iter = RecordIter::new(&data);
        assert_eq!(iter.by_ref().count(), 1);
        assert_eq!(iter.truncated_at(), Some(first_len));

        let mut partial_header = RecordIter::new(&[1u8, 2]);
        assert!(partial_header.next().is_none());
        assert_eq!(partial_header.truncated_at(), Some(0));
    }

    #[test]
    fn control_characters_are_collapsed() {
        let mut units: Vec<u16> = "제안".encode_utf16().collect();
        units.extend_from_slice(&[11, 0x6f73, 0x6267, 0, 0, 0, 0, 11]);
        units.extend("요청".encode_utf16());
        units.push(24);
        units.extend("서".encode_utf16());
        units.push(0xD800);
        units.push(13);
        let payload: Vec<u8> = units.iter().flat_map(|u| u.to_le_bytes()).collect();
        assert_eq!(decode_para_text(&payload), "제안요청-서");
    }

    #[test]
    fn sections_sorted_numerically() {
        let names: Vec<String> = ["FileHeader", "BodyText/Section10", "BodyText/Section2", "BodyText/Sectionx", "DocInfo"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let (sections, warnings) = body_sections(&names);
        assert_eq!(sections, vec!["BodyText/Section2", "BodyText/Section10"]);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn invalid_deflate_is_a_decompression_error() {
        let err = inflate(&[0xff, 0xff, 0xff, 0xff]).err().expect("error");
        assert!(matches!(err, Error::Decompression(_)));
    }
}
