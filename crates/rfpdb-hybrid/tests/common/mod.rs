#![allow(dead_code)]

use std::sync::Arc;

use rfpdb_core::types::{Chunk, DocumentFormat, DocumentMetadata, DocumentRecord};
use rfpdb_core::Corpus;

/// A record whose chunks are `texts`, laid end to end.
pub fn record(doc_id: &str, meta: DocumentMetadata, texts: &[&str]) -> DocumentRecord {
    let mut offset = 0;
    let chunks = texts
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let len = t.chars().count();
            let chunk = Chunk {
                chunk_id: Chunk::make_id(doc_id, i),
                doc_id: doc_id.to_string(),
                chunk_index: i,
                text: t.to_string(),
                char_offset_start: offset,
                char_offset_end: offset + len,
                metadata: Arc::default(),
            };
            offset += len;
            chunk
        })
        .collect();
    DocumentRecord { doc_id: doc_id.to_string(), format: DocumentFormat::CompoundBinary, metadata: meta, chunks, warnings: Vec::new() }
}

pub fn named(file_name: &str) -> DocumentMetadata {
    DocumentMetadata::default().with_file_name(file_name)
}

pub fn corpus(records: Vec<DocumentRecord>) -> Arc<Corpus> {
    Arc::new(Corpus::from_records(records).expect("corpus"))
}
