//! The search corpus: every document's chunks and metadata, loaded once by a
//! single writer and then shared read-only with query handlers.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::error::{Error, Result};
use crate::traits::ChunkStore;
use crate::types::{Chunk, DocumentFormat, DocumentMetadata, DocumentRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorpusState {
    Loading,
    Ready,
}

#[derive(Debug, Clone)]
pub struct CorpusDocument {
    pub doc_id: String,
    pub format: DocumentFormat,
    pub metadata: Arc<DocumentMetadata>,
    pub chunks: Vec<Chunk>,
}

#[derive(Debug)]
pub struct Corpus {
    state: CorpusState,
    documents: Vec<CorpusDocument>,
    by_doc: HashMap<String, usize>,
    by_chunk: HashMap<String, (usize, usize)>,
}

impl Default for Corpus {
    fn default() -> Self {
        Self::new()
    }
}

impl Corpus {
    pub fn new() -> Self {
        Self { state: CorpusState::Loading, documents: Vec::new(), by_doc: HashMap::new(), by_chunk: HashMap::new() }
    }

    /// Load every record from `store` and mark the corpus ready.
    pub fn from_store(store: &dyn ChunkStore) -> Result<Self> {
        let mut corpus = Self::new();
        for record in store.list()? {
            corpus.insert(record)?;
        }
        corpus.mark_ready();
        info!(documents = corpus.documents.len(), chunks = corpus.chunk_count(), "corpus ready");
        Ok(corpus)
    }

    /// Build a ready corpus from in-memory records.
    pub fn from_records(records: impl IntoIterator<Item = DocumentRecord>) -> Result<Self> {
        let mut corpus = Self::new();
        for record in records {
            corpus.insert(record)?;
        }
        corpus.mark_ready();
        Ok(corpus)
    }

    pub fn state(&self) -> CorpusState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == CorpusState::Ready
    }

    pub fn mark_ready(&mut self) {
        self.state = CorpusState::Ready;
    }

    pub fn ensure_ready(&self) -> Result<()> {
        if self.is_ready() { Ok(()) } else { Err(Error::NotReady) }
    }

    /// Add one document. Rejected once the corpus is ready, and whenever the
    /// record breaks a chunk invariant: chunks must belong to the record,
    /// carry a dense 0-based index and have non-decreasing offsets.
    pub fn insert(&mut self, mut record: DocumentRecord) -> Result<()> {
        if self.is_ready() {
            return Err(Error::InvalidRecord(format!("corpus is sealed; cannot add {}", record.doc_id)));
        }
        if self.by_doc.contains_key(&record.doc_id) {
            return Err(Error::InvalidRecord(format!("duplicate document {}", record.doc_id)));
        }
        validate_chunks(&record)?;

        let metadata = record.attach_metadata();
        let doc_pos = self.documents.len();
        for (chunk_pos, chunk) in record.chunks.iter().enumerate() {
            self.by_chunk.insert(chunk.chunk_id.clone(), (doc_pos, chunk_pos));
        }
        self.by_doc.insert(record.doc_id.clone(), doc_pos);
        self.documents.push(CorpusDocument {
            doc_id: record.doc_id,
            format: record.format,
            metadata,
            chunks: record.chunks,
        });
        Ok(())
    }

    pub fn documents(&self) -> &[CorpusDocument] {
        &self.documents
    }

    pub fn document(&self, doc_id: &str) -> Option<&CorpusDocument> {
        self.by_doc.get(doc_id).map(|&i| &self.documents[i])
    }

    pub fn chunk(&self, chunk_id: &str) -> Option<&Chunk> {
        self.by_chunk
            .get(chunk_id)
            .map(|&(d, c)| &self.documents[d].chunks[c])
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.documents.iter().flat_map(|d| d.chunks.iter())
    }

    pub fn chunk_count(&self) -> usize {
        self.by_chunk.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_chunk.is_empty()
    }

    /// `(chunk_id, text)` pairs for building index collaborators.
    pub fn index_pairs(&self) -> Vec<(String, String)> {
        self.chunks().map(|c| (c.chunk_id.clone(), c.text.clone())).collect()
    }
}

fn validate_chunks(record: &DocumentRecord) -> Result<()> {
    let mut prev_start = 0usize;
    for (expected, chunk) in record.chunks.iter().enumerate() {
        if chunk.doc_id != record.doc_id {
            return Err(Error::InvalidRecord(format!(
                "chunk {} belongs to {}, not {}",
                chunk.chunk_id, chunk.doc_id, record.doc_id
            )));
        }
        if chunk.chunk_index != expected {
            return Err(Error::InvalidRecord(format!(
                "{}: chunk index {} found where {} expected",
                record.doc_id, chunk.chunk_index, expected
            )));
        }
        if chunk.char_offset_end < chunk.char_offset_start || chunk.char_offset_start < prev_start {
            return Err(Error::InvalidRecord(format!("{}: offsets out of order", chunk.chunk_id)));
        }
        prev_start = chunk.char_offset_start;
    }
    Ok(())
}
