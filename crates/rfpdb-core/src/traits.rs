//! Collaborator seams. The core only ever talks to indexes, rerankers and
//! stores through these traits.

use crate::error::Result;
use crate::types::{DocumentRecord, SearchHit};

pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Keyword search over `(chunk_id, text)` pairs supplied at build time.
pub trait LexicalIndex: Send + Sync {
    fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>>;
}

/// Similarity search. Implementations may block on a remote service; callers
/// run it off the async executor under a timeout.
pub trait SemanticIndex: Send + Sync {
    fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>>;
}

/// One entry of a reranker's answer: position in the submitted passage list
/// plus a score in the reranker's own (unbounded) scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RerankScore {
    pub index: usize,
    pub score: f32,
}

/// Cross-encoder style reranking. The returned order is authoritative; scores
/// are treated as ordering-only.
pub trait Reranker: Send + Sync {
    fn rerank(&self, query: &str, passages: &[String]) -> Result<Vec<RerankScore>>;
}

/// File-per-document persistence of chunk sets and their metadata.
pub trait ChunkStore: Send + Sync {
    fn put(&self, record: &DocumentRecord) -> Result<()>;
    fn get(&self, doc_id: &str) -> Result<Option<DocumentRecord>>;
    fn list(&self) -> Result<Vec<DocumentRecord>>;
}
