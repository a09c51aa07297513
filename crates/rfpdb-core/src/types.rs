//! Domain types shared by the extractor, chunker, indexes and rankers.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

pub type ChunkId = String;

/// Declared on-disk format of a source document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentFormat {
    /// Compound-file container with record-structured body sections (`.hwp`).
    CompoundBinary,
    /// Page-based documents (`.pdf`).
    Paginated,
    PlainText,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "hwp" => Some(Self::CompoundBinary),
            "pdf" => Some(Self::Paginated),
            "txt" | "md" => Some(Self::PlainText),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CompoundBinary => "compound-binary",
            Self::Paginated => "paginated",
            Self::PlainText => "plain-text",
        }
    }
}

/// Source bytes plus declared format. Never mutated after loading.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub doc_id: String,
    pub format: DocumentFormat,
    pub bytes: Vec<u8>,
}

impl RawDocument {
    pub fn new(doc_id: impl Into<String>, format: DocumentFormat, bytes: Vec<u8>) -> Self {
        Self { doc_id: doc_id.into(), format, bytes }
    }
}

/// Normalized text produced from one [`RawDocument`].
///
/// `failure` is only set when extraction degraded to empty text; `warnings`
/// carries non-fatal observations such as a truncated record stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedText {
    pub doc_id: String,
    pub text: String,
    pub warnings: Vec<String>,
    pub failure: Option<String>,
}

impl ExtractedText {
    pub fn new(doc_id: impl Into<String>, text: String, warnings: Vec<String>) -> Self {
        Self { doc_id: doc_id.into(), text, warnings, failure: None }
    }

    pub fn failed(doc_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { doc_id: doc_id.into(), text: String::new(), warnings: Vec::new(), failure: Some(reason.into()) }
    }

    /// Length in characters; chunk offsets are measured in the same unit.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }
}

/// Document-level metadata attached to every chunk of a document.
///
/// Fields are optional; `None` means the value is unknown. The Korean column
/// names used by the procurement metadata sheets are accepted as aliases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(default, alias = "파일명")]
    pub file_name: Option<String>,
    #[serde(default, alias = "사업명")]
    pub business_name: Option<String>,
    #[serde(default, alias = "발주 기관")]
    pub organization: Option<String>,
    #[serde(default, alias = "사업 금액")]
    pub budget: Option<String>,
    #[serde(default, alias = "공개 일자")]
    pub published_at: Option<String>,
    #[serde(default, alias = "입찰 참여 시작일")]
    pub bid_start: Option<String>,
    #[serde(default, alias = "입찰 참여 마감일")]
    pub bid_deadline: Option<String>,
    #[serde(default, alias = "공고 번호")]
    pub announcement_id: Option<String>,
    #[serde(default, alias = "사업 요약")]
    pub summary: Option<String>,
}

impl DocumentMetadata {
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn with_business_name(mut self, name: impl Into<String>) -> Self {
        self.business_name = Some(name.into());
        self
    }

    pub fn with_organization(mut self, org: impl Into<String>) -> Self {
        self.organization = Some(org.into());
        self
    }

    /// Lowercased field value, empty when absent.
    pub fn lowered(field: &Option<String>) -> String {
        field.as_deref().map(str::to_lowercase).unwrap_or_default()
    }
}

/// A chunk of a source document that is independently indexed.
///
/// - `chunk_id`: `"{doc_id}_{chunk_index}"`, stable across re-runs
/// - `char_offset_start`/`char_offset_end`: half-open character range into the
///   owning [`ExtractedText`]
/// - `metadata`: shared with every other chunk of the document; not
///   serialized with the chunk, see [`DocumentRecord::attach_metadata`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: ChunkId,
    pub doc_id: String,
    pub chunk_index: usize,
    pub text: String,
    pub char_offset_start: usize,
    pub char_offset_end: usize,
    #[serde(skip)]
    pub metadata: Arc<DocumentMetadata>,
}

impl Chunk {
    pub fn make_id(doc_id: &str, chunk_index: usize) -> ChunkId {
        format!("{}_{}", doc_id, chunk_index)
    }

    pub fn char_len(&self) -> usize {
        self.char_offset_end - self.char_offset_start
    }
}

/// Indicates which engine produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Vector,
    Text,
}

/// The minimal surface returned by all index collaborators.
///
/// `id` matches `Chunk::chunk_id`. `score` is engine-specific but higher is
/// always better. `source` labels the origin engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: ChunkId,
    pub score: f32,
    pub source: SourceKind,
}

/// Clamp a score into `[0, 1]`. NaN maps to 0.
pub fn clamp_score(score: f32) -> f32 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// A chunk ranked for one query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    score: f32,
    /// Where an extra boost came from: the metadata pre-score contribution or
    /// the reranker's raw score. Not bounded.
    pub relevance_boost: Option<f32>,
}

impl ScoredChunk {
    pub fn new(chunk: Chunk, score: f32) -> Self {
        Self { chunk, score: clamp_score(score), relevance_boost: None }
    }

    pub fn score(&self) -> f32 {
        self.score
    }

    pub fn set_score(&mut self, score: f32) {
        self.score = clamp_score(score);
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.relevance_boost = Some(boost);
        self
    }
}

/// The unit of persistence: one document's metadata and chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub doc_id: String,
    pub format: DocumentFormat,
    pub metadata: DocumentMetadata,
    pub chunks: Vec<Chunk>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl DocumentRecord {
    /// Point every chunk at one shared copy of the document metadata.
    pub fn attach_metadata(&mut self) -> Arc<DocumentMetadata> {
        let shared = Arc::new(self.metadata.clone());
        for chunk in &mut self.chunks {
            chunk.metadata = Arc::clone(&shared);
        }
        shared
    }
}
