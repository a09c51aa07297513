//! rfpdb-hybrid
//!
//! Query-time ranking: lexical/semantic fusion with optional reranking, and
//! the metadata-boosted cross-document search with keyword fallback.

pub mod boosted;
pub mod fuzzy;
pub mod ranker;
pub mod rerank;

pub use boosted::{MetadataBoostedSearch, SearchOptions};
pub use ranker::{HybridRanker, RankOptions};
pub use rerank::TermOverlapReranker;
