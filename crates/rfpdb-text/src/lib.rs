//! rfpdb-text
//!
//! Tantivy-backed lexical index over `(chunk_id, text)` pairs.
pub mod index;
pub mod tantivy_utils;

pub use index::TantivyLexicalIndex;
