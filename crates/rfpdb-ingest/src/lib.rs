//! rfpdb-ingest
//!
//! Turns source documents into chunk records: compound-file and paginated
//! text extraction, normalization, source discovery and the batch pipeline.

pub mod container;
pub mod extract;
pub mod hwp;
pub mod metadata;
pub mod normalize;
pub mod paginated;
pub mod pipeline;

pub use extract::{extract, extract_or_empty};
pub use hwp::CompoundDocumentExtractor;
pub use pipeline::{BatchReport, DocumentOutcome, IngestPipeline, PendingDocument};
