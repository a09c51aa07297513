//! rfpdb-core
//!
//! Domain types, error taxonomy, configuration, the adaptive chunker, the
//! search corpus and the chunk store shared by every other crate.

pub mod chunker;
pub mod config;
pub mod corpus;
pub mod error;
pub mod store;
pub mod traits;
pub mod types;

pub use chunker::AdaptiveChunker;
pub use corpus::Corpus;
pub use error::{Error, Result};
