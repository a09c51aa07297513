//! Batch ingest: extraction and chunking per document on a bounded pool.

use std::sync::Arc;

use rayon::prelude::*;
use rfpdb_core::config::{ChunkingSettings, Settings};
use rfpdb_core::error::{Error, Result};
use rfpdb_core::types::{DocumentMetadata, DocumentRecord, RawDocument};
use rfpdb_core::AdaptiveChunker;
use tracing::{debug, info, warn};

use crate::extract::extract;

#[derive(Debug, Clone)]
pub struct PendingDocument {
    pub raw: RawDocument,
    pub metadata: DocumentMetadata,
}

impl PendingDocument {
    pub fn new(raw: RawDocument, metadata: DocumentMetadata) -> Self {
        Self { raw, metadata }
    }
}

#[derive(Debug)]
pub struct DocumentOutcome {
    pub doc_id: String,
    pub result: Result<DocumentRecord>,
}

/// Per-document outcomes in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<DocumentOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// The first unrecoverable error, if any document hit one.
    pub fn fatal(&self) -> Option<&Error> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err())
            .find(|e| !e.is_recoverable())
    }

    pub fn records(&self) -> impl Iterator<Item = &DocumentRecord> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn into_records(self) -> Vec<DocumentRecord> {
        self.outcomes.into_iter().filter_map(|o| o.result.ok()).collect()
    }
}

pub struct IngestPipeline {
    chunker: AdaptiveChunker,
    workers: usize,
}

impl IngestPipeline {
    pub fn new(chunking: ChunkingSettings, workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(Error::InvalidConfig("ingest.workers must be at least 1".into()));
        }
        Ok(Self { chunker: AdaptiveChunker::new(chunking)?, workers })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(settings.chunking.clone(), settings.ingest.workers)
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Extract and chunk one document.
    pub fn process(&self, doc: &PendingDocument) -> Result<DocumentRecord> {
        let text = extract(&doc.raw)?;
        let metadata = Arc::new(doc.metadata.clone());
        let chunks = self.chunker.chunk(&text, doc.raw.format, metadata)?;
        debug!(doc_id = %doc.raw.doc_id, chars = text.char_len(), chunks = chunks.len(), "processed document");
        Ok(DocumentRecord {
            doc_id: doc.raw.doc_id.clone(),
            format: doc.raw.format,
            metadata: doc.metadata.clone(),
            chunks,
            warnings: text.warnings,
        })
    }

    pub fn run(&self, docs: Vec<PendingDocument>) -> Result<BatchReport> {
        self.run_with_progress(docs, |_| {})
    }

    /// Process every document on a pool of `workers` threads. One document's
    /// failure never affects another; `on_done` is called as each finishes.
    pub fn run_with_progress<F>(&self, docs: Vec<PendingDocument>, on_done: F) -> Result<BatchReport>
    where
        F: Fn(&DocumentOutcome) + Send + Sync,
    {
        let total = docs.len();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("cannot start ingest pool: {}", e)))?;

        let outcomes: Vec<DocumentOutcome> = pool.install(|| {
            docs.into_par_iter()
                .map(|doc| {
                    let result = self.process(&doc);
                    if let Err(e) = &result {
                        warn!(doc_id = %doc.raw.doc_id, error = %e, "document failed");
                    }
                    let outcome = DocumentOutcome { doc_id: doc.raw.doc_id, result };
                    on_done(&outcome);
                    outcome
                })
                .collect()
        });

        let report = BatchReport { outcomes };
        info!(total, succeeded = report.succeeded(), failed = report.failed(), workers = self.workers, "ingest batch finished");
        Ok(report)
    }
}
