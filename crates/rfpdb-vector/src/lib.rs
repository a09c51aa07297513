//! rfpdb-vector
//!
//! In-memory semantic index: chunk vectors from an [`Embedder`], searched by
//! brute-force cosine similarity.

use std::sync::Arc;

use rfpdb_core::error::{Error, Result};
use rfpdb_core::traits::{Embedder, SemanticIndex};
use rfpdb_core::types::{SearchHit, SourceKind};
use rfpdb_embed::cosine;
use tracing::info;

pub const EMBED_BATCH: usize = 64;

pub struct VectorIndex {
	embedder: Arc<dyn Embedder>,
	ids: Vec<String>,
	vectors: Vec<Vec<f32>>,
}

impl VectorIndex {
	pub fn build(embedder: Arc<dyn Embedder>, pairs: &[(String, String)]) -> Result<Self> {
		let mut ids = Vec::with_capacity(pairs.len());
		let mut vectors = Vec::with_capacity(pairs.len());
		for batch in pairs.chunks(EMBED_BATCH) {
			let texts: Vec<String> = batch.iter().map(|(_, text)| text.clone()).collect();
			let embs = embedder.embed_batch(&texts)?;
			if embs.len() != batch.len() {
				return Err(Error::IndexUnavailable(format!("embedder returned {} vectors for {} texts", embs.len(), batch.len())));
			}
			for ((id, _), v) in batch.iter().zip(embs) {
				if v.len() != embedder.dim() {
					return Err(Error::IndexUnavailable(format!("vector for {} has dim {}, expected {}", id, v.len(), embedder.dim())));
				}
				ids.push(id.clone());
				vectors.push(v);
			}
		}
		info!(vectors = ids.len(), dim = embedder.dim(), "semantic index built");
		Ok(Self { embedder, ids, vectors })
	}

	pub fn len(&self) -> usize { self.ids.len() }

	pub fn is_empty(&self) -> bool { self.ids.is_empty() }

	pub fn search_vec(&self, q_vec: &[f32], k: usize) -> Vec<SearchHit> {
		let mut scored: Vec<(usize, f32)> = self.vectors.iter().enumerate().map(|(i, v)| (i, cosine(q_vec, v).max(0.0))).collect();
		scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
		scored.truncate(k);
		scored.into_iter().map(|(i, score)| SearchHit { id: self.ids[i].clone(), score, source: SourceKind::Vector }).collect()
	}
}

impl SemanticIndex for VectorIndex {
	fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
		if k == 0 || self.is_empty() {
			return Ok(Vec::new());
		}
		let q_vec = self.embedder.embed_batch(&[query.to_string()])?.into_iter().next()
			.ok_or_else(|| Error::IndexUnavailable("embedder returned no vector for query".into()))?;
		Ok(self.search_vec(&q_vec, k))
	}
}
