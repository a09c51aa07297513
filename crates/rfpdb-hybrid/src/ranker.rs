//! Lexical + semantic fusion.
//!
//! Each source is asked for `k` hits, its scores are normalized into `[0, 1]`
//! and the two lists are blended by weight. A source that is missing, fails
//! or times out is dropped and the other carries full weight. An optional
//! reranker may then reorder the blended candidates.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use rfpdb_core::config::{Normalization, RetrievalSettings};
use rfpdb_core::error::{Error, Result};
use rfpdb_core::traits::{LexicalIndex, Reranker, SemanticIndex};
use rfpdb_core::types::{ScoredChunk, SearchHit};
use rfpdb_core::Corpus;
use tracing::{debug, warn};

use crate::rerank::apply_rerank;

/// Reciprocal-rank constant.
pub const RRF_K: f32 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankOptions {
    pub lexical_weight: f32,
    pub semantic_weight: f32,
    pub normalization: Normalization,
    pub rerank: bool,
    pub timeout: Duration,
}

impl Default for RankOptions {
    fn default() -> Self {
        Self::from(&RetrievalSettings::default())
    }
}

impl From<&RetrievalSettings> for RankOptions {
    fn from(s: &RetrievalSettings) -> Self {
        Self {
            lexical_weight: s.lexical_weight,
            semantic_weight: s.semantic_weight,
            normalization: s.normalization,
            rerank: s.rerank,
            timeout: Duration::from_millis(s.collaborator_timeout_ms),
        }
    }
}

/// Bring one hit list into `[0, 1]`. Hits keep their list order.
pub fn normalize_scores(hits: &[SearchHit], mode: Normalization) -> Vec<f32> {
    match mode {
        Normalization::Score => {
            let max = hits.iter().map(|h| h.score).fold(0.0f32, f32::max);
            hits.iter()
                .map(|h| if max > 0.0 && h.score > 0.0 { (h.score / max).min(1.0) } else { 0.0 })
                .collect()
        }
        Normalization::Rank => (0..hits.len()).map(|rank| (RRF_K + 1.0) / (RRF_K + rank as f32 + 1.0)).collect(),
    }
}

#[derive(Debug, Default)]
struct Fused {
    score: f32,
    semantic_rank: Option<usize>,
    lexical_rank: Option<usize>,
}

pub struct HybridRanker {
    corpus: Arc<Corpus>,
    lexical: Option<Arc<dyn LexicalIndex>>,
    semantic: Option<Arc<dyn SemanticIndex>>,
    reranker: Option<Arc<dyn Reranker>>,
    options: RankOptions,
}

impl HybridRanker {
    pub fn new(corpus: Arc<Corpus>, options: RankOptions) -> Self {
        Self { corpus, lexical: None, semantic: None, reranker: None, options }
    }

    pub fn with_lexical_index(mut self, index: Arc<dyn LexicalIndex>) -> Self {
        self.lexical = Some(index);
        self
    }

    /// Accept the outcome of building the lexical index. A failed build is
    /// logged once here and the ranker runs semantic-only.
    pub fn with_lexical(self, built: Result<Arc<dyn LexicalIndex>>) -> Self {
        match built {
            Ok(index) => self.with_lexical_index(index),
            Err(e) => {
                warn!(error = %e, "lexical index unavailable, ranking semantic-only");
                self
            }
        }
    }

    pub fn with_semantic(mut self, index: Arc<dyn SemanticIndex>) -> Self {
        self.semantic = Some(index);
        self
    }

    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    pub fn options(&self) -> &RankOptions {
        &self.options
    }

    pub async fn rank(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        self.rank_with_timeout(query, k, self.options.timeout).await
    }

    pub async fn rank_with_timeout(&self, query: &str, k: usize, timeout: Duration) -> Result<Vec<ScoredChunk>> {
        self.corpus.ensure_ready()?;
        if k == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let lexical = self.lexical_hits(query, k);
        let semantic = self.semantic_hits(query, k, timeout).await;
        let mut candidates = self.fuse(lexical, semantic);

        if self.options.rerank && candidates.len() > 1 {
            if let Some(reranker) = &self.reranker {
                let passages: Vec<String> = candidates.iter().map(|c| c.chunk.text.clone()).collect();
                match call_blocking(Arc::clone(reranker), query, timeout, move |r, q| r.rerank(&q, &passages)).await {
                    Ok(scores) => candidates = apply_rerank(candidates, &scores),
                    Err(e) => warn!(error = %e, "reranker failed, keeping fused order"),
                }
            }
        }

        candidates.truncate(k);
        Ok(candidates)
    }

    fn lexical_hits(&self, query: &str, k: usize) -> Option<Vec<SearchHit>> {
        let index = self.lexical.as_ref()?;
        match index.search(query, k) {
            Ok(hits) => Some(hits),
            Err(e) => {
                warn!(error = %e, "lexical search failed");
                None
            }
        }
    }

    async fn semantic_hits(&self, query: &str, k: usize, timeout: Duration) -> Option<Vec<SearchHit>> {
        let index = Arc::clone(self.semantic.as_ref()?);
        match call_blocking(index, query, timeout, move |s, q| s.search(&q, k)).await {
            Ok(hits) => Some(hits),
            Err(e) => {
                warn!(error = %e, "semantic search unavailable, ranking lexical-only");
                None
            }
        }
    }

    /// Blend the available lists into candidates ordered by score, then
    /// semantic rank, lexical rank and chunk id. Hits the corpus does not
    /// know are dropped.
    fn fuse(&self, lexical: Option<Vec<SearchHit>>, semantic: Option<Vec<SearchHit>>) -> Vec<ScoredChunk> {
        let (w_lex, w_sem) = match (&lexical, &semantic) {
            (Some(_), Some(_)) => (self.options.lexical_weight, self.options.semantic_weight),
            (Some(_), None) => (1.0, 0.0),
            (None, Some(_)) => (0.0, 1.0),
            (None, None) => return Vec::new(),
        };

        let mut fused: HashMap<String, Fused> = HashMap::new();
        if let Some(hits) = semantic.as_deref() {
            self.accumulate(&mut fused, hits, w_sem, |f, rank| f.semantic_rank = Some(rank));
        }
        if let Some(hits) = lexical.as_deref() {
            self.accumulate(&mut fused, hits, w_lex, |f, rank| f.lexical_rank = Some(rank));
        }

        let mut ordered: Vec<(String, Fused)> = fused.into_iter().collect();
        ordered.sort_by(|(a_id, a), (b_id, b)| {
            b.score
                .total_cmp(&a.score)
                .then(a.semantic_rank.unwrap_or(usize::MAX).cmp(&b.semantic_rank.unwrap_or(usize::MAX)))
                .then(a.lexical_rank.unwrap_or(usize::MAX).cmp(&b.lexical_rank.unwrap_or(usize::MAX)))
                .then(a_id.cmp(b_id))
        });
        debug!(candidates = ordered.len(), w_lex, w_sem, "fused hit lists");

        ordered
            .into_iter()
            .filter_map(|(id, f)| self.corpus.chunk(&id).map(|c| ScoredChunk::new(c.clone(), f.score.min(1.0))))
            .collect()
    }

    fn accumulate(&self, fused: &mut HashMap<String, Fused>, hits: &[SearchHit], weight: f32, mark: impl Fn(&mut Fused, usize)) {
        let normalized = normalize_scores(hits, self.options.normalization);
        let mut seen = HashSet::new();
        for (rank, (hit, norm)) in hits.iter().zip(normalized).enumerate() {
            // a repeated id within one list counts once
            if !seen.insert(hit.id.as_str()) {
                continue;
            }
            if self.corpus.chunk(&hit.id).is_none() {
                debug!(id = %hit.id, "dropping hit unknown to corpus");
                continue;
            }
            let entry = fused.entry(hit.id.clone()).or_default();
            entry.score = (entry.score + weight * norm).min(1.0);
            mark(entry, rank);
        }
    }
}

/// Run a blocking collaborator call off the executor, bounded by `timeout`.
async fn call_blocking<C, T, F>(collaborator: Arc<C>, query: &str, timeout: Duration, f: F) -> Result<T>
where
    C: ?Sized + Send + Sync + 'static,
    T: Send + 'static,
    F: FnOnce(&C, String) -> Result<T> + Send + 'static,
{
    let query = query.to_string();
    let task = tokio::task::spawn_blocking(move || f(collaborator.as_ref(), query));
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join)) => Err(Error::IndexUnavailable(format!("collaborator task failed: {}", join))),
        Err(_) => Err(Error::IndexUnavailable(format!("collaborator timed out after {:?}", timeout))),
    }
}
