use std::collections::HashSet;

use rfpdb_core::error::Result;
use rfpdb_core::traits::{RerankScore, Reranker};
use rfpdb_core::types::ScoredChunk;

/// Scores passages by the share of distinct query terms they contain, with
/// a small bonus for terms that appear as whole words.
#[derive(Debug, Clone, Copy, Default)]
pub struct TermOverlapReranker;

impl Reranker for TermOverlapReranker {
    fn rerank(&self, query: &str, passages: &[String]) -> Result<Vec<RerankScore>> {
        let query = query.to_lowercase();
        let mut seen = HashSet::new();
        let terms: Vec<&str> = query.split_whitespace().filter(|t| seen.insert(*t)).collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        let mut scores: Vec<RerankScore> = passages
            .iter()
            .enumerate()
            .map(|(index, passage)| {
                let lower = passage.to_lowercase();
                let words: HashSet<&str> = lower.split_whitespace().collect();
                let contained = terms.iter().filter(|t| lower.contains(*t)).count();
                let whole = terms.iter().filter(|t| words.contains(*t)).count();
                let score = (contained as f32 + 0.5 * whole as f32) / terms.len() as f32;
                RerankScore { index, score }
            })
            .collect();
        scores.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.index.cmp(&b.index)));
        Ok(scores)
    }
}

/// Reorder `candidates` by a reranker's answer. Each reranked candidate gets
/// the raw score as `relevance_boost`; its blended `score` is left alone.
/// Out-of-range or repeated indexes are ignored and candidates the reranker
/// did not return keep their relative order at the end.
pub fn apply_rerank(candidates: Vec<ScoredChunk>, scores: &[RerankScore]) -> Vec<ScoredChunk> {
    let mut slots: Vec<Option<ScoredChunk>> = candidates.into_iter().map(Some).collect();
    let mut out = Vec::with_capacity(slots.len());
    for rs in scores {
        if let Some(candidate) = slots.get_mut(rs.index).and_then(Option::take) {
            out.push(candidate.with_boost(rs.score));
        }
    }
    out.extend(slots.into_iter().flatten());
    out
}
