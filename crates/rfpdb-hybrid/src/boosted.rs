//! Cross-document search biased by document metadata.
//!
//! Documents whose file name, business name or issuing organization contain
//! the query are visited first and their chunks get a small additive boost.
//! When the whole query matches nothing, each query word is searched on its
//! own and the merged results are penalized.

use std::collections::HashSet;
use std::sync::Arc;

use rfpdb_core::config::BoostSettings;
use rfpdb_core::corpus::CorpusDocument;
use rfpdb_core::error::Result;
use rfpdb_core::types::{clamp_score, DocumentMetadata, ScoredChunk};
use rfpdb_core::Corpus;
use tracing::{debug, info};

use crate::fuzzy::partial_ratio;

#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub top_k: usize,
    /// Restrict the search to these document ids.
    pub file_filter: Option<Vec<String>>,
    /// Overrides [`BoostSettings::fallback`] for this query.
    pub fallback: Option<bool>,
}

impl SearchOptions {
    pub fn top_k(top_k: usize) -> Self {
        Self { top_k, ..Self::default() }
    }
}

/// How one chunk's text relates to a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkMatch {
    pub score: f32,
    pub exact: bool,
    pub fuzzy: f32,
}

/// Score lowercased chunk text against a lowercased query and its distinct
/// words: 1.0 for a substring hit, else the partial fuzzy similarity, plus
/// `word_bonus` per word found, clamped.
pub fn score_chunk(text_lower: &str, query_lower: &str, words: &[String], word_bonus: f32) -> ChunkMatch {
    let exact = text_lower.contains(query_lower);
    let fuzzy = if exact { 1.0 } else { partial_ratio(query_lower, text_lower) };
    let found = words.iter().filter(|w| text_lower.contains(w.as_str())).count();
    ChunkMatch { score: clamp_score(fuzzy + word_bonus * found as f32), exact, fuzzy }
}

fn distinct_words(query_lower: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    query_lower.split_whitespace().filter(|w| seen.insert(*w)).map(str::to_string).collect()
}

fn sort_desc(results: &mut [ScoredChunk]) {
    // stable: equal scores keep visiting order
    results.sort_by(|a, b| b.score().total_cmp(&a.score()));
}

pub struct MetadataBoostedSearch {
    corpus: Arc<Corpus>,
    boost: BoostSettings,
}

impl MetadataBoostedSearch {
    pub fn new(corpus: Arc<Corpus>, boost: BoostSettings) -> Self {
        Self { corpus, boost }
    }

    pub fn settings(&self) -> &BoostSettings {
        &self.boost
    }

    /// Metadata relevance of one document for a query. Each entry of
    /// `words` adds its boost, so repeated query words count repeatedly.
    pub fn pre_score(&self, meta: &DocumentMetadata, query_lower: &str, words: &[String]) -> f32 {
        let file_name = DocumentMetadata::lowered(&meta.file_name);
        let business = DocumentMetadata::lowered(&meta.business_name);
        let organization = DocumentMetadata::lowered(&meta.organization);
        let b = &self.boost;

        let mut score = 0.0;
        if file_name.contains(query_lower) {
            score += b.file_name_exact;
        }
        if business.contains(query_lower) {
            score += b.business_name_exact;
        }
        if organization.contains(query_lower) {
            score += b.organization_exact;
        }
        for word in words {
            if file_name.contains(word.as_str()) {
                score += b.file_name_word;
            }
            if business.contains(word.as_str()) {
                score += b.business_name_word;
            }
        }
        score
    }

    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<ScoredChunk>> {
        self.search_with(query, &SearchOptions::top_k(top_k))
    }

    pub fn search_with(&self, query: &str, options: &SearchOptions) -> Result<Vec<ScoredChunk>> {
        self.corpus.ensure_ready()?;
        let query_lower = query.trim().to_lowercase();
        if options.top_k == 0 || query_lower.is_empty() {
            return Ok(Vec::new());
        }
        let words = distinct_words(&query_lower);
        // metadata word boosts count every occurrence, chunk bonuses count distinct words
        let all_words: Vec<String> = query_lower.split_whitespace().map(str::to_string).collect();
        let top_k = options.top_k;

        let candidates: Vec<&CorpusDocument> = self
            .corpus
            .documents()
            .iter()
            .filter(|d| match &options.file_filter {
                Some(filter) => filter.contains(&d.doc_id),
                None => true,
            })
            .collect();

        // metadata-matched documents first (descending, ties by id), then the rest in corpus order
        let mut matched: Vec<(&CorpusDocument, f32)> = Vec::new();
        let mut rest: Vec<&CorpusDocument> = Vec::new();
        for doc in candidates {
            let pre = self.pre_score(&doc.metadata, &query_lower, &all_words);
            if pre > 0.0 {
                matched.push((doc, pre));
            } else {
                rest.push(doc);
            }
        }
        matched.sort_by(|(a, sa), (b, sb)| sb.total_cmp(sa).then_with(|| a.doc_id.cmp(&b.doc_id)));
        let ordered: Vec<(&CorpusDocument, f32)> = matched.into_iter().chain(rest.into_iter().map(|d| (d, 0.0))).collect();

        let mut results = Vec::new();
        for (doc, pre) in &ordered {
            let mut hits = self.search_document(doc, &query_lower, &words, *pre > 0.0, top_k);
            if *pre > 0.0 {
                let boost = self.boost.metadata_scale * pre;
                for hit in &mut hits {
                    hit.set_score(hit.score() + boost);
                    hit.relevance_boost = Some(boost);
                }
            }
            results.extend(hits);
        }
        sort_desc(&mut results);
        results.truncate(top_k);

        let fallback = options.fallback.unwrap_or(self.boost.fallback);
        if results.is_empty() && fallback && words.len() > 1 {
            let docs: Vec<&CorpusDocument> = ordered.iter().map(|(d, _)| *d).collect();
            results = self.fallback(&words, &docs, top_k);
        }
        debug!(query, results = results.len(), "metadata-boosted search");
        Ok(results)
    }

    /// Matching chunks of one document, best first, at most `limit`.
    /// `include_all` counts every chunk as a match.
    fn search_document(&self, doc: &CorpusDocument, query_lower: &str, words: &[String], include_all: bool, limit: usize) -> Vec<ScoredChunk> {
        let mut hits: Vec<ScoredChunk> = doc
            .chunks
            .iter()
            .filter_map(|chunk| {
                let m = score_chunk(&chunk.text.to_lowercase(), query_lower, words, self.boost.chunk_word);
                let is_match = include_all || m.exact || m.fuzzy >= self.boost.fuzzy_threshold;
                is_match.then(|| ScoredChunk::new(chunk.clone(), m.score))
            })
            .collect();
        sort_desc(&mut hits);
        hits.truncate(limit);
        hits
    }

    fn fallback(&self, words: &[String], docs: &[&CorpusDocument], top_k: usize) -> Vec<ScoredChunk> {
        info!(words = words.len(), "no direct matches, searching query words individually");
        let share = (top_k / words.len()).max(1);
        let mut merged = Vec::new();
        for word in words.iter().filter(|w| w.chars().count() > 1) {
            merged.extend(self.search_keyword(word, docs, share));
        }

        let mut seen = HashSet::new();
        let mut results: Vec<ScoredChunk> = merged
            .into_iter()
            .filter(|r| seen.insert(r.chunk.chunk_id.clone()))
            .map(|mut r| {
                r.set_score(r.score() * self.boost.fallback_penalty);
                r
            })
            .collect();
        sort_desc(&mut results);
        results.truncate(top_k);
        if !results.is_empty() {
            info!(results = results.len(), "fallback search found partial-keyword matches");
        }
        results
    }

    /// One word across documents; name matches are visited first.
    fn search_keyword(&self, word: &str, docs: &[&CorpusDocument], limit: usize) -> Vec<ScoredChunk> {
        let names_match = |d: &CorpusDocument| {
            DocumentMetadata::lowered(&d.metadata.file_name).contains(word)
                || DocumentMetadata::lowered(&d.metadata.business_name).contains(word)
        };
        let (first, later): (Vec<&CorpusDocument>, Vec<&CorpusDocument>) = docs.iter().copied().partition(|d| names_match(*d));
        let word_list = [word.to_string()];

        let mut results = Vec::new();
        for doc in first.iter().chain(later.iter()).take(self.boost.fallback_max_documents) {
            let by_name = names_match(*doc);
            results.extend(self.search_document(doc, word, &word_list, by_name, self.boost.fallback_chunks_per_document));
        }
        sort_desc(&mut results);
        results.truncate(limit);
        results
    }
}
