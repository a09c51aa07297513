//! rfpdb-embed
//!
//! Deterministic feature-hashing embedder. Words and character bigrams are
//! hashed into a fixed number of buckets and the vector is L2-normalized, so
//! texts sharing vocabulary (including partial Hangul words) land close
//! together without a model.

use std::hash::{Hash, Hasher};

use rfpdb_core::error::{Error, Result};
use rfpdb_core::traits::Embedder;
use tracing::debug;
use twox_hash::XxHash64;

const BIGRAM_WEIGHT: f32 = 0.5;

fn bucket(feature: &str, dim: usize) -> (usize, f32) {
    let mut hasher = XxHash64::with_seed(0);
    feature.hash(&mut hasher);
    let h = hasher.finish();
    // high bit picks the sign so collisions tend to cancel
    let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
    ((h as usize) % dim, sign)
}

pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::InvalidConfig("embedding dimension must be positive".into()));
        }
        Ok(Self { dim })
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for token in text.split_whitespace().map(str::to_lowercase) {
            let (idx, sign) = bucket(&token, self.dim);
            v[idx] += sign;
            let chars: Vec<char> = token.chars().collect();
            for pair in chars.windows(2) {
                let bigram: String = pair.iter().collect();
                let (idx, sign) = bucket(&bigram, self.dim);
                v[idx] += sign * BIGRAM_WEIGHT;
            }
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 1e-6 {
            for x in &mut v { *x /= norm; }
        }
        v
    }
}

impl Embedder for HashEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        debug!(batch = texts.len(), dim = self.dim, "embedding batch");
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

pub fn get_default_embedder(dim: usize) -> Result<Box<dyn Embedder>> {
    Ok(Box::new(HashEmbedder::new(dim)?))
}

/// Dot product of two L2-normalized vectors.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
