//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! on top of [`Settings::default`]. Provides helpers to expand `~` and `${VAR}`
//! and to resolve relative paths against a known base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::DocumentFormat;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?.validate()?;
        Ok(config)
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{}': {}", key, e)))
    }

    pub fn settings(&self) -> Result<Settings> {
        self.figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub chunking: ChunkingSettings,
    pub retrieval: RetrievalSettings,
    pub boost: BoostSettings,
    pub ingest: IngestSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        self.chunking.default.validate()?;
        for overrides in [&self.chunking.compound_binary, &self.chunking.paginated] {
            overrides.validate()?;
        }
        let r = &self.retrieval;
        if r.lexical_weight < 0.0 || r.semantic_weight < 0.0 || r.lexical_weight + r.semantic_weight <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "retrieval weights must be non-negative with a positive sum, got ({}, {})",
                r.lexical_weight, r.semantic_weight
            )));
        }
        if r.top_k == 0 || r.top_k > r.max_top_k {
            return Err(Error::InvalidConfig(format!("top_k must be in 1..={}, got {}", r.max_top_k, r.top_k)));
        }
        if !(0.0..=1.0).contains(&self.boost.fuzzy_threshold) {
            return Err(Error::InvalidConfig(format!("fuzzy_threshold must be in [0,1], got {}", self.boost.fuzzy_threshold)));
        }
        if self.ingest.workers == 0 {
            return Err(Error::InvalidConfig("ingest.workers must be at least 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub raw_dir: String,
    pub store_dir: String,
    pub tantivy_index_dir: String,
    pub metadata_file: Option<String>,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            raw_dir: "../data/raw".to_string(),
            store_dir: "../data/chunks".to_string(),
            tantivy_index_dir: "../data/indexes/tantivy".to_string(),
            metadata_file: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub min_chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 1000, chunk_overlap: 200, min_chunk_size: 100 }
    }
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize, min_chunk_size: usize) -> Self {
        Self { chunk_size, chunk_overlap, min_chunk_size }
    }

    /// Overlap after clamping to a third of the chunk size.
    pub fn effective_overlap(&self) -> usize {
        self.chunk_overlap.min(self.chunk_size / 3)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 || self.min_chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size and min_chunk_size must be positive".into()));
        }
        if self.min_chunk_size > self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "min_chunk_size ({}) exceeds chunk_size ({})",
                self.min_chunk_size, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Global chunking defaults plus per-format overrides. Compound-binary sources
/// average far shorter raw text than paginated ones, so they get smaller
/// windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    pub default: ChunkingConfig,
    pub compound_binary: ChunkingConfig,
    pub paginated: ChunkingConfig,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            default: ChunkingConfig::default(),
            compound_binary: ChunkingConfig::new(800, 150, 100),
            paginated: ChunkingConfig::new(1200, 200, 100),
        }
    }
}

impl ChunkingSettings {
    /// Same parameters for every format.
    pub fn uniform(config: ChunkingConfig) -> Self {
        Self { default: config, compound_binary: config, paginated: config }
    }

    pub fn for_format(&self, format: DocumentFormat) -> ChunkingConfig {
        match format {
            DocumentFormat::CompoundBinary => self.compound_binary,
            DocumentFormat::Paginated => self.paginated,
            DocumentFormat::PlainText => self.default,
        }
    }
}

/// How index-local scores are brought into `[0, 1]` before blending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Normalization {
    /// Divide by the best score in the list.
    Score,
    /// Reciprocal rank, scaled so the top hit is 1.0.
    Rank,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub max_top_k: usize,
    pub lexical_weight: f32,
    pub semantic_weight: f32,
    pub normalization: Normalization,
    pub rerank: bool,
    pub collaborator_timeout_ms: u64,
    pub embedding_dim: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 10,
            max_top_k: 20,
            lexical_weight: 0.5,
            semantic_weight: 0.5,
            normalization: Normalization::Score,
            rerank: false,
            collaborator_timeout_ms: 2000,
            embedding_dim: 384,
        }
    }
}

/// Empirically tuned constants of the metadata-boosted search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostSettings {
    pub file_name_exact: f32,
    pub business_name_exact: f32,
    pub organization_exact: f32,
    pub file_name_word: f32,
    pub business_name_word: f32,
    pub chunk_word: f32,
    pub metadata_scale: f32,
    pub fallback_penalty: f32,
    pub fuzzy_threshold: f32,
    pub fallback: bool,
    pub fallback_max_documents: usize,
    pub fallback_chunks_per_document: usize,
}

impl Default for BoostSettings {
    fn default() -> Self {
        Self {
            file_name_exact: 2.0,
            business_name_exact: 1.5,
            organization_exact: 0.5,
            file_name_word: 0.5,
            business_name_word: 0.3,
            chunk_word: 0.1,
            metadata_scale: 0.1,
            fallback_penalty: 0.7,
            fuzzy_threshold: 0.8,
            fallback: true,
            fallback_max_documents: 20,
            fallback_chunks_per_document: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    pub workers: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self { workers: 4 }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    // Expand env vars first
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    // Expand ~ at start
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
