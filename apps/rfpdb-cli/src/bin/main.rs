use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use rfpdb_core::config::{resolve_with_base, Config, Settings};
use rfpdb_core::traits::{ChunkStore, LexicalIndex, SemanticIndex};
use rfpdb_core::types::{DocumentFormat, RawDocument, ScoredChunk};
use rfpdb_core::store::JsonDirStore;
use rfpdb_core::Corpus;
use rfpdb_embed::HashEmbedder;
use rfpdb_hybrid::{HybridRanker, MetadataBoostedSearch, RankOptions, SearchOptions, TermOverlapReranker};
use rfpdb_ingest::metadata::{discover, MetadataTable};
use rfpdb_ingest::{extract, IngestPipeline, PendingDocument};
use rfpdb_text::TantivyLexicalIndex;
use rfpdb_vector::VectorIndex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rfpdb")]
#[command(about = "Index and search procurement documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract, chunk and index every document under the raw directory
    Ingest {
        /// Overrides data.raw_dir
        #[arg(long)]
        raw_dir: Option<PathBuf>,
        /// Overrides data.metadata_file
        #[arg(long)]
        metadata: Option<PathBuf>,
        /// Overrides ingest.workers
        #[arg(long)]
        workers: Option<usize>,
        /// Skip building the on-disk lexical index
        #[arg(long)]
        skip_tantivy: bool,
    },
    /// Search the ingested corpus
    Query {
        query: String,
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        #[arg(long, value_enum, default_value_t = Mode::Hybrid)]
        mode: Mode,
        /// Reorder hybrid candidates by term overlap
        #[arg(long)]
        rerank: bool,
        /// Restrict metadata search to these document ids
        #[arg(long = "file")]
        files: Vec<String>,
        /// Disable per-word fallback in metadata mode
        #[arg(long)]
        no_fallback: bool,
    },
    /// Print the normalized text of one document
    Extract { path: PathBuf },
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Hybrid,
    Metadata,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    match Cli::parse().command {
        Command::Extract { path } => extract_one(&path),
        Command::Ingest { raw_dir, metadata, workers, skip_tantivy } => {
            let (settings, base) = load_settings()?;
            let raw_dir = raw_dir.unwrap_or_else(|| resolve_with_base(&base, &settings.data.raw_dir));
            let metadata = metadata.or_else(|| settings.data.metadata_file.as_ref().map(|m| resolve_with_base(&base, m)));
            ingest(&settings, &base, &raw_dir, metadata.as_deref(), workers, skip_tantivy)
        }
        Command::Query { query, top_k, mode, rerank, files, no_fallback } => {
            let (settings, base) = load_settings()?;
            let top_k = top_k.unwrap_or(settings.retrieval.top_k).min(settings.retrieval.max_top_k);
            let store = JsonDirStore::open(resolve_with_base(&base, &settings.data.store_dir))?;
            let corpus = Arc::new(Corpus::from_store(&store).context("loading chunk store")?);
            info!(documents = corpus.documents().len(), chunks = corpus.chunk_count(), "corpus loaded");

            let results = match mode {
                Mode::Hybrid => {
                    let ranker = hybrid_ranker(&settings, &base, Arc::clone(&corpus), rerank)?;
                    ranker.rank(&query, top_k).await?
                }
                Mode::Metadata => {
                    let search = MetadataBoostedSearch::new(corpus, settings.boost.clone());
                    let options = SearchOptions {
                        top_k,
                        file_filter: (!files.is_empty()).then_some(files),
                        fallback: no_fallback.then_some(false),
                    };
                    search.search_with(&query, &options)?
                }
            };
            print_results(&query, &results);
            Ok(())
        }
    }
}

/// Settings plus the directory relative data paths resolve against.
fn load_settings() -> Result<(Settings, PathBuf)> {
    let config = Config::load().context("loading configuration")?;
    Ok((config.settings()?, env::current_dir()?))
}

fn extract_one(path: &Path) -> Result<()> {
    let Some(format) = DocumentFormat::from_path(path) else {
        bail!("unsupported file type: {}", path.display());
    };
    let doc_id = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let extracted = extract(&RawDocument::new(doc_id, format, bytes))?;
    for warning in &extracted.warnings {
        warn!(%warning, "extraction warning");
    }
    info!(chars = extracted.char_len(), path = %path.display(), "extracted");
    println!("{}", extracted.text);
    Ok(())
}

fn ingest(
    settings: &Settings,
    base: &Path,
    raw_dir: &Path,
    metadata: Option<&Path>,
    workers: Option<usize>,
    skip_tantivy: bool,
) -> Result<()> {
    let sources = discover(raw_dir).with_context(|| format!("scanning {}", raw_dir.display()))?;
    let table = match metadata {
        Some(path) => MetadataTable::load(path).with_context(|| format!("reading {}", path.display()))?,
        None => MetadataTable::new(),
    };
    info!(files = sources.len(), metadata_rows = table.len(), dir = %raw_dir.display(), "discovered sources");

    let mut pending = Vec::with_capacity(sources.len());
    for source in &sources {
        match source.read() {
            Ok(raw) => pending.push(PendingDocument::new(raw, table.for_file(&source.file_name()))),
            Err(e) => warn!(path = %source.path.display(), error = %e, "unreadable source, skipping"),
        }
    }

    let pipeline = IngestPipeline::new(settings.chunking.clone(), workers.unwrap_or(settings.ingest.workers))?;
    let bar = ProgressBar::new(pending.len() as u64);
    bar.set_style(ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")?);
    let report = pipeline.run_with_progress(pending, |outcome| {
        bar.set_message(outcome.doc_id.clone());
        bar.inc(1);
    })?;
    bar.finish_and_clear();

    if let Some(e) = report.fatal() {
        bail!("ingest aborted: {}", e);
    }

    let store = JsonDirStore::open(resolve_with_base(base, &settings.data.store_dir))?;
    for record in report.records() {
        store.put(record).with_context(|| format!("storing {}", record.doc_id))?;
    }
    let (succeeded, failed) = (report.succeeded(), report.failed());
    let corpus = Corpus::from_records(report.into_records())?;

    if !skip_tantivy && !corpus.is_empty() {
        let index_dir = resolve_with_base(base, &settings.data.tantivy_index_dir);
        let index = TantivyLexicalIndex::create_in_dir(&index_dir, &corpus.index_pairs())?;
        info!(docs = index.num_docs(), dir = %index_dir.display(), "lexical index written");
    }

    println!("Ingested {} documents ({} failed), {} chunks", succeeded, failed, corpus.chunk_count());
    Ok(())
}

fn hybrid_ranker(settings: &Settings, base: &Path, corpus: Arc<Corpus>, rerank: bool) -> Result<HybridRanker> {
    let pairs = corpus.index_pairs();
    let index_dir = resolve_with_base(base, &settings.data.tantivy_index_dir);
    let lexical = TantivyLexicalIndex::open_in_dir(&index_dir)
        .or_else(|e| {
            warn!(error = %e, "no lexical index on disk, building in memory");
            TantivyLexicalIndex::build_in_ram(&pairs)
        })
        .map(|index| Arc::new(index) as Arc<dyn LexicalIndex>);

    let embedder = Arc::new(HashEmbedder::new(settings.retrieval.embedding_dim)?);
    let semantic: Arc<dyn SemanticIndex> = Arc::new(VectorIndex::build(embedder, &pairs)?);

    let mut options = RankOptions::from(&settings.retrieval);
    options.rerank |= rerank;
    Ok(HybridRanker::new(corpus, options)
        .with_lexical(lexical)
        .with_semantic(semantic)
        .with_reranker(Arc::new(TermOverlapReranker)))
}

fn print_results(query: &str, results: &[ScoredChunk]) {
    println!("Query: {}", query);
    if results.is_empty() {
        println!("No results.");
        return;
    }
    for (i, r) in results.iter().enumerate() {
        let name = r.chunk.metadata.file_name.as_deref().unwrap_or(&r.chunk.doc_id);
        let preview: String = r.chunk.text.chars().take(160).collect();
        println!("{}. [{:.3}] {} ({})", i + 1, r.score(), name, r.chunk.chunk_id);
        if let Some(boost) = r.relevance_boost {
            println!("   boost: {:.3}", boost);
        }
        println!("   {}", preview.replace('\n', " "));
    }
}
