use std::path::Path;

use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::{Field, Value};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument};
use tracing::{debug, info};

use rfpdb_core::error::{Error, Result};
use rfpdb_core::traits::LexicalIndex;
use rfpdb_core::types::{SearchHit, SourceKind};

use crate::tantivy_utils::{build_schema, register_tokenizer, ID_FIELD, TEXT_FIELD};

const WRITER_HEAP_BYTES: usize = 50_000_000;

fn unavailable(e: impl std::fmt::Display) -> Error {
	Error::IndexUnavailable(e.to_string())
}

pub struct TantivyLexicalIndex {
	index: Index,
	reader: IndexReader,
	id_field: Field,
	text_field: Field,
}

impl TantivyLexicalIndex {
	/// Build an in-memory index. Zero pairs leave nothing to search and are
	/// reported as an unavailable index.
	pub fn build_in_ram(pairs: &[(String, String)]) -> Result<Self> {
		if pairs.is_empty() {
			return Err(Error::IndexUnavailable("no chunks to index".into()));
		}
		let this = Self::from_index(Index::create_in_ram(build_schema()))?;
		this.add_all(pairs)?;
		Ok(this)
	}

	/// Build a fresh on-disk index in `index_dir`, replacing whatever was there.
	pub fn create_in_dir(index_dir: &Path, pairs: &[(String, String)]) -> Result<Self> {
		if pairs.is_empty() {
			return Err(Error::IndexUnavailable("no chunks to index".into()));
		}
		if index_dir.exists() { std::fs::remove_dir_all(index_dir)?; }
		std::fs::create_dir_all(index_dir)?;
		let this = Self::from_index(Index::create_in_dir(index_dir, build_schema()).map_err(unavailable)?)?;
		this.add_all(pairs)?;
		info!(dir = %index_dir.display(), docs = pairs.len(), "lexical index built");
		Ok(this)
	}

	pub fn open_in_dir(index_dir: &Path) -> Result<Self> {
		let index = Index::open_in_dir(index_dir).map_err(unavailable)?;
		Self::from_index(index)
	}

	fn from_index(index: Index) -> Result<Self> {
		register_tokenizer(&index);
		let schema = index.schema();
		let id_field = schema.get_field(ID_FIELD).map_err(unavailable)?;
		let text_field = schema.get_field(TEXT_FIELD).map_err(unavailable)?;
		let reader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into().map_err(unavailable)?;
		Ok(Self { index, reader, id_field, text_field })
	}

	fn add_all(&self, pairs: &[(String, String)]) -> Result<()> {
		let mut index_writer: IndexWriter = self.index.writer(WRITER_HEAP_BYTES).map_err(unavailable)?;
		for (id, text) in pairs {
			index_writer.add_document(doc!(self.id_field => id.clone(), self.text_field => text.clone())).map_err(unavailable)?;
		}
		index_writer.commit().map_err(unavailable)?;
		self.reader.reload().map_err(unavailable)?;
		debug!(docs = pairs.len(), "lexical index committed");
		Ok(())
	}

	pub fn num_docs(&self) -> u64 {
		self.reader.searcher().num_docs()
	}
}

impl LexicalIndex for TantivyLexicalIndex {
	fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
		if k == 0 || query.trim().is_empty() {
			return Ok(Vec::new());
		}
		let searcher = self.reader.searcher();
		let qp = QueryParser::for_index(&self.index, vec![self.text_field]);
		let (q, _errors) = qp.parse_query_lenient(query);
		let top_docs = searcher.search(&q, &TopDocs::with_limit(k)).map_err(unavailable)?;
		let mut hits = Vec::with_capacity(top_docs.len());
		for (score, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr).map_err(unavailable)?;
			if let Some(id) = doc.get_first(self.id_field).and_then(|v| v.as_str()) {
				hits.push(SearchHit { id: id.to_string(), score, source: SourceKind::Text });
			}
		}
		Ok(hits)
	}
}
