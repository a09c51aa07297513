//! Source discovery and the metadata sidecar.
//!
//! Documents are found by walking a directory; `doc_id` is the file stem.
//! Metadata comes from a sheet with one row per document, keyed by file name
//! (`file_name` or `파일명`): either the procurement CSV export (UTF-8, or
//! cp949 as saved by Korean spreadsheet tools) or JSON lines.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use rfpdb_core::error::{Error, Result};
use rfpdb_core::types::{DocumentFormat, DocumentMetadata, RawDocument};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub doc_id: String,
    pub format: DocumentFormat,
}

impl SourceFile {
    pub fn file_name(&self) -> String {
        self.path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default()
    }

    pub fn read(&self) -> Result<RawDocument> {
        let bytes = fs::read(&self.path)?;
        Ok(RawDocument::new(&self.doc_id, self.format, bytes))
    }
}

/// Every supported file under `root`, sorted by path. Files with unknown
/// extensions are ignored; a second file with an already-seen stem is
/// skipped with a warning.
pub fn discover(root: &Path) -> Result<Vec<SourceFile>> {
    if !root.is_dir() {
        return Err(Error::NotFound(format!("source directory {}", root.display())));
    }
    let mut paths: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();
    paths.sort();

    let mut seen = HashSet::new();
    let mut files = Vec::new();
    for path in paths {
        let Some(format) = DocumentFormat::from_path(&path) else {
            debug!(path = %path.display(), "skipping unsupported file");
            continue;
        };
        let Some(doc_id) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else { continue };
        if !seen.insert(doc_id.clone()) {
            warn!(path = %path.display(), %doc_id, "duplicate document id, skipping");
            continue;
        }
        files.push(SourceFile { path, doc_id, format });
    }
    Ok(files)
}

/// Metadata rows indexed by file name.
#[derive(Debug, Clone, Default)]
pub struct MetadataTable {
    by_file_name: HashMap<String, DocumentMetadata>,
}

impl MetadataTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: impl IntoIterator<Item = DocumentMetadata>) -> Self {
        let mut table = Self::new();
        for row in rows {
            table.insert(row);
        }
        table
    }

    /// Rows without a file name cannot be matched and are dropped.
    pub fn insert(&mut self, row: DocumentMetadata) {
        if let Some(name) = row.file_name.clone() {
            self.by_file_name.insert(name, row);
        }
    }

    /// Load a metadata sheet, choosing the parser by extension: `.csv` is
    /// read as CSV, anything else as JSON lines.
    pub fn load(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
            Some("csv") => Self::load_csv(path),
            _ => Self::load_jsonl(path),
        }
    }

    /// Parse a header-keyed CSV file. Columns are matched by their English
    /// or Korean names; unknown columns are ignored and malformed rows are
    /// skipped with a warning.
    pub fn load_csv(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let content = decode_sheet(&bytes);
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let mut table = Self::new();
        for (i, row) in reader.deserialize::<DocumentMetadata>().enumerate() {
            match row {
                Ok(row) => table.insert(row),
                Err(e) => warn!(path = %path.display(), row = i + 1, error = %e, "skipping metadata row"),
            }
        }
        debug!(rows = table.len(), "loaded metadata sheet");
        Ok(table)
    }

    /// Parse a JSON-lines file. Blank lines are ignored and malformed lines
    /// are skipped with a warning.
    pub fn load_jsonl(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut table = Self::new();
        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<DocumentMetadata>(line) {
                Ok(row) => table.insert(row),
                Err(e) => warn!(path = %path.display(), line = lineno + 1, error = %e, "skipping metadata row"),
            }
        }
        debug!(rows = table.len(), "loaded metadata sidecar");
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.by_file_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_file_name.is_empty()
    }

    /// Metadata for a source file; unknown files get an otherwise empty record
    /// carrying their own file name.
    pub fn for_file(&self, file_name: &str) -> DocumentMetadata {
        self.by_file_name
            .get(file_name)
            .cloned()
            .unwrap_or_else(|| DocumentMetadata::default().with_file_name(file_name))
    }
}

/// UTF-8 (BOM stripped) when valid, otherwise cp949.
fn decode_sheet(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF".as_slice()).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => {
            let (decoded, _, had_errors) = encoding_rs::EUC_KR.decode(bytes);
            if had_errors {
                warn!("metadata sheet is neither UTF-8 nor cp949, some characters were replaced");
            }
            decoded
        }
    }
}
