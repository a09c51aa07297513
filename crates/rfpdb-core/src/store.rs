//! JSON file-per-document chunk store.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::Result;
use crate::traits::ChunkStore;
use crate::types::DocumentRecord;

const MAX_FILE_STEM: usize = 200;

pub struct JsonDirStore {
    root: PathBuf,
}

impl JsonDirStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, doc_id: &str) -> PathBuf {
        self.root.join(format!("{}.json", safe_file_stem(doc_id)))
    }

    /// Where `doc_id` is written. A safe name already holding a different
    /// document (`a:b` and `a_b` share one) moves the record to `<stem>~<n>.json`.
    fn slot_for(&self, doc_id: &str) -> PathBuf {
        let stem = safe_file_stem(doc_id);
        let mut n = 0usize;
        loop {
            let path = match n {
                0 => self.root.join(format!("{}.json", stem)),
                n => self.root.join(format!("{}~{}.json", stem, n)),
            };
            if !path.exists() {
                return path;
            }
            match Self::read_record(&path) {
                Ok(existing) if existing.doc_id != doc_id => {
                    warn!(doc_id, existing = %existing.doc_id, path = %path.display(), "file name taken by another document");
                }
                _ => return path,
            }
            n += 1;
        }
    }

    fn read_record(path: &Path) -> Result<DocumentRecord> {
        let bytes = fs::read(path)?;
        let mut record: DocumentRecord = serde_json::from_slice(&bytes)?;
        record.attach_metadata();
        Ok(record)
    }

    fn json_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("json") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

impl ChunkStore for JsonDirStore {
    fn put(&self, record: &DocumentRecord) -> Result<()> {
        let json = serde_json::to_vec_pretty(record)?;
        fs::write(self.slot_for(&record.doc_id), json)?;
        Ok(())
    }

    /// Looks up the safe file name first, then scans for a record whose
    /// `doc_id` collided or was truncated on the way to disk.
    fn get(&self, doc_id: &str) -> Result<Option<DocumentRecord>> {
        let path = self.path_for(doc_id);
        if path.exists() {
            let record = Self::read_record(&path)?;
            if record.doc_id == doc_id {
                return Ok(Some(record));
            }
        }
        for file in self.json_files()? {
            match Self::read_record(&file) {
                Ok(record) if record.doc_id == doc_id => return Ok(Some(record)),
                Ok(_) => {}
                Err(e) => warn!(path = %file.display(), error = %e, "skipping unreadable record"),
            }
        }
        Ok(None)
    }

    fn list(&self) -> Result<Vec<DocumentRecord>> {
        let mut records = Vec::new();
        for file in self.json_files()? {
            match Self::read_record(&file) {
                Ok(record) => records.push(record),
                Err(e) => warn!(path = %file.display(), error = %e, "skipping unreadable record"),
            }
        }
        Ok(records)
    }
}

/// Replace path-hostile characters with `_` and cap the length.
pub fn safe_file_stem(doc_id: &str) -> String {
    doc_id
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            other => other,
        })
        .take(MAX_FILE_STEM)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_stem_replaces_and_truncates() {
        assert_eq!(safe_file_stem("a/b:c?d"), "a_b_c_d");
        assert_eq!(safe_file_stem(&"가".repeat(300)).chars().count(), 200);
    }
}
