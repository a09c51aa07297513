//! Compound-file container access.
//!
//! The extractor only needs stream enumeration and byte reads, so it works
//! against [`ContainerReader`]; [`CfbContainer`] backs it with the `cfb`
//! crate and [`MemoryContainer`] with a plain map.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Seek, SeekFrom};

use cfb::CompoundFile;
use rfpdb_core::error::{Error, Result};

pub trait ContainerReader {
    /// Slash-separated paths of every stream, without a leading `/`
    /// (e.g. `BodyText/Section0`).
    fn stream_names(&self) -> Vec<String>;

    fn read_stream(&mut self, path: &str) -> Result<Vec<u8>>;

    /// Read exactly `len` bytes at `offset`; short streams are a format error.
    fn read_range(&mut self, path: &str, offset: u64, len: usize) -> Result<Vec<u8>>;
}

pub struct CfbContainer<F> {
    file: CompoundFile<F>,
    names: Vec<String>,
}

impl<'a> CfbContainer<Cursor<&'a [u8]>> {
    pub fn from_bytes(bytes: &'a [u8]) -> Result<Self> {
        Self::open(Cursor::new(bytes))
    }
}

impl<F: Read + Seek> CfbContainer<F> {
    pub fn open(inner: F) -> Result<Self> {
        let file = CompoundFile::open(inner)
            .map_err(|e| Error::Format(format!("not a compound file: {}", e)))?;
        let names = file
            .walk()
            .filter(|entry| entry.is_stream())
            .map(|entry| entry.path().to_string_lossy().trim_start_matches('/').to_string())
            .collect();
        Ok(Self { file, names })
    }

    fn open_stream(&mut self, path: &str) -> Result<cfb::Stream<F>> {
        self.file
            .open_stream(format!("/{}", path))
            .map_err(|e| Error::Format(format!("cannot open stream {}: {}", path, e)))
    }
}

impl<F: Read + Seek> ContainerReader for CfbContainer<F> {
    fn stream_names(&self) -> Vec<String> {
        self.names.clone()
    }

    fn read_stream(&mut self, path: &str) -> Result<Vec<u8>> {
        let mut stream = self.open_stream(path)?;
        let mut data = Vec::new();
        stream
            .read_to_end(&mut data)
            .map_err(|e| Error::Format(format!("cannot read stream {}: {}", path, e)))?;
        Ok(data)
    }

    fn read_range(&mut self, path: &str, offset: u64, len: usize) -> Result<Vec<u8>> {
        let mut stream = self.open_stream(path)?;
        let mut buf = vec![0u8; len];
        stream
            .seek(SeekFrom::Start(offset))
            .and_then(|_| stream.read_exact(&mut buf))
            .map_err(|e| Error::Format(format!("{}: cannot read {} bytes at {}: {}", path, len, offset, e)))?;
        Ok(buf)
    }
}

/// In-memory container keyed by stream path.
#[derive(Debug, Clone, Default)]
pub struct MemoryContainer {
    streams: BTreeMap<String, Vec<u8>>,
}

impl MemoryContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stream(mut self, path: impl Into<String>, data: Vec<u8>) -> Self {
        self.streams.insert(path.into(), data);
        self
    }

    fn stream(&self, path: &str) -> Result<&Vec<u8>> {
        self.streams
            .get(path)
            .ok_or_else(|| Error::Format(format!("missing stream {}", path)))
    }
}

impl ContainerReader for MemoryContainer {
    fn stream_names(&self) -> Vec<String> {
        self.streams.keys().cloned().collect()
    }

    fn read_stream(&mut self, path: &str) -> Result<Vec<u8>> {
        self.stream(path).cloned()
    }

    fn read_range(&mut self, path: &str, offset: u64, len: usize) -> Result<Vec<u8>> {
        let data = self.stream(path)?;
        let start = usize::try_from(offset).map_err(|_| Error::Format(format!("{}: offset overflow", path)))?;
        start
            .checked_add(len)
            .and_then(|end| data.get(start..end))
            .map(<[u8]>::to_vec)
            .ok_or_else(|| Error::Format(format!("{}: cannot read {} bytes at {}", path, len, offset)))
    }
}
