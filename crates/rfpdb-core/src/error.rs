use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Unrecognized or corrupt container/record structure.
    #[error("Format error: {0}")]
    Format(String),

    /// Malformed compressed stream.
    #[error("Decompression error: {0}")]
    Decompression(String),

    /// The chunker stopped making forward progress. Offsets derived from the
    /// chunk set can no longer be trusted.
    #[error("Chunk boundary violated: {0}")]
    Boundary(String),

    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Corpus is not ready for queries")]
    NotReady,

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Everything except a chunker boundary fault degrades to a partial
    /// result for the affected document or query.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Error::Boundary(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
