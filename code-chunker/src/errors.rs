use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChunkerError {
    #[error("[Chunker] invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("[Chunker] unknown chunk type: {0}")]
    UnknownChunkType(String),
}

pub type Result<T> = std::result::Result<T, ChunkerError>;
