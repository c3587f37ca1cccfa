//! Unified error type for the orchestrator, worker and registry.

use code_chunker::ChunkerError;
use embedding_service::EmbeddingError;
use thiserror::Error;
use vector_store::StoreError;

pub type Result<T> = std::result::Result<T, IndexError>;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum IndexError {
    /// Environment value missing or malformed.
    #[error("[Index Service] invalid config in {var}: {reason}")]
    Config { var: &'static str, reason: String },

    #[error(transparent)]
    Chunker(#[from] ChunkerError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The worker thread could not be started.
    #[error("[Index Service] failed to spawn worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    /// The worker's channel is closed; the next run starts a new worker.
    #[error("[Index Service] worker is not running")]
    WorkerGone,

    #[error("[Index Service] io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
