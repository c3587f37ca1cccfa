//! Unified error type for the vector store.

use std::path::PathBuf;

use arrow_schema::ArrowError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Index directory could not be created.
    #[error("[Vector Store] io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// LanceDB call failed; `op` names the store operation.
    #[error("[Vector Store] {op} failed: {source}")]
    Lance {
        op: &'static str,
        #[source]
        source: lancedb::Error,
    },

    #[error("[Vector Store] arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Vector length differs from the table's fixed dimension.
    #[error("[Vector Store] vector dimension mismatch: table has {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// A stored column is missing or has an unexpected type.
    #[error("[Vector Store] unexpected column layout: {0}")]
    Schema(String),
}

impl StoreError {
    pub(crate) fn lance(op: &'static str) -> impl FnOnce(lancedb::Error) -> StoreError {
        move |source| StoreError::Lance { op, source }
    }
}
