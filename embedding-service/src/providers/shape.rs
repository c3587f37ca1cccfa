//! Response shapes shared by more than one backend.

use serde::Deserialize;

use crate::config::provider_kind::ProviderKind;
use crate::error_handler::{EmbeddingError, Result};

/// `{"data": [{"index": n, "embedding": [...]}, ...]}` as used by the
/// OpenAI-compatible endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct IndexedDataResponse {
    pub data: Vec<IndexedEmbedding>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IndexedEmbedding {
    #[serde(default)]
    pub index: usize,
    pub embedding: Vec<f32>,
}

impl IndexedDataResponse {
    /// Vectors reordered by `index`; the count must equal `want`.
    pub(crate) fn into_ordered(self, provider: ProviderKind, want: usize) -> Result<Vec<Vec<f32>>> {
        let mut data = self.data;
        if data.len() != want {
            return Err(EmbeddingError::CountMismatch {
                provider,
                got: data.len(),
                want,
            });
        }
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

pub(crate) fn check_count(provider: ProviderKind, got: usize, want: usize) -> Result<()> {
    if got == want {
        Ok(())
    } else {
        Err(EmbeddingError::CountMismatch {
            provider,
            got,
            want,
        })
    }
}
