use code_chunker::CodeChunk;
use serde::{Deserialize, Serialize};

/// Chunk-to-file ratio used to estimate `file_count` from row count.
///
/// The table has no per-file rows, so the figure is for display only.
pub const ASSUMED_CHUNKS_PER_FILE: usize = 5;

/// One nearest-neighbour result. `score = 1 - cosine_distance`, higher is closer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub chunk: CodeChunk,
    pub score: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub chunk_count: usize,
    /// Approximation: `ceil(chunk_count / ASSUMED_CHUNKS_PER_FILE)`.
    pub file_count: usize,
}

impl StoreStats {
    pub fn from_chunk_count(chunk_count: usize) -> Self {
        Self {
            chunk_count,
            file_count: chunk_count.div_ceil(ASSUMED_CHUNKS_PER_FILE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_count_rounds_up() {
        assert_eq!(StoreStats::from_chunk_count(0).file_count, 0);
        assert_eq!(StoreStats::from_chunk_count(1).file_count, 1);
        assert_eq!(StoreStats::from_chunk_count(5).file_count, 1);
        assert_eq!(StoreStats::from_chunk_count(24).file_count, 5);
    }
}
