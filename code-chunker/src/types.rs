//! Chunk data model shared by the chunker, the vector store and the indexer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ChunkerError;

/// How a chunk was cut out of its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    /// The whole (small) file as a single chunk.
    File,
    /// A line window sliced out of a larger file.
    Block,
}

impl ChunkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkType::File => "file",
            ChunkType::Block => "block",
        }
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChunkType {
    type Err = ChunkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(ChunkType::File),
            "block" => Ok(ChunkType::Block),
            other => Err(ChunkerError::UnknownChunkType(other.to_string())),
        }
    }
}

/// A contiguous slice of a source file treated as one indexable unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeChunk {
    /// Stable id derived from `(file_path, start_line)`.
    pub id: String,
    /// Absolute path of the source file.
    pub file_path: String,
    /// Workspace-relative path, `/` separated.
    pub relative_path: String,
    /// SHA-256 hex of the entire file at chunking time.
    pub file_hash: String,
    pub content: String,
    /// 1-based, inclusive.
    pub start_line: usize,
    /// 1-based, inclusive.
    pub end_line: usize,
    pub chunk_type: ChunkType,
    /// Best-effort language tag (the lowercase file extension).
    pub language: String,
    /// Declared names found in the chunk, in order of appearance.
    #[serde(default)]
    pub symbols: Vec<String>,
}

/// A chunk together with its embedding vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedChunk {
    #[serde(flatten)]
    pub chunk: CodeChunk,
    pub vector: Vec<f32>,
}

impl IndexedChunk {
    pub fn new(chunk: CodeChunk, vector: Vec<f32>) -> Self {
        Self { chunk, vector }
    }
}
