//! Public entrypoints for splitting workspace files into indexable chunks.
//!
//! The crate is pure and synchronous: callers read files themselves and pass
//! the text in. Every chunk carries the SHA-256 fingerprint of the whole file
//! so the indexer can skip unchanged files on the next run.

mod chunker;
pub mod config;
pub mod errors;
mod symbols;
pub mod types;

pub use chunker::{chunk_file, chunk_id, relative_path, sha256_hex};
pub use config::ChunkerConfig;
pub use errors::{ChunkerError, Result};
pub use symbols::extract_symbols;
pub use types::{ChunkType, CodeChunk, IndexedChunk};
