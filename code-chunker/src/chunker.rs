//! Line-window chunking.
//!
//! Small files become a single `file` chunk. Larger files are cut into
//! overlapping windows of `chunk_size` lines that advance by
//! `chunk_size - chunk_overlap`; the last window always reaches the final line.

use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::{debug, trace};

use crate::config::ChunkerConfig;
use crate::symbols::extract_symbols;
use crate::types::{ChunkType, CodeChunk};

/// Files up to `chunk_size * SINGLE_CHUNK_FACTOR` lines are never split.
const SINGLE_CHUNK_FACTOR: f64 = 1.5;

/// Split one file into chunks.
///
/// `content` is the already-read file text. Whitespace-only content yields no
/// chunks. Never fails; an invalid window (see [`ChunkerConfig::validate`]) is
/// clamped so the loop always makes progress.
pub fn chunk_file(
    file_path: &Path,
    content: &str,
    workspace_root: &Path,
    config: &ChunkerConfig,
) -> Vec<CodeChunk> {
    let file_hash = sha256_hex(content);
    let path_str = file_path.to_string_lossy().to_string();
    let rel = relative_path(file_path, workspace_root);
    let language = language_of(file_path);

    if content.trim().is_empty() {
        trace!(target: "code_chunker", file = %rel, "empty file; no chunks");
        return Vec::new();
    }

    let lines: Vec<&str> = content.lines().collect();
    let total = lines.len();
    let chunk_size = config.chunk_size.max(1);

    let make = |start: usize, end: usize, text: String, chunk_type: ChunkType| CodeChunk {
        id: chunk_id(&path_str, start),
        file_path: path_str.clone(),
        relative_path: rel.clone(),
        file_hash: file_hash.clone(),
        symbols: extract_symbols(&text),
        content: text,
        start_line: start,
        end_line: end,
        chunk_type,
        language: language.clone(),
    };

    if (total as f64) <= chunk_size as f64 * SINGLE_CHUNK_FACTOR {
        trace!(target: "code_chunker", file = %rel, lines = total, "single file chunk");
        return vec![make(1, total, content.to_string(), ChunkType::File)];
    }

    let step = chunk_size.saturating_sub(config.chunk_overlap).max(1);
    let mut out = Vec::with_capacity(total / step + 1);
    let mut start = 0usize;

    loop {
        let end = (start + chunk_size).min(total);
        let text = lines[start..end].join("\n");

        // Ids derive from the line offset, so skipping a blank window is safe.
        if !text.trim().is_empty() {
            out.push(make(start + 1, end, text, ChunkType::Block));
        }

        if end >= total {
            break;
        }
        start += step;
    }

    debug!(
        target: "code_chunker",
        file = %rel,
        lines = total,
        chunks = out.len(),
        chunk_size,
        overlap = config.chunk_overlap,
        "chunk_file: sliced"
    );
    out
}

/// Lowercase hex SHA-256 of a string.
pub fn sha256_hex(s: &str) -> String {
    let mut h = Sha256::new();
    h.update(s.as_bytes());
    format!("{:x}", h.finalize())
}

/// Stable chunk id built from the file path and the 1-based start line.
pub fn chunk_id(file_path: &str, start_line: usize) -> String {
    format!("{file_path}:{start_line}")
}

/// Workspace-relative path with `/` separators; falls back to the input path.
pub fn relative_path(file_path: &Path, workspace_root: &Path) -> String {
    match pathdiff::diff_paths(file_path, workspace_root).filter(|p| !p.starts_with("..")) {
        Some(rel) => rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        None => file_path.to_string_lossy().to_string(),
    }
}

fn language_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_else(|| "text".to_string())
}
