//! Chunking knobs and the file/directory filters derived from them.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{ChunkerError, Result};

const DEFAULT_INCLUDED_EXTS: &[&str] = &[
    "rs", "ts", "tsx", "js", "jsx", "mjs", "cjs", "py", "go", "java", "kt", "kts", "swift", "c",
    "h", "cc", "cpp", "hpp", "cs", "rb", "php", "dart", "scala", "vue", "svelte", "sql", "sh",
    "md", "json", "yaml", "yml", "toml",
];

const DEFAULT_IGNORED_DIRS: &[&str] = &[
    "node_modules",
    "target",
    "dist",
    "build",
    "out",
    "vendor",
    "coverage",
    "__pycache__",
    "venv",
];

/// Line-window chunking parameters plus the workspace filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Window height in lines.
    pub chunk_size: usize,
    /// Lines shared by consecutive windows; must stay below `chunk_size`.
    pub chunk_overlap: usize,
    /// Extensions to index, stored lowercase without the leading dot.
    pub included_exts: BTreeSet<String>,
    /// Directory names that are never descended into.
    pub ignored_dirs: BTreeSet<String>,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 50,
            chunk_overlap: 10,
            included_exts: DEFAULT_INCLUDED_EXTS.iter().map(|e| e.to_string()).collect(),
            ignored_dirs: DEFAULT_IGNORED_DIRS.iter().map(|d| d.to_string()).collect(),
        }
    }
}

impl ChunkerConfig {
    /// Builds a config with the given window and the default filters.
    pub fn with_window(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            ..Self::default()
        }
    }

    /// Replaces the extension filter; entries may carry a leading dot.
    pub fn with_extensions<I, S>(mut self, exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.included_exts = exts
            .into_iter()
            .map(|e| normalize_ext(e.as_ref()))
            .filter(|e| !e.is_empty())
            .collect();
        self
    }

    /// Replaces the ignored directory names.
    pub fn with_ignored_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ignored_dirs = dirs
            .into_iter()
            .map(|d| d.as_ref().trim().to_string())
            .filter(|d| !d.is_empty())
            .collect();
        self
    }

    /// Checks `0 < chunk_size` and `chunk_overlap < chunk_size`.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ChunkerError::InvalidConfig("chunk_size must be > 0".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ChunkerError::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    /// True iff the file extension is one of `included_exts`.
    pub fn should_index_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.included_exts.contains(&normalize_ext(e)))
            .unwrap_or(false)
    }

    /// True iff the directory is listed in `ignored_dirs` or is hidden.
    pub fn should_ignore_dir(&self, name: &str) -> bool {
        name.starts_with('.') || self.ignored_dirs.contains(name)
    }
}

fn normalize_ext(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}
