//! Index configuration and process-level settings.
//!
//! [`IndexConfig`] travels with every worker command and is serializable.
//! [`IndexSettings`] holds things that are fixed for a service's lifetime:
//! data directory name, batch threshold, provider registry and the host's
//! status callback.

use std::path::Path;
use std::sync::Arc;

use code_chunker::ChunkerConfig;
use embedding_service::{EmbeddingConfig, ProviderRegistry};
use embedding_service::error_handler::env_opt;
use serde::{Deserialize, Serialize};

use crate::errors::{IndexError, Result};
use crate::status::IndexStatus;

/// Chunking and embedding settings for one workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    #[serde(flatten)]
    pub chunking: ChunkerConfig,
    pub embedding: EmbeddingConfig,
}

impl IndexConfig {
    pub fn new(chunking: ChunkerConfig, embedding: EmbeddingConfig) -> Self {
        Self {
            chunking,
            embedding,
        }
    }

    /// Loads from env:
    /// - `INDEX_CHUNK_SIZE` (50), `INDEX_CHUNK_OVERLAP` (10)
    /// - `INDEX_INCLUDED_EXTS`, `INDEX_IGNORED_DIRS`: comma separated, replace the defaults
    /// - `EMBEDDING_*` via [`EmbeddingConfig::from_env`]
    pub fn from_env() -> Result<Self> {
        let mut chunking = ChunkerConfig::default();
        if let Some(v) = env_usize("INDEX_CHUNK_SIZE")? {
            chunking.chunk_size = v;
        }
        if let Some(v) = env_usize("INDEX_CHUNK_OVERLAP")? {
            chunking.chunk_overlap = v;
        }
        if let Some(list) = env_opt("INDEX_INCLUDED_EXTS") {
            chunking = chunking.with_extensions(split_list(&list));
        }
        if let Some(list) = env_opt("INDEX_IGNORED_DIRS") {
            chunking = chunking.with_ignored_dirs(split_list(&list));
        }

        let cfg = Self {
            chunking,
            embedding: EmbeddingConfig::from_env()?,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        Ok(())
    }
}

/// Host hook receiving every status change of a workspace.
pub type StatusCallback = Arc<dyn Fn(&Path, &IndexStatus) + Send + Sync>;

#[derive(Clone)]
pub struct IndexSettings {
    /// Directory under the workspace root that holds `index/`.
    pub data_dir_name: String,
    /// Queued chunks that trigger a `result` batch (whole files only).
    pub result_batch_chunks: usize,
    pub registry: Arc<ProviderRegistry>,
    pub on_status: Option<StatusCallback>,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            data_dir_name: ".semindex".to_string(),
            result_batch_chunks: 200,
            registry: Arc::new(ProviderRegistry::default()),
            on_status: None,
        }
    }
}

impl IndexSettings {
    /// `INDEX_DATA_DIR` (`.semindex`), `INDEX_RESULT_BATCH_CHUNKS` (200).
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            data_dir_name: env_opt("INDEX_DATA_DIR").unwrap_or(defaults.data_dir_name),
            result_batch_chunks: env_usize("INDEX_RESULT_BATCH_CHUNKS")?
                .unwrap_or(defaults.result_batch_chunks)
                .max(1),
            ..defaults
        })
    }

    pub fn with_registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn with_status_callback<F>(mut self, f: F) -> Self
    where
        F: Fn(&Path, &IndexStatus) + Send + Sync + 'static,
    {
        self.on_status = Some(Arc::new(f));
        self
    }

    pub fn with_result_batch_chunks(mut self, n: usize) -> Self {
        self.result_batch_chunks = n.max(1);
        self
    }

    /// `<workspace>/<data_dir_name>/index`
    pub fn index_dir(&self, workspace: &Path) -> std::path::PathBuf {
        workspace.join(&self.data_dir_name).join("index")
    }
}

impl std::fmt::Debug for IndexSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexSettings")
            .field("data_dir_name", &self.data_dir_name)
            .field("result_batch_chunks", &self.result_batch_chunks)
            .field("registry", &self.registry)
            .field("on_status", &self.on_status.is_some())
            .finish()
    }
}

fn env_usize(var: &'static str) -> Result<Option<usize>> {
    match env_opt(var) {
        Some(v) => v.parse::<usize>().map(Some).map_err(|_| IndexError::Config {
            var,
            reason: format!("expected a non-negative integer, got `{v}`"),
        }),
        None => Ok(None),
    }
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_serializes_flat_chunking_fields() {
        let cfg = IndexConfig::default();
        let v = serde_json::to_value(&cfg).unwrap();
        assert_eq!(v["chunk_size"], 50);
        assert_eq!(v["chunk_overlap"], 10);
        assert_eq!(v["embedding"]["provider"], "openai");
        let back: IndexConfig = serde_json::from_value(v).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn invalid_window_is_rejected() {
        let mut cfg = IndexConfig::default();
        cfg.chunking.chunk_overlap = 50;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn list_split_drops_blanks() {
        assert_eq!(split_list(" rs, .py ,,ts"), vec!["rs", ".py", "ts"]);
    }

    #[test]
    fn index_dir_lives_under_data_dir() {
        let s = IndexSettings::default();
        assert_eq!(
            s.index_dir(Path::new("/ws")),
            Path::new("/ws/.semindex/index")
        );
    }
}
