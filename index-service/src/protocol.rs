//! Messages between the orchestrator and its worker.
//!
//! Serialized as JSON objects tagged by `type` (snake_case), so the same
//! shapes can be logged or carried over a process boundary.

use std::collections::HashMap;
use std::path::PathBuf;

use code_chunker::IndexedChunk;
use serde::{Deserialize, Serialize};

use crate::config::IndexConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerCommand {
    /// Full run. `existing_hashes` maps absolute file paths to the hash
    /// currently stored for them.
    Index {
        workspace_path: PathBuf,
        config: IndexConfig,
        existing_hashes: HashMap<String, String>,
    },
    /// Re-index a single file.
    Update {
        workspace_path: PathBuf,
        file: PathBuf,
        config: IndexConfig,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerEvent {
    Progress {
        processed: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        total: Option<usize>,
    },
    /// Embedded chunks of whole files, to append.
    #[serde(rename = "result")]
    Batch {
        chunks: Vec<IndexedChunk>,
        processed: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        total: Option<usize>,
    },
    /// Replacement rows for one file, or its removal. With `error` set the
    /// file could not be processed and its stored rows stay as they are.
    UpdateResult {
        file_path: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        deleted: bool,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        chunks: Vec<IndexedChunk>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Complete,
    Error {
        error: String,
    },
}
