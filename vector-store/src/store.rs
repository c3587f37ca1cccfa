//! LanceDB-backed store for embedded chunks.
//!
//! State is explicit: a store that failed to open (or was closed) is
//! [`StoreState::Disabled`] and every operation becomes a no-op returning
//! empty results. Writes are not locked internally.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use arrow_array::RecordBatchIterator;
use code_chunker::IndexedChunk;
use futures::StreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::connection::Connection;
use lancedb::{DistanceType, Table};
use tracing::{debug, info, warn};

use crate::errors::{Result, StoreError};
use crate::schema::{
    TABLE_NAME, VECTOR_COLUMN, batch_to_file_hashes, batch_to_hits, chunks_to_batch, quote_literal,
    vector_dim,
};
use crate::types::{SearchHit, StoreStats};

enum StoreState {
    Disabled,
    Ready {
        connection: Connection,
        /// `None` until the first write creates the table.
        table: Option<Table>,
    },
}

pub struct VectorStore {
    path: PathBuf,
    state: StoreState,
    /// Vector length of the current table.
    dim: Option<usize>,
}

impl VectorStore {
    /// Store rooted at `path`; nothing is opened until [`Self::initialize`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: StoreState::Disabled,
            dim: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, StoreState::Ready { .. })
    }

    /// Creates the directory, connects and opens `code_chunks` if present.
    ///
    /// On failure the store stays disabled and the error is returned so the
    /// caller can report it.
    pub async fn initialize(&mut self) -> Result<()> {
        match self.open().await {
            Ok((connection, table, dim)) => {
                info!(
                    target: "vector_store",
                    path = %self.path.display(),
                    has_table = table.is_some(),
                    dim,
                    "vector store ready"
                );
                self.state = StoreState::Ready { connection, table };
                self.dim = dim;
                Ok(())
            }
            Err(e) => {
                warn!(target: "vector_store", path = %self.path.display(), error = %e, "vector store disabled");
                self.state = StoreState::Disabled;
                self.dim = None;
                Err(e)
            }
        }
    }

    async fn open(&self) -> Result<(Connection, Option<Table>, Option<usize>)> {
        tokio::fs::create_dir_all(&self.path)
            .await
            .map_err(|source| StoreError::Io {
                path: self.path.clone(),
                source,
            })?;

        let uri = self.path.to_string_lossy().to_string();
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(StoreError::lance("connect"))?;

        let names = connection
            .table_names()
            .execute()
            .await
            .map_err(StoreError::lance("table_names"))?;
        if !names.iter().any(|n| n == TABLE_NAME) {
            return Ok((connection, None, None));
        }

        let table = connection
            .open_table(TABLE_NAME)
            .execute()
            .await
            .map_err(StoreError::lance("open_table"))?;
        let schema = table.schema().await.map_err(StoreError::lance("schema"))?;
        let dim = vector_dim(&schema);
        Ok((connection, Some(table), dim))
    }

    fn table(&self) -> Option<&Table> {
        match &self.state {
            StoreState::Ready { table, .. } => table.as_ref(),
            StoreState::Disabled => None,
        }
    }

    async fn count_rows(&self) -> Result<usize> {
        match self.table() {
            Some(t) => t.count_rows(None).await.map_err(StoreError::lance("count_rows")),
            None => Ok(0),
        }
    }

    /// True when the table exists and holds at least one row.
    pub async fn has_index(&self) -> Result<bool> {
        Ok(self.count_rows().await? > 0)
    }

    pub async fn get_stats(&self) -> Result<StoreStats> {
        Ok(StoreStats::from_chunk_count(self.count_rows().await?))
    }

    /// `file_path -> file_hash`; when a path has several rows the first wins.
    pub async fn get_file_hashes(&self) -> Result<HashMap<String, String>> {
        let Some(table) = self.table() else {
            return Ok(HashMap::new());
        };
        let rows = self.count_rows().await?;
        if rows == 0 {
            return Ok(HashMap::new());
        }

        let mut stream = table
            .query()
            .select(Select::Columns(vec![
                "file_path".to_string(),
                "file_hash".to_string(),
            ]))
            .limit(rows)
            .execute()
            .await
            .map_err(StoreError::lance("query"))?;

        let mut out = HashMap::new();
        while let Some(batch) = stream.next().await {
            let batch = batch.map_err(StoreError::lance("query"))?;
            for (path, hash) in batch_to_file_hashes(&batch)? {
                out.entry(path).or_insert(hash);
            }
        }
        debug!(target: "vector_store", files = out.len(), "loaded file hashes");
        Ok(out)
    }

    /// Replaces the whole table with `chunks`. Empty input is a no-op.
    pub async fn create_index(&mut self, chunks: &[IndexedChunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        self.drop_table().await?;
        self.add_batch(chunks).await
    }

    /// Appends rows, creating the table from this batch when it is missing.
    pub async fn add_batch(&mut self, chunks: &[IndexedChunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        let StoreState::Ready { connection, table } = &mut self.state else {
            return Ok(());
        };

        let dim = self.dim.unwrap_or(chunks[0].vector.len());
        if let Some(bad) = chunks.iter().find(|c| c.vector.len() != dim) {
            return Err(StoreError::DimensionMismatch {
                expected: dim,
                got: bad.vector.len(),
            });
        }

        let batch = chunks_to_batch(chunks, dim)?;
        let schema = batch.schema();
        let reader = RecordBatchIterator::new(vec![Ok(batch)], schema);

        match table {
            Some(t) => {
                t.add(reader)
                    .execute()
                    .await
                    .map_err(StoreError::lance("add"))?;
            }
            None => {
                let created = connection
                    .create_table(TABLE_NAME, reader)
                    .execute()
                    .await
                    .map_err(StoreError::lance("create_table"))?;
                info!(target: "vector_store", dim, "created table {TABLE_NAME}");
                *table = Some(created);
                self.dim = Some(dim);
            }
        }
        debug!(target: "vector_store", rows = chunks.len(), "add_batch");
        Ok(())
    }

    /// Deletes the file's rows, then appends `chunks`.
    ///
    /// The two steps are separate commits: a concurrent search may briefly see
    /// no rows for this file.
    pub async fn upsert_file(&mut self, file_path: &str, chunks: &[IndexedChunk]) -> Result<()> {
        self.delete_file(file_path).await?;
        self.add_batch(chunks).await
    }

    /// Deletes every row of `file_path`. Missing rows are not an error.
    pub async fn delete_file(&mut self, file_path: &str) -> Result<()> {
        let Some(table) = self.table() else {
            return Ok(());
        };
        let predicate = format!("file_path = {}", quote_literal(file_path));
        table
            .delete(&predicate)
            .await
            .map_err(StoreError::lance("delete"))?;
        debug!(target: "vector_store", file = file_path, "deleted file rows");
        Ok(())
    }

    /// Nearest rows by cosine distance, best first, `score = 1 - distance`.
    pub async fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        let Some(table) = self.table() else {
            return Ok(Vec::new());
        };
        if top_k == 0 || query.is_empty() {
            return Ok(Vec::new());
        }
        match self.dim {
            Some(dim) if dim != query.len() => {
                return Err(StoreError::DimensionMismatch {
                    expected: dim,
                    got: query.len(),
                });
            }
            _ => {}
        }

        let mut stream = table
            .vector_search(query.to_vec())
            .map_err(StoreError::lance("vector_search"))?
            .column(VECTOR_COLUMN)
            .distance_type(DistanceType::Cosine)
            .limit(top_k)
            .execute()
            .await
            .map_err(StoreError::lance("vector_search"))?;

        let mut hits = Vec::new();
        while let Some(batch) = stream.next().await {
            let batch = batch.map_err(StoreError::lance("vector_search"))?;
            hits.extend(batch_to_hits(&batch)?);
        }
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(top_k);
        Ok(hits)
    }

    /// Drops the table; the next write recreates it.
    pub async fn clear(&mut self) -> Result<()> {
        self.drop_table().await?;
        info!(target: "vector_store", path = %self.path.display(), "index cleared");
        Ok(())
    }

    async fn drop_table(&mut self) -> Result<()> {
        let StoreState::Ready { connection, table } = &mut self.state else {
            return Ok(());
        };
        if table.take().is_none() {
            let names = connection
                .table_names()
                .execute()
                .await
                .map_err(StoreError::lance("table_names"))?;
            if !names.iter().any(|n| n == TABLE_NAME) {
                self.dim = None;
                return Ok(());
            }
        }
        connection
            .drop_table(TABLE_NAME)
            .await
            .map_err(StoreError::lance("drop_table"))?;
        self.dim = None;
        Ok(())
    }

    /// Releases the connection. Safe to call repeatedly.
    pub fn close(&mut self) {
        if self.is_ready() {
            debug!(target: "vector_store", path = %self.path.display(), "vector store closed");
        }
        self.state = StoreState::Disabled;
        self.dim = None;
    }
}
