//! Per-workspace index orchestrator.
//!
//! [`IndexService`] owns the vector store and the status board, and talks to
//! its worker only through channels. Worker events are split in two lanes:
//! progress is applied as soon as it arrives, while store writes (and the
//! terminal `complete`/`error`) go through a single FIFO writer task so the
//! final status is published only after every earlier batch is persisted.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::Utc;
use code_chunker::IndexedChunk;
use embedding_service::{ConnectionReport, EmbeddingClient, EmbeddingConfig, EmbeddingConfigPatch};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use vector_store::{SearchHit, StoreStats, VectorStore};

use crate::config::{IndexConfig, IndexSettings};
use crate::errors::{IndexError, Result};
use crate::protocol::{WorkerCommand, WorkerEvent};
use crate::scan::in_ignored_dir;
use crate::status::{IndexStatus, StatusBoard};
use crate::worker;

/// Store mutations, applied strictly in arrival order.
enum WriteOp {
    Append(Vec<IndexedChunk>),
    File {
        file_path: String,
        deleted: bool,
        chunks: Vec<IndexedChunk>,
    },
    FileFailed {
        file_path: String,
        error: String,
    },
    Complete,
    Failed(String),
    WorkerGone,
}

struct WorkerLink {
    commands: UnboundedSender<WorkerCommand>,
    stop: Arc<AtomicBool>,
    pump: JoinHandle<()>,
    writer: JoinHandle<()>,
}

/// Identifies one worker link. Terminal events from a link that has been
/// replaced must not touch the status of the run its successor owns.
#[derive(Clone)]
struct LinkTag {
    generation: u64,
    current: Arc<AtomicU64>,
}

impl LinkTag {
    fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.generation
    }
}

pub struct IndexService {
    workspace: PathBuf,
    settings: IndexSettings,
    config: RwLock<IndexConfig>,
    store: Arc<Mutex<VectorStore>>,
    status: Arc<StatusBoard>,
    initialized: AtomicBool,
    worker: Mutex<Option<WorkerLink>>,
    generation: Arc<AtomicU64>,
    search_client: Mutex<Option<Arc<EmbeddingClient>>>,
}

impl IndexService {
    /// Builds the service; nothing touches disk until [`Self::initialize`].
    pub fn new(workspace: impl Into<PathBuf>, config: IndexConfig, settings: IndexSettings) -> Self {
        let workspace = workspace.into();
        let store = VectorStore::new(settings.index_dir(&workspace));
        let status = StatusBoard::new(&workspace, settings.on_status.clone());
        Self {
            workspace,
            settings,
            config: RwLock::new(config),
            store: Arc::new(Mutex::new(store)),
            status: Arc::new(status),
            initialized: AtomicBool::new(false),
            worker: Mutex::new(None),
            generation: Arc::new(AtomicU64::new(0)),
            search_client: Mutex::new(None),
        }
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub async fn config(&self) -> IndexConfig {
        self.config.read().await.clone()
    }

    /// Opens the store and seeds the status from an existing index.
    ///
    /// A store that cannot be opened is left disabled and the reason is put on
    /// the status; that is not an error for the caller.
    pub async fn initialize(&self) -> Result<()> {
        let mut store = self.store.lock().await;
        match store.initialize().await {
            Ok(()) => {
                if store.has_index().await? {
                    let stats = store.get_stats().await?;
                    info!(
                        target: "index_service::service",
                        workspace = %self.workspace.display(),
                        chunks = stats.chunk_count,
                        "existing index found"
                    );
                    self.status.update(|s| {
                        s.total_chunks = stats.chunk_count;
                        s.total_files = stats.file_count;
                        s.indexed_files = stats.file_count;
                    });
                }
            }
            Err(e) => {
                warn!(
                    target: "index_service::service",
                    workspace = %self.workspace.display(),
                    error = %e,
                    "store unavailable; index disabled"
                );
                self.status.update(|s| s.error = Some(e.to_string()));
            }
        }
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Starts a full run and returns right after dispatch.
    ///
    /// Returns `Ok(false)` when a run is already in flight.
    pub async fn index_workspace(&self) -> Result<bool> {
        if !self.initialized.load(Ordering::SeqCst) {
            self.initialize().await?;
        }
        let config = self.config().await;
        config.validate()?;

        if !self.status.try_begin_run() {
            info!(target: "index_service::service", "index run already in progress; ignored");
            return Ok(false);
        }

        if let Err(e) = self.start_run(config).await {
            error!(target: "index_service::service", error = %e, "index run not started");
            self.status.update(|s| {
                s.is_indexing = false;
                s.error = Some(e.to_string());
            });
            return Err(e);
        }
        Ok(true)
    }

    async fn start_run(&self, config: IndexConfig) -> Result<()> {
        let existing_hashes = self.store.lock().await.get_file_hashes().await?;
        debug!(
            target: "index_service::service",
            known_files = existing_hashes.len(),
            "dispatching index run"
        );
        self.dispatch(WorkerCommand::Index {
            workspace_path: self.workspace.clone(),
            config,
            existing_hashes,
        })
        .await
    }

    /// Re-indexes one file (absolute or workspace-relative).
    ///
    /// Returns `Ok(false)` without dispatching when the service was never
    /// initialized or the file is filtered out.
    pub async fn update_file(&self, file: impl AsRef<Path>) -> Result<bool> {
        if !self.initialized.load(Ordering::SeqCst) {
            return Ok(false);
        }
        let file = self.absolute(file.as_ref());
        let config = self.config().await;
        if !self.accepts(&file, &config) {
            debug!(target: "index_service::service", file = %file.display(), "update filtered out");
            return Ok(false);
        }

        self.dispatch(WorkerCommand::Update {
            workspace_path: self.workspace.clone(),
            file,
            config,
        })
        .await?;
        Ok(true)
    }

    /// Absolute path keyed the way the workspace scan keys files: `.` and
    /// `..` resolved, and symlinked spellings of the workspace mapped back
    /// onto its root.
    fn absolute(&self, file: &Path) -> PathBuf {
        let joined = if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.workspace.join(file)
        };
        let lexical = normalize_lexically(&joined);
        self.rebase_on_workspace(&lexical).unwrap_or(lexical)
    }

    fn rebase_on_workspace(&self, path: &Path) -> Option<PathBuf> {
        let root = std::fs::canonicalize(&self.workspace).ok()?;
        let real = match std::fs::canonicalize(path) {
            Ok(p) => p,
            // Removed files: resolve through the parent directory.
            Err(_) => std::fs::canonicalize(path.parent()?)
                .ok()?
                .join(path.file_name()?),
        };
        let rel = real.strip_prefix(&root).ok()?;
        Some(self.workspace.join(rel))
    }

    fn accepts(&self, file: &Path, config: &IndexConfig) -> bool {
        config.chunking.should_index_file(file)
            && !in_ignored_dir(file, &self.workspace, &config.chunking)
    }

    /// Embeds `query` and returns the `top_k` closest chunks.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        if top_k == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let client = self.search_client().await;
        let vector = client.embed(query).await?;
        let hits = self.store.lock().await.search(&vector, top_k).await?;
        debug!(target: "index_service::service", top_k, hits = hits.len(), "search");
        Ok(hits)
    }

    /// Vector search over twice the requested depth, cut back to `top_k`.
    pub async fn hybrid_search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        let mut hits = self.search(query, top_k.saturating_mul(2)).await?;
        hits.truncate(top_k);
        Ok(hits)
    }

    /// Drops all rows and resets the counters.
    pub async fn clear_index(&self) -> Result<()> {
        self.store.lock().await.clear().await?;
        self.status.update(|s| {
            *s = IndexStatus {
                is_indexing: s.is_indexing,
                ..IndexStatus::default()
            }
        });
        info!(target: "index_service::service", workspace = %self.workspace.display(), "index cleared");
        Ok(())
    }

    pub fn get_status(&self) -> IndexStatus {
        self.status.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<IndexStatus> {
        self.status.subscribe()
    }

    pub async fn has_index(&self) -> Result<bool> {
        Ok(self.store.lock().await.has_index().await?)
    }

    pub async fn get_stats(&self) -> Result<StoreStats> {
        Ok(self.store.lock().await.get_stats().await?)
    }

    /// Merges `patch` into the embedding config. Later runs and searches use
    /// the new settings; a run in flight keeps the config it started with.
    pub async fn update_embedding_config(&self, patch: &EmbeddingConfigPatch) -> EmbeddingConfig {
        let mut cfg = self.config.write().await;
        cfg.embedding = cfg.embedding.merged(patch);
        info!(
            target: "index_service::service",
            provider = %cfg.embedding.provider,
            model = %cfg.embedding.resolved_model(),
            "embedding config updated"
        );
        cfg.embedding.clone()
    }

    pub async fn test_embedding_connection(&self) -> ConnectionReport {
        self.search_client().await.test_connection().await
    }

    /// Stops the worker and closes the store. A later
    /// [`Self::index_workspace`] reopens both.
    pub async fn destroy(&self) {
        if let Some(link) = self.worker.lock().await.take() {
            link.stop.store(true, Ordering::SeqCst);
            link.pump.abort();
            link.writer.abort();
        }
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.store.lock().await.close();
        self.initialized.store(false, Ordering::SeqCst);
        self.status.update(|s| s.is_indexing = false);
        debug!(target: "index_service::service", workspace = %self.workspace.display(), "service destroyed");
    }

    async fn search_client(&self) -> Arc<EmbeddingClient> {
        let embedding = self.config.read().await.embedding.clone();
        let mut cached = self.search_client.lock().await;
        match cached.as_ref() {
            Some(c) if *c.config() == embedding => Arc::clone(c),
            _ => {
                let c = Arc::new(EmbeddingClient::with_registry(
                    embedding,
                    Arc::clone(&self.settings.registry),
                ));
                *cached = Some(Arc::clone(&c));
                c
            }
        }
    }

    async fn dispatch(&self, cmd: WorkerCommand) -> Result<()> {
        let tx = self.ensure_worker().await?;
        match tx.send(cmd) {
            Ok(()) => Ok(()),
            // Worker died between the liveness check and the send.
            Err(returned) => {
                let tx = self.ensure_worker().await?;
                tx.send(returned.0).map_err(|_| IndexError::WorkerGone)
            }
        }
    }

    /// Live command sender, starting a new worker if there is none or the
    /// previous one stopped.
    async fn ensure_worker(&self) -> Result<UnboundedSender<WorkerCommand>> {
        let mut guard = self.worker.lock().await;
        if let Some(link) = guard.as_ref() {
            if !link.commands.is_closed() {
                return Ok(link.commands.clone());
            }
            warn!(target: "index_service::service", "worker stopped; starting a new one");
        }
        let link = self.start_worker()?;
        let tx = link.commands.clone();
        *guard = Some(link);
        Ok(tx)
    }

    fn start_worker(&self) -> Result<WorkerLink> {
        let (event_tx, event_rx) = unbounded_channel();
        let stop = Arc::new(AtomicBool::new(false));
        let commands = worker::spawn(
            worker::thread_name(&self.workspace),
            Arc::clone(&self.settings.registry),
            self.settings.result_batch_chunks,
            event_tx,
            Arc::clone(&stop),
        )?;

        // Retires the previous link before the new one can see a run.
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let tag = LinkTag {
            generation,
            current: Arc::clone(&self.generation),
        };

        let (op_tx, op_rx) = unbounded_channel();
        let writer = tokio::spawn(write_loop(
            Arc::clone(&self.store),
            Arc::clone(&self.status),
            tag,
            op_rx,
        ));
        let pump = tokio::spawn(pump_events(Arc::clone(&self.status), event_rx, op_tx));

        debug!(
            target: "index_service::service",
            workspace = %self.workspace.display(),
            generation,
            "worker started"
        );
        Ok(WorkerLink {
            commands,
            stop,
            pump,
            writer,
        })
    }
}

/// Routes worker events: progress straight to status, the rest to the writer.
async fn pump_events(
    status: Arc<StatusBoard>,
    mut events: UnboundedReceiver<WorkerEvent>,
    ops: UnboundedSender<WriteOp>,
) {
    let mut reported_failure = false;
    while let Some(event) = events.recv().await {
        let op = match event {
            WorkerEvent::Progress { processed, total } => {
                status.apply_progress(processed, total);
                continue;
            }
            WorkerEvent::Batch {
                chunks,
                processed,
                total,
            } => {
                status.apply_progress(processed, total);
                WriteOp::Append(chunks)
            }
            WorkerEvent::UpdateResult {
                file_path,
                error: Some(error),
                ..
            } => WriteOp::FileFailed { file_path, error },
            WorkerEvent::UpdateResult {
                file_path,
                deleted,
                chunks,
                error: None,
            } => WriteOp::File {
                file_path,
                deleted,
                chunks,
            },
            WorkerEvent::Complete => WriteOp::Complete,
            WorkerEvent::Error { error } => {
                reported_failure = true;
                WriteOp::Failed(error)
            }
        };
        if ops.send(op).is_err() {
            return;
        }
    }
    // A worker that already said why it failed has nothing more to report.
    if !reported_failure {
        let _ = ops.send(WriteOp::WorkerGone);
    }
}

/// Applies store writes one at a time, in order.
async fn write_loop(
    store: Arc<Mutex<VectorStore>>,
    status: Arc<StatusBoard>,
    tag: LinkTag,
    mut ops: UnboundedReceiver<WriteOp>,
) {
    while let Some(op) = ops.recv().await {
        match op {
            WriteOp::Append(chunks) => {
                let n = chunks.len();
                match store.lock().await.add_batch(&chunks).await {
                    Ok(()) => status.update(|s| s.total_chunks += n),
                    Err(e) => record_write_error(&status, "add_batch", &e),
                }
            }
            WriteOp::File {
                file_path,
                deleted,
                chunks,
            } => {
                let mut store = store.lock().await;
                let res = if deleted {
                    store.delete_file(&file_path).await
                } else {
                    store.upsert_file(&file_path, &chunks).await
                };
                if let Err(e) = res {
                    record_write_error(&status, "file update", &e);
                    continue;
                }
                // Outside a full run the chunk counter tracks the table.
                if !status.get().is_indexing {
                    match store.get_stats().await {
                        Ok(stats) => status.update(|s| s.total_chunks = stats.chunk_count),
                        Err(e) => warn!(target: "index_service::service", error = %e, "stats refresh failed"),
                    }
                }
            }
            WriteOp::FileFailed { file_path, error } => {
                warn!(target: "index_service::service", file = %file_path, error = %error, "file update failed");
                // A run in flight keeps its own outcome.
                status.update(|s| {
                    if !s.is_indexing {
                        s.error = Some(error);
                    }
                });
            }
            WriteOp::Failed(_) | WriteOp::WorkerGone if !tag.is_current() => {
                debug!(target: "index_service::service", generation = tag.generation, "stale worker outcome ignored");
            }
            WriteOp::Complete => {
                let stats = store.lock().await.get_stats().await;
                status.update(|s| {
                    s.is_indexing = false;
                    s.last_indexed_at = Some(Utc::now());
                    if let Ok(stats) = &stats {
                        s.total_chunks = stats.chunk_count;
                    }
                });
                let s = status.get();
                info!(
                    target: "index_service::service",
                    files = s.indexed_files,
                    chunks = s.total_chunks,
                    "index run complete"
                );
            }
            WriteOp::Failed(message) => {
                error!(target: "index_service::service", error = %message, "worker reported failure");
                status.update(|s| {
                    s.is_indexing = false;
                    s.error = Some(message);
                });
            }
            WriteOp::WorkerGone => {
                status.update(|s| {
                    if s.is_indexing {
                        s.is_indexing = false;
                        s.error = Some(IndexError::WorkerGone.to_string());
                    }
                });
            }
        }
    }
}

/// Resolves `.` and `..` without touching the filesystem.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for c in path.components() {
        match c {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push(c);
                }
            }
            other => out.push(other),
        }
    }
    out
}

fn record_write_error(status: &StatusBoard, op: &str, e: &vector_store::StoreError) {
    error!(target: "index_service::service", op, error = %e, "store write failed");
    let message = e.to_string();
    status.update(|s| s.error = Some(message));
}
