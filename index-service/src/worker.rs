//! Background worker.
//!
//! Each service owns one worker: a dedicated OS thread driving its own
//! current-thread Tokio runtime. It receives [`WorkerCommand`]s and answers
//! with [`WorkerEvent`]s; it never touches the store or the status directly.

use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use code_chunker::{CodeChunk, IndexedChunk, chunk_file, sha256_hex};
use embedding_service::{EmbeddingClient, EmbeddingConfig, ProviderRegistry};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, error, info, warn};

use crate::config::IndexConfig;
use crate::errors::{IndexError, Result};
use crate::protocol::{WorkerCommand, WorkerEvent};
use crate::scan::collect_files;

/// Files between two progress events during a full run.
const PROGRESS_EVERY_FILES: usize = 25;

/// Starts a worker thread and returns its command sender.
///
/// The thread exits when the command sender is dropped, when the event
/// receiver goes away, or when `stop` is raised (checked between files).
pub(crate) fn spawn(
    name: String,
    registry: Arc<ProviderRegistry>,
    result_batch_chunks: usize,
    events: UnboundedSender<WorkerEvent>,
    stop: Arc<AtomicBool>,
) -> Result<UnboundedSender<WorkerCommand>> {
    let (tx, rx) = unbounded_channel();
    let last_words = events.clone();
    let worker = Worker {
        events,
        registry,
        result_batch_chunks: result_batch_chunks.max(1),
        client: None,
        stop,
    };

    std::thread::Builder::new()
        .name(name.clone())
        .spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    let _ = last_words.send(WorkerEvent::Error {
                        error: format!("[Index Service] worker runtime failed: {e}"),
                    });
                    return;
                }
            };
            // The command receiver is dropped during unwinding, so the error
            // below always arrives after the channel reads as closed.
            let run = std::panic::catch_unwind(AssertUnwindSafe(|| rt.block_on(worker.run(rx))));
            if run.is_err() {
                error!(target: "index_service::worker", thread = %name, "worker panicked");
                let _ = last_words.send(WorkerEvent::Error {
                    error: "[Index Service] worker panicked".to_string(),
                });
                return;
            }
            debug!(target: "index_service::worker", thread = %name, "worker stopped");
        })
        .map_err(IndexError::WorkerSpawn)?;

    Ok(tx)
}

struct Worker {
    events: UnboundedSender<WorkerEvent>,
    registry: Arc<ProviderRegistry>,
    result_batch_chunks: usize,
    /// Reused while the embedding config stays the same.
    client: Option<Arc<EmbeddingClient>>,
    stop: Arc<AtomicBool>,
}

impl Worker {
    async fn run(mut self, mut commands: UnboundedReceiver<WorkerCommand>) {
        while let Some(cmd) = commands.recv().await {
            if self.stopped() {
                break;
            }
            let outcome = match cmd {
                WorkerCommand::Index {
                    workspace_path,
                    config,
                    existing_hashes,
                } => {
                    let res = self.index(&workspace_path, &config, &existing_hashes).await;
                    res.and_then(|()| self.emit(WorkerEvent::Complete))
                }
                WorkerCommand::Update {
                    workspace_path,
                    file,
                    config,
                } => match self.update(&workspace_path, &file, &config).await {
                    Err(IndexError::WorkerGone) => Err(IndexError::WorkerGone),
                    // File-scoped: never ends a full run that may be in flight.
                    Err(e) => {
                        warn!(target: "index_service::worker", file = %file.display(), error = %e, "update failed");
                        self.emit(WorkerEvent::UpdateResult {
                            file_path: file.to_string_lossy().to_string(),
                            deleted: false,
                            chunks: Vec::new(),
                            error: Some(e.to_string()),
                        })
                    }
                    Ok(()) => Ok(()),
                },
            };

            match outcome {
                Ok(()) => {}
                Err(IndexError::WorkerGone) => {
                    debug!(target: "index_service::worker", "orchestrator gone; stopping");
                    return;
                }
                Err(e) => {
                    warn!(target: "index_service::worker", error = %e, "command failed");
                    if self.emit(WorkerEvent::Error { error: e.to_string() }).is_err() {
                        return;
                    }
                }
            }
        }
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    fn emit(&self, event: WorkerEvent) -> Result<()> {
        self.events.send(event).map_err(|_| IndexError::WorkerGone)
    }

    fn client(&mut self, cfg: &EmbeddingConfig) -> Arc<EmbeddingClient> {
        match &self.client {
            Some(c) if c.config() == cfg => Arc::clone(c),
            _ => {
                let c = Arc::new(EmbeddingClient::with_registry(
                    cfg.clone(),
                    Arc::clone(&self.registry),
                ));
                self.client = Some(Arc::clone(&c));
                c
            }
        }
    }

    /// Full run: scan, skip unchanged files, embed and emit whole-file batches.
    async fn index(
        &mut self,
        workspace: &Path,
        config: &IndexConfig,
        existing: &HashMap<String, String>,
    ) -> Result<()> {
        let files = collect_files(workspace, &config.chunking);
        let total = files.len();
        info!(
            target: "index_service::worker",
            workspace = %workspace.display(),
            files = total,
            known = existing.len(),
            "index run started"
        );
        self.emit(WorkerEvent::Progress {
            processed: 0,
            total: Some(total),
        })?;

        let present: HashSet<String> = files
            .iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect();
        for stale in existing.keys().filter(|k| !present.contains(*k)) {
            debug!(target: "index_service::worker", file = %stale, "file gone; dropping rows");
            self.emit(deleted(stale.clone()))?;
        }

        let client = self.client(&config.embedding);
        let mut queue: Vec<CodeChunk> = Vec::new();
        // Changed files whose old rows are dropped once their new chunks are embedded.
        let mut replaced: Vec<String> = Vec::new();
        let mut skipped = 0usize;
        let mut unreadable = 0usize;

        for (i, path) in files.iter().enumerate() {
            if self.stopped() {
                debug!(target: "index_service::worker", "stop requested; abandoning run");
                return Err(IndexError::WorkerGone);
            }
            let processed = i + 1;
            let key = path.to_string_lossy().to_string();

            match tokio::fs::read_to_string(path).await {
                Err(e) => {
                    warn!(target: "index_service::worker", file = %key, error = %e, "unreadable; skipped");
                    unreadable += 1;
                }
                Ok(content) => {
                    let hash = sha256_hex(&content);
                    match existing.get(&key) {
                        Some(old) if *old == hash => skipped += 1,
                        known => {
                            if known.is_some() {
                                replaced.push(key.clone());
                            }
                            queue.extend(chunk_file(path, &content, workspace, &config.chunking));
                        }
                    }
                }
            }

            if queue.len() >= self.result_batch_chunks {
                let chunks = embed_chunks(&client, std::mem::take(&mut queue)).await?;
                self.emit_batch(std::mem::take(&mut replaced), chunks, processed, total)?;
            } else if processed % PROGRESS_EVERY_FILES == 0 {
                self.emit(WorkerEvent::Progress {
                    processed,
                    total: Some(total),
                })?;
            }
        }

        if !queue.is_empty() || !replaced.is_empty() {
            let chunks = embed_chunks(&client, queue).await?;
            self.emit_batch(replaced, chunks, total, total)?;
        }
        self.emit(WorkerEvent::Progress {
            processed: total,
            total: Some(total),
        })?;

        info!(
            target: "index_service::worker",
            files = total,
            skipped,
            unreadable,
            "index run finished"
        );
        Ok(())
    }

    /// Deletes for `replaced` files, then the batch holding their new rows.
    /// Nothing is emitted for a file before its embeddings exist.
    fn emit_batch(
        &self,
        replaced: Vec<String>,
        chunks: Vec<IndexedChunk>,
        processed: usize,
        total: usize,
    ) -> Result<()> {
        for file_path in replaced {
            self.emit(deleted(file_path))?;
        }
        if chunks.is_empty() {
            return Ok(());
        }
        self.emit(WorkerEvent::Batch {
            chunks,
            processed,
            total: Some(total),
        })
    }

    async fn update(&mut self, workspace: &Path, file: &Path, config: &IndexConfig) -> Result<()> {
        let file_path = file.to_string_lossy().to_string();

        if !tokio::fs::try_exists(file).await.unwrap_or(false) {
            debug!(target: "index_service::worker", file = %file_path, "file removed");
            return self.emit(deleted(file_path));
        }

        let content = tokio::fs::read_to_string(file)
            .await
            .map_err(|source| IndexError::Io {
                path: file_path.clone(),
                source,
            })?;
        let chunks = chunk_file(file, &content, workspace, &config.chunking);
        let client = self.client(&config.embedding);
        let chunks = embed_chunks(&client, chunks).await?;

        debug!(target: "index_service::worker", file = %file_path, chunks = chunks.len(), "file updated");
        self.emit(WorkerEvent::UpdateResult {
            file_path,
            deleted: false,
            chunks,
            error: None,
        })
    }
}

fn deleted(file_path: String) -> WorkerEvent {
    WorkerEvent::UpdateResult {
        file_path,
        deleted: true,
        chunks: Vec::new(),
        error: None,
    }
}

/// Embedding input: relative path on the first line, then the chunk text.
pub(crate) fn embed_text(chunk: &CodeChunk) -> String {
    format!("{}\n{}", chunk.relative_path, chunk.content)
}

async fn embed_chunks(client: &EmbeddingClient, chunks: Vec<CodeChunk>) -> Result<Vec<IndexedChunk>> {
    if chunks.is_empty() {
        return Ok(Vec::new());
    }
    let texts: Vec<String> = chunks.iter().map(embed_text).collect();
    let vectors = client.embed_batch(&texts).await?;
    Ok(chunks
        .into_iter()
        .zip(vectors)
        .map(|(chunk, vector)| IndexedChunk::new(chunk, vector))
        .collect())
}

/// Name for a workspace's worker thread.
pub(crate) fn thread_name(workspace: &Path) -> String {
    let leaf = workspace
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "root".to_string());
    format!("index-worker-{leaf}")
}
