//! Per-workspace indexing status and its broadcast.
//!
//! Status lives in a `tokio::sync::watch` channel so hosts can poll it or
//! await changes. Every change is also handed to the optional host callback.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::config::StatusCallback;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStatus {
    pub is_indexing: bool,
    pub total_files: usize,
    pub indexed_files: usize,
    pub total_chunks: usize,
    pub last_indexed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// Single owner of a workspace's [`IndexStatus`].
pub(crate) struct StatusBoard {
    workspace: PathBuf,
    tx: watch::Sender<IndexStatus>,
    callback: Option<StatusCallback>,
}

impl StatusBoard {
    pub(crate) fn new(workspace: &Path, callback: Option<StatusCallback>) -> Self {
        let (tx, _rx) = watch::channel(IndexStatus::default());
        Self {
            workspace: workspace.to_path_buf(),
            tx,
            callback,
        }
    }

    pub(crate) fn get(&self) -> IndexStatus {
        self.tx.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<IndexStatus> {
        self.tx.subscribe()
    }

    /// Applies `f` and broadcasts the result.
    pub(crate) fn update(&self, f: impl FnOnce(&mut IndexStatus)) {
        self.tx.send_modify(f);
        self.notify();
    }

    /// Atomically flips to a fresh running status unless a run is in flight.
    /// Returns `false` when a run was already in progress.
    pub(crate) fn try_begin_run(&self) -> bool {
        let started = self.tx.send_if_modified(|s| {
            if s.is_indexing {
                return false;
            }
            *s = IndexStatus {
                is_indexing: true,
                last_indexed_at: s.last_indexed_at,
                ..IndexStatus::default()
            };
            true
        });
        if started {
            self.notify();
        }
        started
    }

    /// Counters from a worker progress report; they never move backwards.
    pub(crate) fn apply_progress(&self, processed: usize, total: Option<usize>) {
        let changed = self.tx.send_if_modified(|s| {
            if !s.is_indexing {
                return false;
            }
            let before = (s.indexed_files, s.total_files);
            s.indexed_files = s.indexed_files.max(processed);
            if let Some(total) = total {
                s.total_files = s.total_files.max(total);
            }
            before != (s.indexed_files, s.total_files)
        });
        if changed {
            self.notify();
        }
    }

    fn notify(&self) {
        if let Some(cb) = &self.callback {
            let snapshot = self.get();
            cb(&self.workspace, &snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn second_run_is_refused_while_indexing() {
        let board = StatusBoard::new(Path::new("/ws"), None);
        assert!(board.try_begin_run());
        assert!(!board.try_begin_run());
        board.update(|s| s.is_indexing = false);
        assert!(board.try_begin_run());
    }

    #[test]
    fn begin_run_resets_counters_and_error() {
        let board = StatusBoard::new(Path::new("/ws"), None);
        board.update(|s| {
            s.total_chunks = 9;
            s.error = Some("boom".into());
        });
        board.try_begin_run();
        let s = board.get();
        assert_eq!(s.total_chunks, 0);
        assert!(s.error.is_none());
        assert!(s.is_indexing);
    }

    #[test]
    fn progress_is_monotonic_and_ignored_when_idle() {
        let board = StatusBoard::new(Path::new("/ws"), None);
        board.apply_progress(3, Some(10));
        assert_eq!(board.get().indexed_files, 0);

        board.try_begin_run();
        board.apply_progress(5, Some(10));
        board.apply_progress(4, None);
        let s = board.get();
        assert_eq!(s.indexed_files, 5);
        assert_eq!(s.total_files, 10);
    }

    #[test]
    fn callback_sees_every_change() {
        let seen: Arc<Mutex<Vec<IndexStatus>>> = Arc::default();
        let sink = Arc::clone(&seen);
        let cb: StatusCallback = Arc::new(move |ws, s| {
            assert_eq!(ws, Path::new("/ws"));
            sink.lock().unwrap().push(s.clone());
        });
        let board = StatusBoard::new(Path::new("/ws"), Some(cb));
        board.try_begin_run();
        board.apply_progress(1, Some(1));
        board.update(|s| s.is_indexing = false);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(seen[0].is_indexing);
        assert!(!seen[2].is_indexing);
    }
}
