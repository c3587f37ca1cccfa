//! Workspace enumeration.

use std::path::{Component, Path, PathBuf};

use code_chunker::ChunkerConfig;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Indexable files under `root`, sorted by path. Ignored directories are
/// pruned, not just filtered.
pub(crate) fn collect_files(root: &Path, cfg: &ChunkerConfig) -> Vec<PathBuf> {
    let keep = |e: &DirEntry| {
        e.depth() == 0
            || !e.file_type().is_dir()
            || !cfg.should_ignore_dir(&e.file_name().to_string_lossy())
    };

    let mut out = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(keep)
    {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                warn!(target: "index_service::scan", error = %err, "walk error; skipping entry");
                continue;
            }
        };
        if entry.file_type().is_file() && cfg.should_index_file(entry.path()) {
            out.push(entry.into_path());
        }
    }
    debug!(target: "index_service::scan", root = %root.display(), files = out.len(), "scan done");
    out
}

/// True when any directory between `root` and `file` is ignored.
pub(crate) fn in_ignored_dir(file: &Path, root: &Path, cfg: &ChunkerConfig) -> bool {
    let rel = file.strip_prefix(root).unwrap_or(file);
    let Some(parent) = rel.parent() else {
        return false;
    };
    parent.components().any(|c| match c {
        Component::Normal(name) => cfg.should_ignore_dir(&name.to_string_lossy()),
        _ => false,
    })
}
