//! Adapts raw filesystem events into debounce-queue registrations.
//!
//! Observers run on background threads owned by `notify` and must never
//! block on I/O: the callback does nothing more than filter (ignore
//! check) and enqueue. The actual backup work happens later, off the
//! observer thread entirely, in the storage worker.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use coba_ignore::IgnoreFilter;
use coba_queue::DebounceQueue;
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("failed to watch filesystem: {0}")]
    Notify(#[from] notify::Error),
}

pub type Result<T> = std::result::Result<T, WatchError>;

pub struct FsEventAdapter;

impl FsEventAdapter {
    /// Starts watching every directory in `roots`, registering changed
    /// files on `queue` as they happen. Returns the live watchers; they
    /// must be kept alive for the duration of watching (dropping a
    /// watcher stops it).
    pub fn watch(
        roots: &[PathBuf],
        queue: Arc<DebounceQueue>,
        ignore: Arc<IgnoreFilter>,
    ) -> Result<Vec<RecommendedWatcher>> {
        let mut watchers = Vec::with_capacity(roots.len());
        for root in roots {
            let queue = queue.clone();
            let ignore = ignore.clone();
            let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
                match res {
                    Ok(event) => handle_event(&event, &queue, &ignore),
                    Err(err) => coba_config::log_watch_warn!(error = %err, "watch error"),
                }
            })?;
            watcher.watch(root, RecursiveMode::Recursive)?;
            watchers.push(watcher);
        }
        Ok(watchers)
    }
}

fn handle_event(event: &notify::Event, queue: &DebounceQueue, ignore: &IgnoreFilter) {
    match &event.kind {
        EventKind::Create(_) | EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => {
            for path in &event.paths {
                register_if_eligible(path, queue, ignore);
            }
        }
        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::Both => {
                if event.paths.len() == 2 {
                    register_if_eligible(&event.paths[1], queue, ignore);
                }
            }
            RenameMode::To => {
                if let Some(dest) = event.paths.first() {
                    register_if_eligible(dest, queue, ignore);
                }
            }
            // RenameMode::From is the old path disappearing; treated like a delete.
            RenameMode::From | RenameMode::Any | RenameMode::Other => {}
        },
        EventKind::Remove(_) => {
            // Deletions are not versioned; the last known content stays
            // recoverable through the version index.
        }
        EventKind::Modify(ModifyKind::Metadata(_)) | EventKind::Modify(ModifyKind::Other) | EventKind::Access(_) | EventKind::Other | EventKind::Any => {}
    }
}

fn register_if_eligible(path: &Path, queue: &DebounceQueue, ignore: &IgnoreFilter) {
    if path.is_dir() {
        return;
    }
    if ignore.is_ignored(path) {
        return;
    }
    queue.register(path.to_path_buf());
}
