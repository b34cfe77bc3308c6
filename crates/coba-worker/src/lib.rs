//! The storage worker: the single thread that actually turns a queued
//! path into a backed-up version.
//!
//! Work happens in four steps — copy the file aside, hash-and-store the
//! copy, record the version, remove the copy — and the removal always
//! runs, success or failure, so a crash mid-backup never leaves stray
//! temp files behind. Any error backing up one file is logged and
//! swallowed: a single bad file must never bring down the daemon.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;

use chrono::Utc;
use coba_cas::CasStore;
use coba_index::VersionIndex;
use coba_queue::DebounceQueue;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("path normalization failed: {0}")]
    Path(#[from] coba_path::PathError),

    #[error("content store error: {0}")]
    Cas(#[from] coba_cas::CasError),

    #[error("version index error: {0}")]
    Index(#[from] coba_index::IndexError),
}

pub struct StorageWorker;

impl StorageWorker {
    /// Spawns the storage worker thread. It runs until `queue.next()`
    /// returns `None`, i.e. until the queue is shut down and drained.
    /// `store_root` is where the worker stages its temporary copies, on
    /// the same filesystem as the blob store itself.
    pub fn spawn(
        queue: Arc<DebounceQueue>,
        store_root: PathBuf,
        cas: Arc<CasStore>,
        index: Arc<Mutex<VersionIndex>>,
    ) -> thread::JoinHandle<()> {
        thread::spawn(move || {
            coba_config::log_worker_info!("storage worker started");
            while let Some(path) = queue.next() {
                if let Err(err) = backup_one(&path, &store_root, &cas, &index) {
                    coba_config::log_worker_warn!(
                        path = %path.display(),
                        error = %err,
                        "backup failed, continuing"
                    );
                }
            }
            coba_config::log_worker_info!("storage worker exiting");
        })
    }
}

/// A temp file that removes itself on drop, regardless of how the scope
/// that created it was exited.
struct TempCopy {
    path: PathBuf,
}

impl Drop for TempCopy {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn backup_one(
    path: &Path,
    store_root: &Path,
    cas: &CasStore,
    index: &Mutex<VersionIndex>,
) -> Result<(), WorkerError> {
    if !path.is_file() {
        // The file vanished between being queued and being processed.
        coba_config::log_worker_debug!(path = %path.display(), "skipping, file no longer exists");
        return Ok(());
    }

    let normalized = coba_path::normalize(path)?;

    let temp_path = store_root.join(format!(
        ".coba-worker-{}-{}-{}",
        std::process::id(),
        thread_id(),
        normalized
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string()),
    ));
    let temp = TempCopy { path: temp_path.clone() };
    copy_preserving_mtime(&normalized, &temp.path)?;

    let hash = cas.put(&temp.path)?;

    let mut idx = index.lock().unwrap();
    idx.append(&normalized, &hash.to_string(), Utc::now())?;

    Ok(())
}

/// Copies `src` to `dest`, then carries `src`'s mtime along with its bytes
/// (`copy2`-semantics), so the copy reflects when the source was last
/// written rather than when the copy was made.
fn copy_preserving_mtime(src: &Path, dest: &Path) -> std::io::Result<()> {
    fs::copy(src, dest)?;
    let source_metadata = fs::metadata(src)?;
    let mtime = filetime::FileTime::from_last_modification_time(&source_metadata);
    filetime::set_file_mtime(dest, mtime)
}

fn thread_id() -> String {
    format!("{:?}", thread::current().id())
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn backs_up_a_registered_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("notes.txt");
        fs::write(&file, b"first version").unwrap();
        let store_root = dir.path().join("store");
        fs::create_dir_all(&store_root).unwrap();

        let cas = Arc::new(CasStore::new(store_root.join("cas")).unwrap());
        let index = Arc::new(Mutex::new(VersionIndex::open_in_memory().unwrap()));
        let queue = Arc::new(DebounceQueue::new(Duration::from_millis(10)));

        queue.register(file.clone());
        let handle = StorageWorker::spawn(queue.clone(), store_root.clone(), cas.clone(), index.clone());

        thread::sleep(Duration::from_millis(100));
        queue.shutdown();
        handle.join().unwrap();

        let normalized = coba_path::normalize(&file).unwrap();
        let versions = index.lock().unwrap().versions_of(&normalized).unwrap();
        assert_eq!(versions.len(), 1);
    }

    #[test]
    fn missing_file_is_skipped_without_error() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("gone.txt");
        fs::write(&file, b"temporary").unwrap();
        let store_root = dir.path().join("store");
        fs::create_dir_all(&store_root).unwrap();

        let cas = Arc::new(CasStore::new(store_root.join("cas")).unwrap());
        let index = Arc::new(Mutex::new(VersionIndex::open_in_memory().unwrap()));

        fs::remove_file(&file).unwrap();
        let result = backup_one(&file, &store_root, &cas, &index);
        assert!(result.is_ok());
    }

    #[test]
    fn no_leftover_temp_files_after_backup() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("notes.txt");
        fs::write(&file, b"content").unwrap();
        let store_root = dir.path().join("store");
        fs::create_dir_all(&store_root).unwrap();

        let cas = Arc::new(CasStore::new(store_root.join("cas")).unwrap());
        let index = Arc::new(Mutex::new(VersionIndex::open_in_memory().unwrap()));
        backup_one(&file, &store_root, &cas, &index).unwrap();

        let leftovers: Vec<_> = fs::read_dir(&store_root)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_name()
                    .to_string_lossy()
                    .starts_with(&format!(".coba-worker-{}-", std::process::id()))
            })
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn copy_preserving_mtime_carries_the_source_timestamp() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("notes.txt");
        fs::write(&source, b"content").unwrap();
        let old_mtime = filetime::FileTime::from_unix_time(1_600_000_000, 0);
        filetime::set_file_mtime(&source, old_mtime).unwrap();

        let dest = dir.path().join("copy.txt");
        copy_preserving_mtime(&source, &dest).unwrap();

        let dest_metadata = fs::metadata(&dest).unwrap();
        let dest_mtime = filetime::FileTime::from_last_modification_time(&dest_metadata);
        assert_eq!(dest_mtime, old_mtime);
        assert_eq!(fs::read(&dest).unwrap(), b"content");
    }
}
