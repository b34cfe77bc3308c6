//! Ties a blob store and a version index to a single store root,
//! handling the one-time setup of a previously unused root.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use coba_cas::CasStore;
use coba_index::VersionIndex;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("version index error: {0}")]
    Index(#[from] coba_index::IndexError),
}

pub type Result<T> = std::result::Result<T, StoreError>;

const CONTENT_DIR: &str = "content";
const INDEX_FILE: &str = "index.db";

pub struct Store {
    root: PathBuf,
    cas: Arc<CasStore>,
    index: Arc<Mutex<VersionIndex>>,
}

impl Store {
    /// Opens the store rooted at `root`, creating it (and its content
    /// directory and version index) if this is the first use.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;

        let cas = CasStore::new(root.join(CONTENT_DIR))?;
        let index = VersionIndex::open(root.join(INDEX_FILE))?;

        coba_config::log_store_info!(root = %root.display(), "store opened");

        Ok(Self {
            root,
            cas: Arc::new(cas),
            index: Arc::new(Mutex::new(index)),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cas(&self) -> Arc<CasStore> {
        self.cas.clone()
    }

    pub fn index(&self) -> Arc<Mutex<VersionIndex>> {
        self.index.clone()
    }

    /// Releases the store's resources. Equivalent to dropping it, but
    /// spelled out for callers that want an explicit lifecycle boundary
    /// (e.g. before the daemon process exits).
    pub fn close(self) {
        coba_config::log_store_info!(root = %self.root.display(), "store closed");
        drop(self);
    }
}
