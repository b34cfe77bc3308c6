//! Content-addressed blob storage.
//!
//! Blobs are addressed by their SHA-1 digest and fanned out four levels
//! deep, one hex character per level, so that no directory ever holds
//! more than a handful of thousand entries even with millions of blobs:
//! `content/<a>/<b>/<c>/<d>/<rest>`.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use sha1::{Digest, Sha1};

const FANOUT_DEPTH: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum CasError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("blob not found: {hash}")]
    NotFound { hash: ContentHash },

    #[error("blob {hash} is corrupt: expected {expected}, got {actual}")]
    HashMismatch {
        hash: ContentHash,
        expected: ContentHash,
        actual: ContentHash,
    },
}

pub type Result<T> = std::result::Result<T, CasError>;

/// A SHA-1 content digest, displayed as a 40-character lowercase hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; 20]);

impl ContentHash {
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        if bytes.len() != 20 {
            return None;
        }
        let mut array = [0u8; 20];
        array.copy_from_slice(&bytes);
        Some(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// A content-addressed store rooted at a single directory.
pub struct CasStore {
    root: PathBuf,
}

impl CasStore {
    /// Opens (creating if necessary) a content store at `root`.
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the blob for `hash`, whether or not it currently exists.
    pub fn blob_path(&self, hash: &ContentHash) -> PathBuf {
        let hex = hash.to_string();
        let mut path = self.root.clone();
        for c in hex.chars().take(FANOUT_DEPTH) {
            path.push(c.to_string());
        }
        path.push(&hex[FANOUT_DEPTH..]);
        path
    }

    pub fn exists(&self, hash: &ContentHash) -> bool {
        self.blob_path(hash).is_file()
    }

    /// Copies `source` into the store, returning its content hash.
    /// If a blob with the same hash already exists, the existing copy is
    /// kept and the new data is discarded (deduplication).
    pub fn put(&self, source: &Path) -> Result<ContentHash> {
        let mut reader = File::open(source)?;

        let temp_path = self.root.join(format!(
            ".tmp-{}-{}",
            std::process::id(),
            thread_id()
        ));
        let mut temp_file = File::create(&temp_path)?;
        let temp = TempGuard::new(&temp_path);

        let mut hasher = Sha1::new();
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            temp_file.write_all(&buf[..n])?;
        }
        temp_file.sync_all()?;
        drop(temp_file);

        let digest = hasher.finalize();
        let mut array = [0u8; 20];
        array.copy_from_slice(&digest);
        let hash = ContentHash(array);

        if self.exists(&hash) {
            return Ok(hash);
        }

        let dest = self.blob_path(&hash);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        match fs::rename(&temp_path, &dest) {
            Ok(()) => {
                temp.disarm();
                Ok(hash)
            }
            Err(_) if dest.is_file() => {
                // Lost a race with another writer storing the same blob.
                Ok(hash)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Opens a blob for reading.
    pub fn get(&self, hash: &ContentHash) -> Result<File> {
        let path = self.blob_path(hash);
        File::open(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                CasError::NotFound { hash: *hash }
            } else {
                CasError::Io(source)
            }
        })
    }

    /// Reads a blob fully and verifies it still hashes to `hash`.
    pub fn get_verified(&self, hash: &ContentHash) -> Result<Vec<u8>> {
        let mut file = self.get(hash)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;

        let mut hasher = Sha1::new();
        hasher.update(&data);
        let digest = hasher.finalize();
        let mut actual = [0u8; 20];
        actual.copy_from_slice(&digest);
        let actual = ContentHash(actual);

        if actual != *hash {
            return Err(CasError::HashMismatch {
                hash: *hash,
                expected: *hash,
                actual,
            });
        }
        Ok(data)
    }
}

/// Unlinks the temp file it guards on drop, unless [`disarm`](Self::disarm)
/// was called first.
struct TempGuard<'a> {
    path: &'a Path,
    armed: bool,
}

impl<'a> TempGuard<'a> {
    fn new(path: &'a Path) -> Self {
        Self { path, armed: true }
    }

    /// Suppresses the drop-time unlink: the temp file has been renamed
    /// into place and is no longer ours to clean up.
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for TempGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let _ = fs::remove_file(self.path);
        }
    }
}

fn thread_id() -> String {
    format!("{:?}", std::thread::current().id())
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}
