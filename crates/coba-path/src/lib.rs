//! Absolute path normalization.
//!
//! All paths that cross a component boundary in Coba (watch roots, CLI
//! arguments, restore targets) are normalized through [`normalize`] before
//! they are stored or compared. The result is always absolute,
//! symlink-resolved, and (on case-insensitive filesystems) case-normalized
//! by virtue of going through the OS's own path resolution.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PathError {
    #[error("path has no file name: {0}")]
    NoFileName(PathBuf),

    #[error("I/O error resolving {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, PathError>;

/// Normalize a path to its absolute, symlink-resolved form.
///
/// Unlike `Path::canonicalize`, this tolerates a nonexistent leaf
/// component: the deepest existing ancestor is canonicalized and the
/// missing tail is rejoined verbatim. This matters for restore targets
/// and for files that get deleted between being enqueued and processed.
pub fn normalize(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        let cwd = std::env::current_dir().map_err(|source| PathError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        cwd.join(path)
    };

    match absolute.canonicalize() {
        Ok(resolved) => Ok(resolved),
        Err(_) => normalize_missing_leaf(&absolute),
    }
}

/// Canonicalize the deepest existing ancestor of `path` and rejoin the
/// remaining (nonexistent) components.
fn normalize_missing_leaf(path: &Path) -> Result<PathBuf> {
    let mut existing = path;
    let mut tail: Vec<&std::ffi::OsStr> = Vec::new();

    loop {
        match existing.canonicalize() {
            Ok(resolved) => {
                let mut result = resolved;
                for component in tail.iter().rev() {
                    result.push(component);
                }
                return Ok(result);
            }
            Err(source) => {
                let file_name = existing.file_name().ok_or_else(|| PathError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                tail.push(file_name);
                match existing.parent() {
                    Some(parent) => existing = parent,
                    None => {
                        // Reached the root without finding an existing ancestor.
                        let mut result = PathBuf::from(existing);
                        for component in tail.iter().rev() {
                            result.push(component);
                        }
                        return Ok(result);
                    }
                }
            }
        }
    }
}

/// Returns `true` if `path` is `dir` or a descendant of `dir`. Both
/// arguments are compared as given; callers are expected to have already
/// normalized them via [`normalize`].
pub fn is_within(path: &Path, dir: &Path) -> bool {
    path.starts_with(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn normalizes_existing_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, b"hi").unwrap();

        let normalized = normalize(&file).unwrap();
        assert!(normalized.is_absolute());
        assert_eq!(normalized, file.canonicalize().unwrap());
    }

    #[test]
    fn tolerates_nonexistent_leaf() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("does-not-exist.txt");

        let normalized = normalize(&target).unwrap();
        assert!(normalized.is_absolute());
        assert_eq!(normalized.file_name().unwrap(), "does-not-exist.txt");
        assert_eq!(normalized.parent().unwrap(), dir.path().canonicalize().unwrap());
    }

    #[test]
    fn resolves_relative_paths_against_cwd() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("rel.txt"), b"hi").unwrap();
        let cwd = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();
        let result = normalize("rel.txt");
        std::env::set_current_dir(cwd).unwrap();

        let normalized = result.unwrap();
        assert!(normalized.is_absolute());
        assert_eq!(normalized.file_name().unwrap(), "rel.txt");
    }

    #[test]
    fn is_within_detects_descendants() {
        let root = Path::new("/a/b");
        assert!(is_within(Path::new("/a/b/c.txt"), root));
        assert!(is_within(Path::new("/a/b"), root));
        assert!(!is_within(Path::new("/a/c.txt"), root));
    }
}
