//! Restoring a file from a recorded version.

use std::fs;
use std::path::{Path, PathBuf};

use coba_cas::{CasError, CasStore};
use coba_index::Version;

#[derive(Debug, thiserror::Error)]
pub enum RestoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{path} already exists; pass force to overwrite")]
    FileExists { path: PathBuf },

    #[error("target has no file name to restore to")]
    NoFileName,

    #[error("stored hash {0} is not a valid content hash")]
    InvalidHash(String),

    #[error("store is corrupt: blob for version is missing or does not match its recorded hash")]
    CorruptStore(#[source] CasError),

    #[error("path normalization failed: {0}")]
    Path(#[from] coba_path::PathError),
}

pub type Result<T> = std::result::Result<T, RestoreError>;

/// Restores `version`'s content to `target` (defaulting to the version's
/// original path; if `target` is an existing directory, the version's
/// original file name is appended to it). Refuses to overwrite an
/// existing file unless `force` is set.
///
/// Returns the path the content was actually written to.
pub fn restore(
    cas: &CasStore,
    version: &Version,
    target: Option<&Path>,
    force: bool,
) -> Result<PathBuf> {
    let target = resolve_target(version, target)?;

    if target.is_file() && !force {
        return Err(RestoreError::FileExists { path: target });
    }

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }

    let hash = coba_cas::ContentHash::from_hex(&version.hash)
        .ok_or_else(|| RestoreError::InvalidHash(version.hash.clone()))?;
    let data = cas.get_verified(&hash).map_err(RestoreError::CorruptStore)?;

    let file_name = target.file_name().ok_or(RestoreError::NoFileName)?;
    let temp_name = format!(".{}.restoring-{}", file_name.to_string_lossy(), std::process::id());
    let temp_path = target.with_file_name(temp_name);
    fs::write(&temp_path, &data)?;
    fs::rename(&temp_path, &target)?;

    Ok(target)
}

fn resolve_target(version: &Version, target: Option<&Path>) -> Result<PathBuf> {
    let target = target.map(Path::to_path_buf).unwrap_or_else(|| version.path.clone());
    let target = if target.is_dir() {
        let file_name = version.path.file_name().ok_or(RestoreError::NoFileName)?;
        target.join(file_name)
    } else {
        target
    };
    Ok(coba_path::normalize(&target)?)
}
