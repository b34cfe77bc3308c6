//! Gitignore-style filtering of watched paths.
//!
//! Three independent reasons can cause a path to be ignored: it lives
//! inside the store's own root (so Coba never backs up its own data), it
//! matches one of the configured wildmatch patterns, or it exceeds the
//! configured size threshold. Any one of these is sufficient.

use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};

#[derive(Debug, thiserror::Error)]
pub enum IgnoreError {
    #[error("invalid ignore pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: ignore::Error,
    },

    #[error("failed to build ignore matcher: {0}")]
    Build(#[from] ignore::Error),
}

pub struct IgnoreFilter {
    matcher: Gitignore,
    store_root: PathBuf,
    max_file_size: Option<u64>,
}

impl IgnoreFilter {
    /// Build a filter rooted at `root` (patterns are interpreted relative
    /// to this directory, as gitignore patterns are). `store_root` is
    /// always ignored regardless of `patterns`.
    pub fn new(
        root: &Path,
        patterns: &[String],
        max_file_size: Option<u64>,
        store_root: &Path,
    ) -> Result<Self, IgnoreError> {
        let mut builder = GitignoreBuilder::new(root);
        for pattern in patterns {
            builder
                .add_line(None, pattern)
                .map_err(|source| IgnoreError::Pattern {
                    pattern: pattern.clone(),
                    source,
                })?;
        }
        let matcher = builder.build()?;
        Ok(Self {
            matcher,
            store_root: store_root.to_path_buf(),
            max_file_size,
        })
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        if path.starts_with(&self.store_root) {
            return true;
        }

        if let Some(max) = self.max_file_size {
            if let Ok(metadata) = path.metadata() {
                if metadata.is_file() && metadata.len() > max {
                    return true;
                }
            }
        }

        let is_dir = path.is_dir();
        self.matcher.matched(path, is_dir).is_ignore()
    }
}
