//! `coba versions <path> [--hash <prefix>]`.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;

pub fn run(store_root: &Path, path: &Path, hash_prefix: Option<&str>) -> Result<()> {
    let store = coba_store::Store::open(store_root)
        .with_context(|| format!("opening store at {}", store_root.display()))?;
    let normalized = coba_path::normalize(path)
        .with_context(|| format!("normalizing {}", path.display()))?;

    let versions = store
        .index()
        .lock()
        .unwrap()
        .versions_of(&normalized)
        .context("reading versions")?;

    let filtered: Vec<_> = versions
        .into_iter()
        .filter(|v| match hash_prefix {
            Some(prefix) => v.hash.starts_with(prefix),
            None => true,
        })
        .collect();

    if filtered.is_empty() {
        println!("No versions for {}.", normalized.display());
        return Ok(());
    }

    for version in &filtered {
        let local = version.stored_at.with_timezone(&Local);
        println!("{} {}", local.format("%Y-%m-%d %H:%M:%S"), version.hash);
    }
    Ok(())
}
