//! `coba restore <when> <path> [--to <target>] [--force]`.

use std::path::Path;

use anyhow::{anyhow, Context, Result};

pub fn run(
    store_root: &Path,
    when: &str,
    path: &Path,
    to: Option<&Path>,
    force: bool,
) -> Result<()> {
    let store = coba_store::Store::open(store_root)
        .with_context(|| format!("opening store at {}", store_root.display()))?;
    let normalized = coba_path::normalize(path)
        .with_context(|| format!("normalizing {}", path.display()))?;

    let at = coba_config::parse_timestamp(when)
        .with_context(|| format!("parsing timestamp {when:?}"))?;

    let version = store
        .index()
        .lock()
        .unwrap()
        .version_at(&normalized, at)
        .context("looking up version")?
        .ok_or_else(|| anyhow!("no version of {} at {}", normalized.display(), when))?;

    let restored = coba_restore::restore(store.cas().as_ref(), &version, to, force)
        .with_context(|| format!("restoring {}", normalized.display()))?;

    println!("Restored {} to {}", normalized.display(), restored.display());
    Ok(())
}
