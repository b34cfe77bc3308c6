//! `coba watch <directory>`: run the observer and storage worker in the
//! foreground until interrupted.

use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::{Context, Result};
use coba_config::Config;
use coba_ignore::IgnoreFilter;
use coba_queue::DebounceQueue;
use coba_watch::FsEventAdapter;
use coba_worker::StorageWorker;

use crate::{install_shutdown_handler, poll_interval};

pub fn run(store_root: &Path, directory: &Path, config: &Config) -> Result<()> {
    let store = coba_store::Store::open(store_root)
        .with_context(|| format!("opening store at {}", store_root.display()))?;

    let ignore = Arc::new(
        IgnoreFilter::new(
            directory,
            &config.ignores,
            config.max_file_size,
            store.root(),
        )
        .context("building ignore filter")?,
    );

    let queue = Arc::new(DebounceQueue::new(config.idle_wait()));

    let watchers = FsEventAdapter::watch(&[directory.to_path_buf()], queue.clone(), ignore)
        .context("starting filesystem watch")?;

    let worker = StorageWorker::spawn(queue.clone(), store.root().to_path_buf(), store.cas(), store.index());

    println!("Watching {} (store: {})", directory.display(), store.root().display());
    coba_config::log_cli_info!(
        directory = %directory.display(),
        store = %store.root().display(),
        "watch started"
    );

    let shutdown = install_shutdown_handler();
    while !shutdown.load(Ordering::SeqCst) {
        std::thread::sleep(poll_interval());
    }

    queue.shutdown();
    worker.join().expect("storage worker panicked");
    drop(watchers);

    println!("Stopped.");
    Ok(())
}
