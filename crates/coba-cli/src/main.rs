//! `coba` — continuous local-file backup.
//!
//! `coba watch <dir>` runs the observer and storage worker in the
//! foreground until interrupted; `coba versions <path>` lists recorded
//! versions of a file; `coba restore <when> <path>` reconstructs the
//! version that was current at a given local time.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use coba_config::{Config, LogLevel};

mod commands;

#[derive(Parser)]
#[command(name = "coba")]
#[command(version, about = "Continuous local-file backup daemon", long_about = None)]
struct Cli {
    /// Store root directory. Overrides the configured and default store.
    #[arg(long, global = true, env = "COBA_STORE")]
    store: Option<PathBuf>,

    /// Increase log verbosity (-v for info, -vv for debug, -vvv for trace).
    #[arg(short = 'v', long = "verbose", global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch a directory and back up files as they change.
    Watch {
        /// Directory to watch, recursively.
        directory: PathBuf,
    },

    /// List the recorded versions of a file, oldest first.
    Versions {
        /// File whose versions to list.
        path: PathBuf,

        /// Only show versions whose content hash starts with this prefix.
        #[arg(long)]
        hash: Option<String>,
    },

    /// Restore a file to the version that was active at a given time.
    Restore {
        /// The point in time to restore (local time); see `coba restore --help`.
        ///
        /// Accepted forms: "YYYY-MM-DD HH:MM:SS", "YYYY-MM-DD HH:MM",
        /// "YYYY-MM-DD", "HH:MM:SS", "HH:MM". Missing fields default to the
        /// end of the day (or, for a bare time, today).
        when: String,

        /// File to restore.
        path: PathBuf,

        /// Write the restored content here instead of the original path.
        #[arg(long = "to")]
        to: Option<PathBuf>,

        /// Overwrite the target if it already exists.
        #[arg(short, long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    coba_config::init_logging(LogLevel::from_verbosity(cli.verbose));

    if let Err(err) = run(cli) {
        coba_config::log_cli_error!(error = %err, "coba failed");
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load().context("loading configuration")?;
    let store_root = cli.store.unwrap_or(config.store_path.clone());

    match cli.command {
        Commands::Watch { directory } => {
            if !directory.is_dir() {
                bail!("{} is not a directory", directory.display());
            }
            commands::watch::run(&store_root, &directory, &config)
        }
        Commands::Versions { path, hash } => commands::versions::run(&store_root, &path, hash.as_deref()),
        Commands::Restore { when, path, to, force } => {
            commands::restore::run(&store_root, &when, &path, to.as_deref(), force)
        }
    }
}

/// Shared shutdown flag wired to Ctrl-C, used by `watch`.
pub(crate) fn install_shutdown_handler() -> Arc<AtomicBool> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    ctrlc::set_handler(move || {
        coba_config::log_cli_info!("interrupt received, shutting down");
        flag.store(true, Ordering::SeqCst);
    })
    .expect("failed to install Ctrl-C handler");
    shutdown
}

pub(crate) fn poll_interval() -> Duration {
    Duration::from_millis(200)
}
