//! Component-scoped logging setup.
//!
//! Every log line carries a `component` field naming the part of Coba
//! that emitted it, so a single log stream from the daemon can be
//! filtered down to e.g. just the watcher or just the storage worker.

pub struct Component;

impl Component {
    pub const WATCH: &'static str = "watch";
    pub const QUEUE: &'static str = "queue";
    pub const WORKER: &'static str = "worker";
    pub const RESTORE: &'static str = "restore";
    pub const STORE: &'static str = "store";
    pub const CLI: &'static str = "cli";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Maps a `-v` repeat count from the CLI to a verbosity level, as in
    /// `coba -vv`. No flags means warnings and errors only.
    pub fn from_verbosity(count: u8) -> Self {
        match count {
            0 => LogLevel::Warn,
            1 => LogLevel::Info,
            2 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Initializes the global tracing subscriber. `COBA_LOG` overrides
/// `level` if set, following the conventions of `tracing_subscriber`'s
/// `EnvFilter`.
pub fn init_logging(level: LogLevel) {
    let filter = tracing_subscriber::EnvFilter::try_from_env("COBA_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.as_filter_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[macro_export]
macro_rules! log_watch_warn {
    ($($arg:tt)*) => {
        tracing::warn!(component = $crate::logging::Component::WATCH, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_worker_info {
    ($($arg:tt)*) => {
        tracing::info!(component = $crate::logging::Component::WORKER, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_worker_warn {
    ($($arg:tt)*) => {
        tracing::warn!(component = $crate::logging::Component::WORKER, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_worker_debug {
    ($($arg:tt)*) => {
        tracing::debug!(component = $crate::logging::Component::WORKER, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_store_info {
    ($($arg:tt)*) => {
        tracing::info!(component = $crate::logging::Component::STORE, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_cli_info {
    ($($arg:tt)*) => {
        tracing::info!(component = $crate::logging::Component::CLI, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_cli_error {
    ($($arg:tt)*) => {
        tracing::error!(component = $crate::logging::Component::CLI, $($arg)*)
    };
}
