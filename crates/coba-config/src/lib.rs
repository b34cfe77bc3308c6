//! Ambient support for Coba: on-disk configuration, logging setup, and
//! the loose timestamp parsing used by the CLI's `--at` arguments.

pub mod config;
pub mod datetime;
pub mod logging;

pub use config::{Config, ConfigError};
pub use datetime::{parse_timestamp, DateTimeError};
pub use logging::{init_logging, Component, LogLevel};
