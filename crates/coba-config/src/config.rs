//! Loading and defaulting Coba's on-disk configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid size {0:?}: expected a number optionally followed by K, M, or G")]
pub struct SizeParseError(String);

const STORE_ENV_VAR: &str = "COBA_STORE";
const CONFIG_FILE_NAME: &str = "config.toml";
const CONFIG_DIR_NAME: &str = ".coba";
const DEFAULT_IDLE_WAIT_SECS: u64 = 5;

fn default_idle_wait_secs() -> u64 {
    DEFAULT_IDLE_WAIT_SECS
}

fn default_ignores() -> Vec<String> {
    vec!["**/.*".to_string()]
}

fn default_store_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
        .join("storage")
}

/// Parses a human-readable size such as `"10 M"`, `"512K"`, or a bare
/// `"2048"` into a byte count. Recognized suffixes are `K`, `M`, and `G`
/// (powers of 1024), matched case-insensitively with or without a
/// trailing `B` (`"10M"`, `"10MB"`, `"10 MiB"` all parse the same).
/// Whitespace between the number and the suffix is optional.
pub fn parse_size(input: &str) -> Result<u64, SizeParseError> {
    let trimmed = input.trim();
    let split_at = trimmed
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(trimmed.len());
    let (number, suffix) = trimmed.split_at(split_at);
    let number: f64 = number
        .trim()
        .parse()
        .map_err(|_| SizeParseError(input.to_string()))?;

    let mut unit = suffix.trim();
    if let Some(stripped) = unit.strip_suffix(['b', 'B']) {
        unit = stripped;
    }
    if let Some(stripped) = unit.strip_suffix(['i', 'I']) {
        unit = stripped;
    }
    let multiplier: u64 = match unit.to_ascii_uppercase().as_str() {
        "" => 1,
        "K" => 1024,
        "M" => 1024 * 1024,
        "G" => 1024 * 1024 * 1024,
        _ => return Err(SizeParseError(input.to_string())),
    };

    Ok((number * multiplier as f64).round() as u64)
}

fn deserialize_max_file_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Bytes(u64),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Bytes(bytes)) => Ok(Some(bytes)),
        Some(Raw::Text(text)) => parse_size(&text).map(Some).map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directory of the content store and version index.
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Gitignore-style patterns of paths to never back up.
    #[serde(default = "default_ignores")]
    pub ignores: Vec<String>,

    /// Seconds a file must sit unmodified before it is backed up.
    #[serde(default = "default_idle_wait_secs")]
    pub idle_wait_secs: u64,

    /// Files larger than this are never backed up. Accepts a bare byte
    /// count or a human-readable size such as `"10 M"`. `None` (the
    /// default) means no limit.
    #[serde(default, deserialize_with = "deserialize_max_file_size")]
    pub max_file_size: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            ignores: default_ignores(),
            idle_wait_secs: default_idle_wait_secs(),
            max_file_size: None,
        }
    }
}

impl Config {
    pub fn idle_wait(&self) -> Duration {
        Duration::from_secs(self.idle_wait_secs)
    }

    /// Loads configuration from `~/.coba/config.toml`, falling back to
    /// defaults if the file doesn't exist. `COBA_STORE` always overrides
    /// the configured store root, file or no file.
    pub fn load() -> Result<Self, ConfigError> {
        let path = default_config_path();
        let mut config = match std::fs::read_to_string(&path) {
            Ok(contents) => toml::from_str(&contents).map_err(|source| ConfigError::Toml {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Config::default(),
            Err(source) => return Err(ConfigError::Io { path, source }),
        };

        if let Ok(store_path) = std::env::var(STORE_ENV_VAR) {
            config.store_path = PathBuf::from(store_path);
        }

        Ok(config)
    }
}

fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = Config::default();
        assert_eq!(config.idle_wait_secs, DEFAULT_IDLE_WAIT_SECS);
        assert_eq!(config.ignores, vec!["**/.*".to_string()]);
        assert_eq!(config.max_file_size, None);
    }

    #[test]
    fn deserializes_partial_toml_with_defaults() {
        let toml_str = r#"
            idle_wait_secs = 10
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.idle_wait_secs, 10);
        assert_eq!(config.ignores, vec!["**/.*".to_string()]);
    }

    #[test]
    fn deserializes_spec_conformant_config() {
        let toml_str = r#"
            store_path = "/x"
            max_file_size = "10 M"
            ignores = ["*.log"]
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.store_path, PathBuf::from("/x"));
        assert_eq!(config.ignores, vec!["*.log".to_string()]);
        assert_eq!(config.max_file_size, Some(10 * 1024 * 1024));
    }

    #[test]
    fn env_var_overrides_store_path() {
        static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
        let _guard = ENV_LOCK.lock().unwrap();

        std::env::set_var(STORE_ENV_VAR, "/tmp/coba-test-store");
        let config = Config::load().unwrap();
        std::env::remove_var(STORE_ENV_VAR);
        assert_eq!(config.store_path, PathBuf::from("/tmp/coba-test-store"));
    }

    #[test]
    fn parse_size_accepts_plain_bytes() {
        assert_eq!(parse_size("2048").unwrap(), 2048);
    }

    #[test]
    fn parse_size_accepts_suffixes_with_and_without_space() {
        assert_eq!(parse_size("10 M").unwrap(), 10 * 1024 * 1024);
        assert_eq!(parse_size("10M").unwrap(), 10 * 1024 * 1024);
        assert_eq!(parse_size("10MB").unwrap(), 10 * 1024 * 1024);
        assert_eq!(parse_size("1G").unwrap(), 1024 * 1024 * 1024);
        assert_eq!(parse_size("512K").unwrap(), 512 * 1024);
    }

    #[test]
    fn parse_size_rejects_garbage() {
        assert!(parse_size("lots").is_err());
        assert!(parse_size("10 X").is_err());
    }
}
