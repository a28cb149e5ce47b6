//! Command configuration.
//!
//! Settings come from an optional YAML file and are then overridden by
//! command-line flags.

use refpack_engine::PackOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::commands::{CliError, Result};

/// Configuration for a pack-refs run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Git directory holding `refs/` and `packed-refs`.
    pub git_dir: PathBuf,
    /// Pack every ref, not only tags.
    pub all: bool,
    /// Remove loose refs once packed.
    pub prune: bool,
    /// Wait for `packed-refs.lock`, in milliseconds.
    pub commit_lock_timeout_ms: u64,
    /// Wait for each loose ref lock while pruning, in milliseconds.
    pub ref_lock_timeout_ms: u64,
    /// Log level.
    pub log_level: String,
    /// Log format (`pretty` or `json`).
    pub log_format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            git_dir: PathBuf::from(".git"),
            all: false,
            prune: true,
            commit_lock_timeout_ms: 0,
            ref_lock_timeout_ms: 0,
            log_level: "warn".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Reads a YAML config file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| CliError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| CliError::ParseConfig {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses YAML config content.
    pub fn parse(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Engine options for this configuration.
    pub fn pack_options(&self) -> PackOptions {
        PackOptions::new()
            .with_all(self.all)
            .with_prune(self.prune)
            .with_commit_lock_timeout(Duration::from_millis(self.commit_lock_timeout_ms))
            .with_ref_lock_timeout(Duration::from_millis(self.ref_lock_timeout_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.git_dir, PathBuf::from(".git"));
        assert!(config.prune);
        assert!(!config.all);

        let options = config.pack_options();
        assert_eq!(options, PackOptions::new());
    }

    #[test]
    fn test_parse_partial_yaml() {
        let config = Config::parse("all: true\ncommit_lock_timeout_ms: 250\n").unwrap();
        assert!(config.all);
        assert!(config.prune);
        assert_eq!(config.log_level, "warn");

        let options = config.pack_options();
        assert!(options.all);
        assert_eq!(options.commit_lock_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_parse_empty_yaml() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn test_parse_rejects_unknown_keys() {
        assert!(Config::parse("prunee: false\n").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/refpack.yaml")).unwrap_err();
        assert!(matches!(err, CliError::ReadConfig { .. }));
        assert!(err.to_string().contains("/nonexistent/refpack.yaml"));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("refpack.yaml");
        std::fs::write(&path, "git_dir: /srv/repo.git\nprune: false\nlog_format: json\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.git_dir, PathBuf::from("/srv/repo.git"));
        assert!(!config.prune);
        assert_eq!(config.log_format, "json");
    }
}
