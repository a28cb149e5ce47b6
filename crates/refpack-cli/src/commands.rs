//! CLI command implementations.

use refpack_engine::{pack_refs, PackError, PackSummary};
use refpack_storage::{FileRefStore, LooseObjectStore, StorageError};
use std::path::PathBuf;
use thiserror::Error;

use crate::config::Config;

/// CLI errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("unable to read config {}: {source}", .path.display())]
    ReadConfig {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    ParseConfig {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("not a git repository: {}", .0.display())]
    NotAGitDir(PathBuf),

    #[error(transparent)]
    Pack(#[from] PackError),
}

impl CliError {
    /// Extra advice printed after the fatal message, if any.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Pack(PackError::Peel {
                source: StorageError::ObjectNotFound(_),
                ..
            }) => Some(
                "only loose objects are read; objects stored in packfiles \
                 (for example after `git gc`) are not supported",
            ),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;

/// Pack the refs of the configured git directory.
pub fn pack(config: &Config) -> Result<PackSummary> {
    let git_dir = &config.git_dir;
    if !git_dir.join("HEAD").is_file() {
        return Err(CliError::NotAGitDir(git_dir.clone()));
    }

    tracing::info!(git_dir = %git_dir.display(), "packing refs");

    let refs = FileRefStore::new(git_dir);
    let objects = LooseObjectStore::new(git_dir.join("objects"));
    let summary = pack_refs(&refs, &objects, config.pack_options())?;
    Ok(summary)
}
