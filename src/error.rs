use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised while loading configuration or persisting reports.
///
/// Everything except `Persistence` happens before the reporter does any work
/// and is fatal at startup.
#[derive(Error, Debug)]
pub enum ReporterError {
    #[error("Configuration file or key file not found! (missing: {})", join_paths(.missing))]
    ConfigurationMissing { missing: Vec<PathBuf> },

    #[error("Failed to decrypt the GitHub token: {0}")]
    Decryption(String),

    #[error("Failed to encrypt the GitHub token: {0}")]
    Encryption(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Failed to save error report to '{}': {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ReporterError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        ReporterError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, ReporterError>;
