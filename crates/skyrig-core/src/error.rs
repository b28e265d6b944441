//! Error types for cluster config generation.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for cluster config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while loading, mutating, or saving a cluster config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("type mismatch at `{path}`: expected {expected}")]
    TypeMismatch { path: String, expected: &'static str },

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("AMI lookup failed: {0}")]
    AmiLookup(String),
}

impl ConfigError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            ConfigError::NotFound(path.to_path_buf())
        } else {
            ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    pub(crate) fn type_mismatch(path: &[&str], expected: &'static str) -> Self {
        ConfigError::TypeMismatch {
            path: path.join("."),
            expected,
        }
    }
}
