//! Error types for context operations

use std::path::PathBuf;
use thiserror::Error;

/// Errors during configuration load/store and data-directory resolution
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration")]
    Load(#[from] confy::ConfyError),

    #[error("failed to save configuration")]
    Save(#[source] confy::ConfyError),

    #[error("could not determine a platform data directory")]
    NoDataDir,

    #[error("failed to create directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
