//! Errors for the multi-log index.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("failed to scan store root {path}")]
    Scan { path: PathBuf, #[source] source: std::io::Error },

    #[error("no session with id {session_id}")]
    SessionNotFound { session_id: u64 },

    #[error("no fight with id {fight_id}")]
    FightNotFound { fight_id: u64 },

    #[error("failed to rename store {from} -> {to}")]
    Rename { from: PathBuf, to: PathBuf, #[source] source: std::io::Error },

    #[error("failed to delete store {path}")]
    Delete { path: PathBuf, #[source] source: std::io::Error },

    #[error(transparent)]
    Store(#[from] crate::store::StoreError),
}
