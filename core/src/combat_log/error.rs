//! Errors for the log-reading boundary. Record-level parse problems never
//! produce an `Err` — only I/O failures opening/mapping the file do.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("failed to open log file {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to memory-map log file {path}")]
    Mmap {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
