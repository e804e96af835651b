//! Error types for the duplicate-name scan.
//!
//! Every variant here is fatal: the binary prints it and exits non-zero
//! without writing a partial report. Permission errors hit while walking a
//! tree never become a `ScanError`; the enumerator skips those entries.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Path {} does not exist", path.display())]
    PathNotFound { path: PathBuf },

    #[error("Failed to determine the current directory: {0}")]
    CurrentDir(#[source] io::Error),

    #[error("Failed to walk '{}': {source}", path.display())]
    Traversal {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to hash '{}': {source}", path.display())]
    HashRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to open output file '{}': {source}", path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to start matching workers: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Matching workers stopped after {received} of {expected} files")]
    WorkerDisconnected { received: usize, expected: usize },
}
