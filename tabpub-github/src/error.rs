//! Error types for tabpub-github.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading the workflow event that triggered the run.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("event payload {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Neither `number` nor `pull_request.number` is present.
    #[error("event payload {path} does not describe a pull request")]
    NotAPullRequest { path: PathBuf },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> EventError {
    EventError::Io {
        path: path.into(),
        source,
    }
}
