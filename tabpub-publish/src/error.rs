//! Error types for tabpub-publish.
//!
//! Only [`PipelineError`] escapes a run. Per-workbook errors
//! ([`DestinationResolutionError`], [`PublishGatewayError`]) are folded into
//! the outcome report by the orchestrator, and [`ReportDeliveryError`] is
//! logged by the pipeline.

use std::path::PathBuf;

use thiserror::Error;

use tabpub_core::ConfigLoadError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by a [`crate::PublishGateway`] implementation.
#[derive(Debug, Error)]
pub enum PublishGatewayError {
    /// The server could not be reached or the connection broke mid-request.
    #[error("transport error during {operation}: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: BoxError,
    },

    /// Sign-in was refused.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The server answered with a non-success status.
    #[error("{operation} rejected with status {status}: {message}")]
    Rejected {
        operation: &'static str,
        status: u16,
        message: String,
    },

    /// The server answered, but not with what the API documents.
    #[error("unexpected response from {operation}: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },

    /// More than one destination matches the query.
    #[error("destination `{query}` is ambiguous: {}", matches.join(", "))]
    AmbiguousDestination { query: String, matches: Vec<String> },

    /// The local workbook file could not be read.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A workbook's destination did not resolve to exactly one location.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DestinationResolutionError {
    #[error("no destination matches `{query}`")]
    NotFound { query: String },

    #[error("destination `{query}` matches {}", matches.join(", "))]
    Ambiguous { query: String, matches: Vec<String> },
}

/// Why a single workbook ended in the failed state.
#[derive(Debug, Error)]
pub enum PublishFailure {
    #[error(transparent)]
    Destination(#[from] DestinationResolutionError),

    #[error(transparent)]
    Gateway(#[from] PublishGatewayError),
}

/// Errors raised by a [`crate::PullRequestHost`] implementation.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("transport error during {operation}: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("{operation} rejected with status {status}: {message}")]
    Status {
        operation: &'static str,
        status: u16,
        message: String,
    },

    #[error("unexpected response from {operation}: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },
}

/// The notification channel refused the report.
#[derive(Debug, Error)]
pub enum ReportDeliveryError {
    #[error("failed to post pull request comment: {0}")]
    Host(#[from] HostError),

    #[error("report rejected: {0}")]
    Rejected(String),
}

/// Fatal errors that stop a run before or instead of publishing.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The registry could not be built; nothing was published.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigLoadError),

    /// The pull request's changed files could not be listed.
    #[error("failed to list changed files: {0}")]
    ChangeSet(#[source] HostError),
}
