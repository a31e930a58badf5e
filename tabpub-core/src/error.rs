//! Error types for tabpub-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while building the workbook registry.
///
/// Every variant is fatal to a run: a registry that failed to load is never
/// used partially.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    /// Underlying I/O failure, annotated with the path being read.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory traversal failed below the fragment root.
    #[error("failed to walk fragment directory: {0}")]
    Walk(#[from] walkdir::Error),

    /// A fragment is not valid YAML; the source carries line context.
    #[error("failed to parse fragment at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A fragment parsed, but its top level is not a mapping.
    #[error("fragment at {path} must be a mapping with a `workbooks` list")]
    NotAMapping { path: PathBuf },

    /// The merged `workbooks` key holds something other than a list.
    #[error("`workbooks` must be a list of workbook entries")]
    WorkbooksNotAList,

    /// Two fragments assign different scalar values to the same key path.
    #[error("conflicting values for `{key_path}` in {first} and {second}")]
    ScalarConflict {
        key_path: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// Two entries for the same workbook disagree on a scalar field
    /// (only raised under [`crate::registry::DuplicatePolicy::Merge`]).
    #[error("entries for {file_name} disagree on `{key_path}`")]
    DuplicateConflict { file_name: String, key_path: String },

    /// A `workbooks` entry is missing a required field or has a wrongly typed option.
    #[error("invalid workbook entry #{index}: {source}")]
    InvalidEntry {
        index: usize,
        #[source]
        source: serde_yaml::Error,
    },

    /// A `workbooks` entry has a `file_path` with no final segment.
    #[error("workbook entry #{index} has an empty file_path")]
    EmptyFilePath { index: usize },
}

/// Convenience constructor for [`ConfigLoadError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigLoadError {
    ConfigLoadError::Io {
        path: path.into(),
        source,
    }
}
