//! Workbook registry types, fragment merging and configuration errors.
//!
//! - [`types`]: [`WorkbookSpec`], [`Registry`] and the fragment schema
//! - [`error`]: [`ConfigLoadError`]
//! - [`registry`]: discover, merge and index configuration fragments

pub mod error;
pub mod registry;
pub mod types;

pub use error::ConfigLoadError;
pub use registry::{build_registry, build_registry_with, DuplicatePolicy};
pub use types::{Registry, WorkbookEntry, WorkbookFile, WorkbookOptions, WorkbookSpec};
