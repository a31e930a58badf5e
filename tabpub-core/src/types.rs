//! Domain types for the workbook registry.
//!
//! [`WorkbookEntry`] mirrors one element of a fragment's `workbooks` list as
//! written on disk; [`WorkbookSpec`] is the validated, keyed form the rest of
//! the workspace consumes.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Registry key: the basename of a workbook file (e.g. `Sales.twb`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WorkbookFile(pub String);

impl WorkbookFile {
    /// Key for `path`: its final segment, or `None` when the path has none.
    pub fn from_path(path: &str) -> Option<Self> {
        let name = path.trim_end_matches('/').rsplit('/').next()?;
        if name.is_empty() {
            return None;
        }
        Some(Self(name.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lower-cased extension without the dot, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.0)
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
    }
}

impl fmt::Display for WorkbookFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for WorkbookFile {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for WorkbookFile {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Fragment schema
// ---------------------------------------------------------------------------

/// Optional publish settings for a workbook (`option:` in a fragment).
///
/// Every field has a default, so an absent `option` block and an empty one
/// behave the same.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkbookOptions {
    /// Views hidden on the published workbook.
    pub hidden_views: Vec<String>,
    /// Whether the workbook is published with sheet tabs visible.
    pub show_tabs: bool,
    pub tags: Vec<String>,
    /// Best effort: the server may refuse to set it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl WorkbookOptions {
    /// Drops repeated view names and tags, keeping first occurrences.
    ///
    /// Additive merging concatenates lists, so the same view can appear twice
    /// when two fragments mention it.
    pub(crate) fn dedup(mut self) -> Self {
        dedup_in_order(&mut self.hidden_views);
        dedup_in_order(&mut self.tags);
        self
    }
}

fn dedup_in_order(items: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| seen.insert(item.clone()));
}

/// One element of a fragment's `workbooks` list, as written on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkbookEntry {
    /// Path of the workbook file; only its final segment is used as the key.
    pub file_path: String,
    pub name: String,
    pub project_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option: Option<WorkbookOptions>,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// A validated registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkbookSpec {
    pub file_name: WorkbookFile,
    /// Name the workbook is published under and shown in reports.
    pub display_name: String,
    /// Project path on the server, e.g. `Finance/Quarterly`.
    pub destination_path: String,
    pub options: WorkbookOptions,
}

impl WorkbookSpec {
    /// Builds the spec for `entry`, or `None` if its `file_path` has no final segment.
    pub fn from_entry(entry: WorkbookEntry) -> Option<Self> {
        let file_name = WorkbookFile::from_path(&entry.file_path)?;
        Some(Self {
            file_name,
            display_name: entry.name,
            destination_path: entry.project_path,
            options: entry.option.unwrap_or_default().dedup(),
        })
    }
}

/// All workbooks known for one run, keyed by file name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Registry {
    workbooks: BTreeMap<WorkbookFile, WorkbookSpec>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `spec`, returning the entry it replaced.
    pub fn insert(&mut self, spec: WorkbookSpec) -> Option<WorkbookSpec> {
        self.workbooks.insert(spec.file_name.clone(), spec)
    }

    pub fn get(&self, file_name: &WorkbookFile) -> Option<&WorkbookSpec> {
        self.workbooks.get(file_name)
    }

    pub fn contains(&self, file_name: &WorkbookFile) -> bool {
        self.workbooks.contains_key(file_name)
    }

    pub fn len(&self) -> usize {
        self.workbooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workbooks.is_empty()
    }

    /// Entries in file-name order.
    pub fn iter(&self) -> impl Iterator<Item = &WorkbookSpec> {
        self.workbooks.values()
    }
}

impl FromIterator<WorkbookSpec> for Registry {
    fn from_iter<I: IntoIterator<Item = WorkbookSpec>>(iter: I) -> Self {
        let mut registry = Registry::new();
        for spec in iter {
            registry.insert(spec);
        }
        registry
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
