//! Fragment discovery, additive merge, and registry indexing.
//!
//! # Layout
//!
//! ```text
//! <workbook_dir>/
//!   finance.yml              (fragment)
//!   Sales.twb
//!   ops/
//!     ops.yaml               (fragment, any depth)
//!     Capacity.twb
//! ```
//!
//! # Merge rules
//!
//! Fragments are merged in path order (sorted, so the result does not depend
//! on filesystem traversal order):
//! - mappings: key union, values merged recursively
//! - sequences: concatenated, never deduplicated or replaced
//! - scalars: equal values merge, different values are
//!   [`ConfigLoadError::ScalarConflict`]
//!
//! Indexing the merged `workbooks` list is a separate, non-additive step: see
//! [`DuplicatePolicy`].

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use walkdir::WalkDir;

use crate::error::{io_err, ConfigLoadError};
use crate::types::{Registry, WorkbookEntry, WorkbookFile, WorkbookSpec};

/// File extensions recognised as configuration fragments.
pub const FRAGMENT_EXTENSIONS: &[&str] = &["yml", "yaml"];

const WORKBOOKS_KEY: &str = "workbooks";
const FILE_PATH_KEY: &str = "file_path";

/// How indexing treats two `workbooks` entries with the same file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// The later entry (in fragment path order) replaces the earlier one.
    #[default]
    Replace,
    /// Entries are merged field by field with the fragment merge rules.
    Merge,
}

// ---------------------------------------------------------------------------
// 1. Discovery
// ---------------------------------------------------------------------------

/// Every fragment file below `root`, at any depth, sorted by path.
pub fn discover_fragments(root: &Path) -> Result<Vec<PathBuf>, ConfigLoadError> {
    if !root.is_dir() {
        return Err(io_err(
            root,
            std::io::Error::new(std::io::ErrorKind::NotFound, "workbook directory not found"),
        ));
    }

    let mut fragments = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry?;
        if entry.file_type().is_file() && is_fragment(entry.path()) {
            fragments.push(entry.into_path());
        }
    }
    fragments.sort();
    Ok(fragments)
}

fn is_fragment(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|ext| FRAGMENT_EXTENSIONS.contains(&ext.as_str()))
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Parse one fragment. Returns `None` for an empty document.
pub fn load_fragment(path: &Path) -> Result<Option<Mapping>, ConfigLoadError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let value: Value = serde_yaml::from_str(&contents).map_err(|source| ConfigLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    match value {
        Value::Null => Ok(None),
        Value::Mapping(map) => Ok(Some(map)),
        _ => Err(ConfigLoadError::NotAMapping {
            path: path.to_path_buf(),
        }),
    }
}

// ---------------------------------------------------------------------------
// 3. Merge
// ---------------------------------------------------------------------------

/// Two documents disagree on the scalar at `key_path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeConflict {
    /// Dotted path of the conflicting key, e.g. `defaults.site`.
    pub key_path: String,
}

/// Additively merge `overlay` into `base`.
///
/// A `null` on either side yields the other side, so an empty `option:` key
/// never conflicts with a populated one.
pub fn merge_values(base: Value, overlay: Value) -> Result<Value, MergeConflict> {
    merge_at(base, overlay, &mut Vec::new())
}

fn merge_at(base: Value, overlay: Value, path: &mut Vec<String>) -> Result<Value, MergeConflict> {
    match (base, overlay) {
        (Value::Null, other) | (other, Value::Null) => Ok(other),
        (Value::Mapping(mut base_map), Value::Mapping(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => {
                        path.push(key_label(&key));
                        let merged = merge_at(base_value, overlay_value, path)?;
                        path.pop();
                        merged
                    }
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Ok(Value::Mapping(base_map))
        }
        (Value::Sequence(mut base_seq), Value::Sequence(overlay_seq)) => {
            base_seq.extend(overlay_seq);
            Ok(Value::Sequence(base_seq))
        }
        (base, overlay) if base == overlay => Ok(base),
        _ => Err(MergeConflict {
            key_path: path.join("."),
        }),
    }
}

fn key_label(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_owned())
            .unwrap_or_else(|_| "?".to_owned()),
    }
}

/// Accumulates fragments in order, remembering which file first set each
/// scalar so a conflict can name both sides.
#[derive(Debug, Default)]
pub struct FragmentMerger {
    merged: Value,
    origins: HashMap<String, PathBuf>,
}

impl FragmentMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the fragment read from `path` into the accumulated document.
    pub fn absorb(&mut self, path: &Path, fragment: Mapping) -> Result<(), ConfigLoadError> {
        let fragment = Value::Mapping(fragment);
        let merged = std::mem::take(&mut self.merged);
        self.merged = merge_values(merged, fragment.clone()).map_err(|conflict| {
            ConfigLoadError::ScalarConflict {
                first: self
                    .origins
                    .get(&conflict.key_path)
                    .cloned()
                    .unwrap_or_default(),
                second: path.to_path_buf(),
                key_path: conflict.key_path,
            }
        })?;
        record_origins(&fragment, path, &mut Vec::new(), &mut self.origins);
        Ok(())
    }

    /// The merged `workbooks` list (empty when no fragment declared one).
    pub fn into_workbooks(self) -> Result<Vec<Value>, ConfigLoadError> {
        let Value::Mapping(mut map) = self.merged else {
            return Ok(Vec::new());
        };
        match map.remove(WORKBOOKS_KEY) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Sequence(items)) => Ok(items),
            Some(_) => Err(ConfigLoadError::WorkbooksNotAList),
        }
    }
}

/// First file to set each key path, whatever the value's shape, so a list
/// against a scalar still names both sides. Sequence items are not keyed.
fn record_origins(
    value: &Value,
    file: &Path,
    path: &mut Vec<String>,
    origins: &mut HashMap<String, PathBuf>,
) {
    if !path.is_empty() && !value.is_null() {
        origins
            .entry(path.join("."))
            .or_insert_with(|| file.to_path_buf());
    }
    if let Value::Mapping(map) = value {
        for (key, child) in map {
            path.push(key_label(key));
            record_origins(child, file, path, origins);
            path.pop();
        }
    }
}

// ---------------------------------------------------------------------------
// 4. Index
// ---------------------------------------------------------------------------

/// Validate each merged entry and key it by file name.
pub fn index_workbooks(
    items: Vec<Value>,
    policy: DuplicatePolicy,
) -> Result<Registry, ConfigLoadError> {
    let mut registry = Registry::new();
    let mut raw: BTreeMap<WorkbookFile, Value> = BTreeMap::new();

    for (index, item) in items.into_iter().enumerate() {
        let spec = parse_entry(index, item.clone())?;
        match policy {
            DuplicatePolicy::Replace => {
                if let Some(previous) = registry.insert(spec) {
                    tracing::warn!(
                        workbook = %previous.file_name,
                        "workbook declared more than once; later entry replaces earlier"
                    );
                }
            }
            DuplicatePolicy::Merge => {
                let key = spec.file_name.clone();
                let merged = match raw.remove(&key) {
                    Some(previous) => {
                        let previous = with_file_path_of(previous, &item);
                        merge_values(previous, item).map_err(|conflict| {
                            ConfigLoadError::DuplicateConflict {
                                file_name: key.0.clone(),
                                key_path: conflict.key_path,
                            }
                        })?
                    }
                    None => item,
                };
                registry.insert(parse_entry(index, merged.clone())?);
                raw.insert(key, merged);
            }
        }
    }
    Ok(registry)
}

/// Entries sharing a key may name the file through different directories;
/// the later `file_path` stands, as it would under [`DuplicatePolicy::Replace`].
fn with_file_path_of(mut previous: Value, later: &Value) -> Value {
    if let (Value::Mapping(map), Some(path)) = (&mut previous, later.get(FILE_PATH_KEY)) {
        map.insert(Value::from(FILE_PATH_KEY), path.clone());
    }
    previous
}

fn parse_entry(index: usize, item: Value) -> Result<WorkbookSpec, ConfigLoadError> {
    let entry: WorkbookEntry = serde_yaml::from_value(item)
        .map_err(|source| ConfigLoadError::InvalidEntry { index, source })?;
    WorkbookSpec::from_entry(entry).ok_or(ConfigLoadError::EmptyFilePath { index })
}

// ---------------------------------------------------------------------------
// 5. Build
// ---------------------------------------------------------------------------

/// Build the registry from every fragment below `root`.
pub fn build_registry(root: &Path) -> Result<Registry, ConfigLoadError> {
    build_registry_with(root, DuplicatePolicy::default())
}

/// [`build_registry`] with an explicit duplicate-entry policy.
pub fn build_registry_with(
    root: &Path,
    policy: DuplicatePolicy,
) -> Result<Registry, ConfigLoadError> {
    let fragments = discover_fragments(root)?;
    if fragments.is_empty() {
        tracing::warn!(root = %root.display(), "no configuration fragments found");
    }

    let mut merger = FragmentMerger::new();
    for path in &fragments {
        match load_fragment(path)? {
            Some(fragment) => {
                tracing::debug!(fragment = %path.display(), "merging fragment");
                merger.absorb(path, fragment)?;
            }
            None => tracing::debug!(fragment = %path.display(), "skipping empty fragment"),
        }
    }

    let registry = index_workbooks(merger.into_workbooks()?, policy)?;
    if registry.is_empty() {
        tracing::warn!(root = %root.display(), "registry has no workbooks");
    } else {
        tracing::info!(
            fragments = fragments.len(),
            workbooks = registry.len(),
            "workbook registry built"
        );
    }
    Ok(registry)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
