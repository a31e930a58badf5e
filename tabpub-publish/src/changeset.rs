//! Pull-request change sets and candidate extraction.

use std::path::Path;

use tabpub_core::WorkbookFile;

/// Extensions of workbook files managed by tabpub (`.twbx` is a packaged `.twb`).
pub const WORKBOOK_EXTENSIONS: &[&str] = &["twb", "twbx"];

/// Repository-relative paths added or modified by a pull request, in the
/// order the host reported them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChangeSet {
    paths: Vec<String>,
}

impl ChangeSet {
    pub fn new(paths: Vec<String>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Drop paths that no longer exist under `checkout_root`.
    ///
    /// A file can be modified and then deleted within one pull request; the
    /// host still lists it. Returns how many paths were dropped.
    pub fn retain_existing(&mut self, checkout_root: &Path) -> usize {
        let before = self.paths.len();
        self.paths.retain(|path| {
            let exists = checkout_root.join(path).is_file();
            if !exists {
                tracing::debug!(path = %path, "changed file missing from checkout; ignoring");
            }
            exists
        });
        before - self.paths.len()
    }
}

impl FromIterator<String> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// A changed workbook file, pending lookup in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub file_name: WorkbookFile,
    /// Repository-relative path the candidate was taken from.
    pub source_path: String,
}

/// Changed workbook files below `managed_dir`, in change-set order.
///
/// `managed_dir` matches as a run of whole path components anywhere in the
/// file's directory part, so `wb` matches `wb/A.twb` and `bi/wb/A.twb` but
/// not `wb2/A.twb`. Duplicates are kept.
pub fn resolve_candidates(changeset: &ChangeSet, managed_dir: &str) -> Vec<Candidate> {
    let managed_dir = managed_dir.replace('\\', "/");
    let dir_parts = components(&managed_dir);

    changeset
        .paths()
        .iter()
        .filter_map(|path| {
            let parts = components(path);
            let (file, dirs) = parts.split_last()?;
            if !contains_run(dirs, &dir_parts) {
                return None;
            }
            let file_name = WorkbookFile::from(*file);
            let managed = file_name
                .extension()
                .is_some_and(|ext| WORKBOOK_EXTENSIONS.contains(&ext.as_str()));
            managed.then(|| Candidate {
                file_name,
                source_path: path.clone(),
            })
        })
        .collect()
}

fn components(path: &str) -> Vec<&str> {
    path.split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect()
}

fn contains_run(haystack: &[&str], needle: &[&str]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|window| window == needle)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
