//! Project hierarchy and destination matching.
//!
//! A project's full path is the `/`-joined chain of names from its top-level
//! ancestor down to itself. Resolution is exact: the query must equal a full
//! path, or, for a query without `/`, a project name. Substring matches are
//! only reported back as near misses.

use std::collections::HashMap;

use crate::api::ProjectItem;

/// A project together with its computed full path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectEntry {
    pub id: String,
    pub name: String,
    pub full_path: String,
}

/// Outcome of matching a query against the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<'a> {
    Unique(&'a ProjectEntry),
    /// Several projects match; their full paths.
    Ambiguous(Vec<String>),
    /// Nothing matched exactly; full paths that contain the query.
    Missing { near_misses: Vec<String> },
}

/// All projects visible to the signed-in user.
#[derive(Debug, Clone, Default)]
pub struct ProjectTree {
    entries: Vec<ProjectEntry>,
}

impl ProjectTree {
    pub fn new(items: Vec<ProjectItem>) -> Self {
        let by_id: HashMap<&str, &ProjectItem> =
            items.iter().map(|item| (item.id.as_str(), item)).collect();
        let entries = items
            .iter()
            .map(|item| ProjectEntry {
                id: item.id.clone(),
                name: item.name.clone(),
                full_path: full_path(item, &by_id),
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn resolve(&self, query: &str) -> Resolution<'_> {
        let query = query.trim_matches('/');
        let mut matches: Vec<&ProjectEntry> =
            self.entries.iter().filter(|e| e.full_path == query).collect();
        if matches.is_empty() && !query.contains('/') {
            matches = self.entries.iter().filter(|e| e.name == query).collect();
        }

        match matches.as_slice() {
            [one] => Resolution::Unique(*one),
            [] => Resolution::Missing {
                near_misses: self
                    .entries
                    .iter()
                    .filter(|e| !query.is_empty() && e.full_path.contains(query))
                    .map(|e| e.full_path.clone())
                    .collect(),
            },
            many => Resolution::Ambiguous(many.iter().map(|e| e.full_path.clone()).collect()),
        }
    }
}

/// Walk parents upward. A parent the user cannot see ends the chain; a cycle
/// is cut after one pass over the projects.
fn full_path(item: &ProjectItem, by_id: &HashMap<&str, &ProjectItem>) -> String {
    let mut names = vec![item.name.as_str()];
    let mut parent = item.parent_project_id.as_deref();
    while let Some(id) = parent {
        if names.len() > by_id.len() {
            break;
        }
        let Some(p) = by_id.get(id) else { break };
        names.push(&p.name);
        parent = p.parent_project_id.as_deref();
    }
    names.reverse();
    names.join("/")
}
