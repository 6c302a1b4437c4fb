//! Project tree helpers: descendant collection, document counts, breadcrumbs
//! and per-node expansion state.

use std::collections::BTreeSet;

use crate::model::{Document, Project, ProjectId};

/// Ids of `project` and every project below it, depth first.
pub fn descendant_ids(project: &Project) -> BTreeSet<ProjectId> {
    let mut ids = BTreeSet::new();
    let mut stack = vec![project];
    while let Some(node) = stack.pop() {
        ids.insert(node.id.clone());
        stack.extend(node.children.iter());
    }
    ids
}

pub fn own_document_count(project: &Project, documents: &[Document]) -> usize {
    documents
        .iter()
        .filter(|doc| doc.project_id.as_deref() == Some(project.id.as_str()))
        .count()
}

/// Documents whose project lies anywhere in the subtree rooted at `project`.
pub fn aggregated_document_count(project: &Project, documents: &[Document]) -> usize {
    let ids = descendant_ids(project);
    documents
        .iter()
        .filter(|doc| {
            doc.project_id
                .as_ref()
                .is_some_and(|project_id| ids.contains(project_id))
        })
        .count()
}

pub fn find_project<'a>(roots: &'a [Project], id: &str) -> Option<&'a Project> {
    roots.iter().find_map(|root| {
        if root.id == id {
            Some(root)
        } else {
            find_project(&root.children, id)
        }
    })
}

/// Path from a root down to the project with `id`, inclusive.
pub fn breadcrumb<'a>(roots: &'a [Project], id: &str) -> Option<Vec<&'a Project>> {
    for root in roots {
        if root.id == id {
            return Some(vec![root]);
        }
        if let Some(mut path) = breadcrumb(&root.children, id) {
            path.insert(0, root);
            return Some(path);
        }
    }
    None
}

/// Set of expanded project ids. Nodes start collapsed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExpansionState {
    expanded: BTreeSet<ProjectId>,
}

impl ExpansionState {
    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.contains(id)
    }

    /// Returns the new expanded flag for `id`.
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.expanded.remove(id) {
            false
        } else {
            self.expanded.insert(id.to_string());
            true
        }
    }

    /// Forgets ids that are no longer part of the tree.
    pub fn retain_known(&mut self, roots: &[Project]) {
        self.expanded.retain(|id| find_project(roots, id).is_some());
    }
}
