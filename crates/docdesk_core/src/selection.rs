use std::collections::BTreeSet;

use crate::model::{Document, DocumentId};

pub const DEFAULT_MIN_SELECTION: usize = 2;
pub const DEFAULT_MAX_SELECTION: usize = 10;

/// Multi-document picker with bounded selection size.
///
/// Pure local state; never talks to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSelector {
    min_selection: usize,
    max_selection: usize,
    selected: BTreeSet<DocumentId>,
}

impl Default for DocumentSelector {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SELECTION, DEFAULT_MAX_SELECTION)
    }
}

impl DocumentSelector {
    /// `max_selection` is raised to `min_selection` when given smaller.
    pub fn new(min_selection: usize, max_selection: usize) -> Self {
        Self {
            min_selection,
            max_selection: max_selection.max(min_selection),
            selected: BTreeSet::new(),
        }
    }

    pub fn min_selection(&self) -> usize {
        self.min_selection
    }

    pub fn max_selection(&self) -> usize {
        self.max_selection
    }

    pub fn selected(&self) -> &BTreeSet<DocumentId> {
        &self.selected
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    pub fn is_full(&self) -> bool {
        self.selected.len() >= self.max_selection
    }

    /// Toggles one document. Returns whether the selection changed.
    ///
    /// Adding is refused at `max_selection` and for documents that are not ready.
    pub fn toggle(&mut self, document: &Document) -> bool {
        if self.selected.remove(&document.id) {
            return true;
        }
        if self.is_full() || !document.is_ready() {
            return false;
        }
        self.selected.insert(document.id.clone())
    }

    /// Selects ready documents in list order up to `max_selection`, or clears
    /// the selection when it already holds exactly that set.
    pub fn toggle_all(&mut self, documents: &[Document]) -> bool {
        let eligible: BTreeSet<DocumentId> = documents
            .iter()
            .filter(|doc| doc.is_ready())
            .take(self.max_selection)
            .map(|doc| doc.id.clone())
            .collect();
        let next = if self.selected == eligible {
            BTreeSet::new()
        } else {
            eligible
        };
        if next == self.selected {
            return false;
        }
        self.selected = next;
        true
    }

    pub fn can_confirm(&self) -> bool {
        self.selected.len() >= self.min_selection
    }

    /// Drops ids that are no longer present in `documents`.
    pub fn retain_known(&mut self, documents: &[Document]) {
        self.selected
            .retain(|id| documents.iter().any(|doc| &doc.id == id));
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }
}
