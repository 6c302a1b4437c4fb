
use crate::model::{
    DocumentComparison, DocumentContradiction, DocumentId, DocumentPattern, DocumentRef,
    DocumentStatus, ProjectId, SavedAnalysis,
};
use crate::session::Message;
use crate::{AnalysisTab, ErrorInfo, QueryPhase};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppViewModel {
    pub documents: Vec<DocumentRowView>,
    pub selection: SelectionView,
    pub projects: Vec<ProjectRowView>,
    pub saved_analyses: Vec<SavedAnalysis>,
    pub analysis: Option<AnalysisView>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRowView {
    pub id: DocumentId,
    pub name: String,
    pub status: DocumentStatus,
    pub selected: bool,
    /// False for documents that are not ready or when the selection is full.
    pub selectable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionView {
    pub selected: usize,
    pub min: usize,
    pub max: usize,
    pub can_confirm: bool,
}

/// One visible row of the flattened project tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRowView {
    pub project_id: ProjectId,
    pub name: String,
    pub depth: usize,
    pub own_documents: usize,
    /// Documents in the whole subtree; only computed for expanded nodes.
    pub aggregated_documents: Option<usize>,
    pub expanded: bool,
    pub has_children: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressView {
    pub percent: u8,
    pub remaining_ms: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisView {
    pub key: String,
    pub documents: Vec<DocumentRef>,
    pub active_tab: AnalysisTab,
    pub input: String,
    pub phase: QueryPhase,
    pub progress: Option<ProgressView>,
    pub can_send: bool,
    pub messages: Vec<Message>,
    pub comparison: Option<DocumentComparison>,
    pub comparison_loading: bool,
    pub comparison_error: Option<ErrorInfo>,
    pub patterns: Vec<DocumentPattern>,
    pub contradictions: Vec<DocumentContradiction>,
}
