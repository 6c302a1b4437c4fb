use chrono::{DateTime, Utc};

use crate::analysis::AnalysisSession;
use crate::hierarchy::{aggregated_document_count, own_document_count, ExpansionState};
use crate::model::{Document, DocumentRef, Project, SavedAnalysis};
use crate::selection::DocumentSelector;
use crate::session::{CachedSession, MessageId};
use crate::view_model::{
    AnalysisView, AppViewModel, DocumentRowView, ProgressView, ProjectRowView, SelectionView,
};
use crate::{AnalysisTab, Effect, RequestId};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    documents: Vec<Document>,
    projects: Vec<Project>,
    expansion: ExpansionState,
    selector: DocumentSelector,
    saved_analyses: Vec<SavedAnalysis>,
    analysis: Option<AnalysisSession>,
    next_request_id: RequestId,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_selection_limits(min_selection: usize, max_selection: usize) -> Self {
        Self {
            selector: DocumentSelector::new(min_selection, max_selection),
            ..Self::default()
        }
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            documents: self
                .documents
                .iter()
                .map(|doc| {
                    let selected = self.selector.is_selected(&doc.id);
                    DocumentRowView {
                        id: doc.id.clone(),
                        name: doc.name.clone(),
                        status: doc.status,
                        selected,
                        selectable: doc.is_ready() && (selected || !self.selector.is_full()),
                    }
                })
                .collect(),
            selection: SelectionView {
                selected: self.selector.selected().len(),
                min: self.selector.min_selection(),
                max: self.selector.max_selection(),
                can_confirm: self.selector.can_confirm(),
            },
            projects: self.project_rows(),
            saved_analyses: self.saved_analyses.clone(),
            analysis: self.analysis.as_ref().map(analysis_view),
            dirty: self.dirty,
        }
    }

    /// Returns whether anything visible changed since the last call.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    fn next_request_id(&mut self) -> RequestId {
        self.next_request_id += 1;
        self.next_request_id
    }

    // ---- catalog ----

    pub(crate) fn set_documents(&mut self, documents: Vec<Document>) {
        self.selector.retain_known(&documents);
        self.documents = documents;
        self.mark_dirty();
    }

    pub(crate) fn set_projects(&mut self, projects: Vec<Project>) {
        self.expansion.retain_known(&projects);
        self.projects = projects;
        self.mark_dirty();
    }

    pub(crate) fn set_saved_analyses(&mut self, saved: Vec<SavedAnalysis>) {
        self.saved_analyses = saved;
        self.mark_dirty();
    }

    pub(crate) fn toggle_project(&mut self, project_id: &str) {
        if crate::hierarchy::find_project(&self.projects, project_id).is_some() {
            self.expansion.toggle(project_id);
            self.mark_dirty();
        }
    }

    fn project_rows(&self) -> Vec<ProjectRowView> {
        let mut rows = Vec::new();
        for root in &self.projects {
            self.push_project_rows(root, 0, &mut rows);
        }
        rows
    }

    fn push_project_rows(&self, project: &Project, depth: usize, rows: &mut Vec<ProjectRowView>) {
        let expanded = self.expansion.is_expanded(&project.id);
        rows.push(ProjectRowView {
            project_id: project.id.clone(),
            name: project.name.clone(),
            depth,
            own_documents: own_document_count(project, &self.documents),
            aggregated_documents: expanded
                .then(|| aggregated_document_count(project, &self.documents)),
            expanded,
            has_children: !project.children.is_empty(),
        });
        if expanded {
            for child in &project.children {
                self.push_project_rows(child, depth + 1, rows);
            }
        }
    }

    // ---- selection ----

    pub(crate) fn toggle_selection(&mut self, document_id: &str) {
        let Some(doc) = self.documents.iter().find(|doc| doc.id == document_id) else {
            return;
        };
        if self.selector.toggle(doc) {
            self.mark_dirty();
        }
    }

    pub(crate) fn toggle_select_all(&mut self) {
        if self.selector.toggle_all(&self.documents) {
            self.mark_dirty();
        }
    }

    pub(crate) fn confirm_selection(&mut self) -> Vec<Effect> {
        if !self.selector.can_confirm() {
            return Vec::new();
        }
        let documents = self
            .documents
            .iter()
            .filter(|doc| self.selector.is_selected(&doc.id))
            .map(Document::to_ref)
            .collect();
        self.open_analysis(documents)
    }

    pub(crate) fn open_saved_analysis(&mut self, analysis_id: &str) -> Vec<Effect> {
        let Some(saved) = self
            .saved_analyses
            .iter()
            .find(|saved| saved.id == analysis_id)
        else {
            return Vec::new();
        };
        let documents = saved.documents();
        self.open_analysis(documents)
    }

    // ---- analysis ----

    /// Switches the orchestrator to a document set. Reopening the current set
    /// is a no-op.
    pub(crate) fn open_analysis(&mut self, documents: Vec<DocumentRef>) -> Vec<Effect> {
        let mut session = AnalysisSession::new(documents);
        if self
            .analysis
            .as_ref()
            .is_some_and(|current| current.key == session.key)
        {
            return Vec::new();
        }
        let mut effects = self.close_analysis();
        if session.has_enough_documents() {
            effects.push(Effect::LoadSession {
                key: session.key.clone(),
            });
        } else {
            session.hydrate(None);
        }
        self.analysis = Some(session);
        self.mark_dirty();
        effects
    }

    pub(crate) fn close_analysis(&mut self) -> Vec<Effect> {
        let Some(mut session) = self.analysis.take() else {
            return Vec::new();
        };
        self.mark_dirty();
        if session.query.is_none() {
            return Vec::new();
        }
        let mut effects = session.cancel_query();
        effects.push(session.persist_effect());
        effects
    }

    pub(crate) fn session_loaded(
        &mut self,
        key: &str,
        cached: Option<CachedSession>,
    ) -> Vec<Effect> {
        let request_id = self.next_request_id();
        let Some(session) = self.analysis.as_mut() else {
            return Vec::new();
        };
        if session.key != key || session.hydrated {
            return Vec::new();
        }
        session.hydrate(cached);
        self.dirty = true;
        if session.needs_comparison() {
            vec![session.begin_comparison(request_id)]
        } else {
            Vec::new()
        }
    }

    pub(crate) fn set_query_input(&mut self, text: String) {
        if let Some(session) = self.analysis.as_mut() {
            session.input = text;
            self.dirty = true;
        }
    }

    pub(crate) fn submit_query(&mut self, at: DateTime<Utc>) -> Vec<Effect> {
        let request_id = self.next_request_id();
        let Some(session) = self.analysis.as_mut() else {
            return Vec::new();
        };
        if !session.can_send() {
            return Vec::new();
        }
        let content = std::mem::take(&mut session.input).trim().to_string();
        self.dirty = true;
        session.start_query(content, at, request_id)
    }

    pub(crate) fn cancel_query(&mut self) -> Vec<Effect> {
        let Some(session) = self.analysis.as_mut() else {
            return Vec::new();
        };
        if session.query.is_none() {
            return Vec::new();
        }
        let mut effects = session.cancel_query();
        effects.push(session.persist_effect());
        self.dirty = true;
        effects
    }

    pub(crate) fn retry_message(&mut self, message_id: MessageId, at: DateTime<Utc>) -> Vec<Effect> {
        let request_id = self.next_request_id();
        let Some(session) = self.analysis.as_mut() else {
            return Vec::new();
        };
        let Some(content) = session.take_retry(message_id) else {
            return Vec::new();
        };
        self.dirty = true;
        session.start_query(content, at, request_id)
    }

    pub(crate) fn tick(&mut self, elapsed_ms: u64) -> Vec<Effect> {
        let Some(session) = self.analysis.as_mut() else {
            return Vec::new();
        };
        match session.tick(elapsed_ms) {
            Some(effects) => {
                self.dirty = true;
                effects
            }
            None => Vec::new(),
        }
    }

    pub(crate) fn with_session(
        &mut self,
        apply: impl FnOnce(&mut AnalysisSession) -> Option<Vec<Effect>>,
    ) -> Vec<Effect> {
        let Some(session) = self.analysis.as_mut() else {
            return Vec::new();
        };
        match apply(session) {
            Some(effects) => {
                self.dirty = true;
                effects
            }
            None => Vec::new(),
        }
    }

    pub(crate) fn retry_comparison(&mut self) -> Vec<Effect> {
        let request_id = self.next_request_id();
        let Some(session) = self.analysis.as_mut() else {
            return Vec::new();
        };
        if !session.hydrated || !session.has_enough_documents() {
            return Vec::new();
        }
        if session.comparison_request.is_some() {
            return Vec::new();
        }
        session.reset_comparison();
        self.dirty = true;
        vec![session.begin_comparison(request_id)]
    }

    pub(crate) fn select_tab(&mut self, tab: AnalysisTab) {
        if let Some(session) = self.analysis.as_mut() {
            if session.active_tab != tab {
                session.active_tab = tab;
                self.dirty = true;
            }
        }
    }

    pub(crate) fn clear_conversation(&mut self) -> Vec<Effect> {
        self.with_session(|session| Some(session.clear_conversation()))
    }
}

fn analysis_view(session: &AnalysisSession) -> AnalysisView {
    AnalysisView {
        key: session.key.clone(),
        documents: session.documents.clone(),
        active_tab: session.active_tab,
        input: session.input.clone(),
        phase: session.phase(),
        progress: session.query.as_ref().map(|query| ProgressView {
            percent: query.ramp.percent(),
            remaining_ms: query.ramp.remaining_ms(),
        }),
        can_send: session.can_send(),
        messages: session.messages.clone(),
        comparison: session.comparison.clone(),
        comparison_loading: session.comparison_request.is_some(),
        comparison_error: session.comparison_error.clone(),
        patterns: session.patterns.clone(),
        contradictions: session.contradictions.clone(),
    }
}
