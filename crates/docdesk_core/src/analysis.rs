//! Cross-document analysis session: query lifecycle, comparison fetch and
//! accumulated patterns/contradictions for one document set.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use desk_logging::desk_debug;

use crate::model::{
    DocumentComparison, DocumentContradiction, DocumentId, DocumentPattern, DocumentRef,
    QueryRequest, QueryResponse, SavedAnalysisDraft,
};
use crate::progress::ProgressRamp;
use crate::session::{session_key, CachedSession, Message, MessageId, MessageRole, MessageStatus};
use crate::text::normalize_answer;
use crate::{classify, Effect, ErrorInfo, Failure, RequestId, Toast};

/// Cross-document features need at least this many documents.
pub const MIN_ANALYSIS_DOCUMENTS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalysisTab {
    #[default]
    Chat,
    Comparison,
    Patterns,
    Contradictions,
}

/// Phase of the in-flight query; `Idle` when nothing is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryPhase {
    #[default]
    Idle,
    Retrieving,
    Generating,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct InFlightQuery {
    pub(crate) request_id: RequestId,
    pub(crate) placeholder: MessageId,
    pub(crate) content: String,
    pub(crate) phase: QueryPhase,
    pub(crate) ramp: ProgressRamp,
}

impl InFlightQuery {
    fn request_sent(&self) -> bool {
        self.phase == QueryPhase::Generating
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AnalysisSession {
    pub(crate) key: String,
    pub(crate) documents: Vec<DocumentRef>,
    pub(crate) hydrated: bool,
    pub(crate) messages: Vec<Message>,
    next_message_id: MessageId,
    pub(crate) comparison: Option<DocumentComparison>,
    pub(crate) comparison_error: Option<ErrorInfo>,
    pub(crate) comparison_request: Option<RequestId>,
    pub(crate) patterns: Vec<DocumentPattern>,
    pub(crate) contradictions: Vec<DocumentContradiction>,
    pub(crate) active_tab: AnalysisTab,
    pub(crate) query: Option<InFlightQuery>,
    pub(crate) input: String,
}

impl AnalysisSession {
    /// Repeated ids collapse to their first occurrence.
    pub(crate) fn new(mut documents: Vec<DocumentRef>) -> Self {
        let mut seen = HashSet::new();
        documents.retain(|doc| seen.insert(doc.id.clone()));
        let ids: Vec<DocumentId> = documents.iter().map(|doc| doc.id.clone()).collect();
        Self {
            key: session_key(&ids),
            documents,
            hydrated: false,
            messages: Vec::new(),
            next_message_id: 1,
            comparison: None,
            comparison_error: None,
            comparison_request: None,
            patterns: Vec::new(),
            contradictions: Vec::new(),
            active_tab: AnalysisTab::default(),
            query: None,
            input: String::new(),
        }
    }

    pub(crate) fn document_ids(&self) -> Vec<DocumentId> {
        self.documents.iter().map(|doc| doc.id.clone()).collect()
    }

    pub(crate) fn has_enough_documents(&self) -> bool {
        self.documents.len() >= MIN_ANALYSIS_DOCUMENTS
    }

    pub(crate) fn can_send(&self) -> bool {
        self.hydrated && self.has_enough_documents() && !self.input.trim().is_empty()
    }

    pub(crate) fn phase(&self) -> QueryPhase {
        self.query
            .as_ref()
            .map(|query| query.phase)
            .unwrap_or(QueryPhase::Idle)
    }

    /// Installs a cached snapshot. Pending messages from an interrupted run
    /// come back as cancelled.
    pub(crate) fn hydrate(&mut self, cached: Option<CachedSession>) {
        if let Some(cached) = cached {
            self.messages = cached.messages;
            for message in &mut self.messages {
                if message.status.is_pending() {
                    message.status = MessageStatus::Cancelled;
                }
            }
            self.comparison = cached.comparison;
            self.patterns = cached.patterns;
            self.contradictions = cached.contradictions;
        }
        self.next_message_id = self
            .messages
            .iter()
            .map(|message| message.id)
            .max()
            .unwrap_or(0)
            + 1;
        self.hydrated = true;
    }

    pub(crate) fn snapshot(&self) -> CachedSession {
        CachedSession {
            messages: self.messages.clone(),
            comparison: self.comparison.clone(),
            patterns: self.patterns.clone(),
            contradictions: self.contradictions.clone(),
        }
    }

    pub(crate) fn persist_effect(&self) -> Effect {
        Effect::PersistSession {
            key: self.key.clone(),
            session: self.snapshot(),
        }
    }

    pub(crate) fn saved_analysis_draft(&self) -> SavedAnalysisDraft {
        SavedAnalysisDraft {
            document_ids: self.document_ids(),
            document_names: self.documents.iter().map(|doc| doc.name.clone()).collect(),
            has_comparison: self.comparison.is_some(),
            has_patterns: !self.patterns.is_empty(),
            has_contradictions: !self.contradictions.is_empty(),
            has_messages: !self.messages.is_empty(),
        }
    }

    fn sync_effect(&self) -> Effect {
        Effect::SyncSavedAnalysis {
            draft: self.saved_analysis_draft(),
        }
    }

    fn next_id(&mut self) -> MessageId {
        let id = self.next_message_id;
        self.next_message_id += 1;
        id
    }

    fn message_mut(&mut self, id: MessageId) -> Option<&mut Message> {
        self.messages.iter_mut().find(|message| message.id == id)
    }

    // ---- comparison ----

    pub(crate) fn needs_comparison(&self) -> bool {
        self.hydrated
            && self.has_enough_documents()
            && self.comparison.is_none()
            && self.comparison_error.is_none()
            && self.comparison_request.is_none()
    }

    pub(crate) fn begin_comparison(&mut self, request_id: RequestId) -> Effect {
        self.comparison_request = Some(request_id);
        Effect::FetchComparison {
            request_id,
            document_ids: self.document_ids(),
        }
    }

    /// Drops prior comparison state ahead of a manual refetch.
    pub(crate) fn reset_comparison(&mut self) {
        self.comparison = None;
        self.comparison_error = None;
        self.comparison_request = None;
    }

    pub(crate) fn apply_comparison(
        &mut self,
        request_id: RequestId,
        comparison: DocumentComparison,
    ) -> Option<Vec<Effect>> {
        if self.comparison_request != Some(request_id) {
            desk_debug!("Ignoring stale comparison response {}", request_id);
            return None;
        }
        self.comparison_request = None;
        self.comparison_error = None;
        self.comparison = Some(comparison);
        Some(vec![self.persist_effect(), self.sync_effect()])
    }

    pub(crate) fn apply_comparison_failure(
        &mut self,
        request_id: RequestId,
        failure: &Failure,
    ) -> Option<Vec<Effect>> {
        if self.comparison_request != Some(request_id) {
            desk_debug!("Ignoring stale comparison failure {}", request_id);
            return None;
        }
        self.comparison_request = None;
        let info = classify(failure);
        let effects = if info.is_cancelled() {
            Vec::new()
        } else {
            vec![Effect::ShowToast(Toast::error(format!(
                "Comparison failed: {}",
                info.message
            )))]
        };
        self.comparison_error = Some(info);
        Some(effects)
    }

    // ---- query lifecycle ----

    /// Starts a fresh query, cancelling any query still in flight first.
    pub(crate) fn start_query(
        &mut self,
        content: String,
        at: DateTime<Utc>,
        request_id: RequestId,
    ) -> Vec<Effect> {
        let had_previous = self.query.is_some();
        let mut effects = self.cancel_query();
        let user_id = self.next_id();
        self.messages.push(Message::user(user_id, content.clone(), at));
        let placeholder = self.next_id();
        self.messages.push(Message::placeholder(placeholder, at));
        self.query = Some(InFlightQuery {
            request_id,
            placeholder,
            content,
            phase: QueryPhase::Retrieving,
            ramp: ProgressRamp::retrieval(),
        });
        self.active_tab = AnalysisTab::Chat;
        if had_previous {
            effects.push(self.persist_effect());
        }
        effects
    }

    /// Aborts the in-flight query, if any. The placeholder ends cancelled.
    pub(crate) fn cancel_query(&mut self) -> Vec<Effect> {
        let Some(query) = self.query.take() else {
            return Vec::new();
        };
        if let Some(message) = self.message_mut(query.placeholder) {
            message.status = MessageStatus::Cancelled;
            message.error = None;
            message.can_retry = false;
        }
        if query.request_sent() {
            vec![Effect::CancelQuery {
                request_id: query.request_id,
            }]
        } else {
            Vec::new()
        }
    }

    /// Advances the cosmetic ramps. The request goes out once retrieval ends.
    pub(crate) fn tick(&mut self, elapsed_ms: u64) -> Option<Vec<Effect>> {
        let query = self.query.as_mut()?;
        query.ramp.advance(elapsed_ms);
        if query.phase != QueryPhase::Retrieving || !query.ramp.is_complete() {
            return Some(Vec::new());
        }
        query.phase = QueryPhase::Generating;
        query.ramp = ProgressRamp::generation();
        let request_id = query.request_id;
        let placeholder = query.placeholder;
        let content = query.content.clone();
        let request = QueryRequest {
            document_ids: self.document_ids(),
            query: content,
            include_patterns: true,
            include_contradictions: true,
        };
        if let Some(message) = self.message_mut(placeholder) {
            message.status = MessageStatus::Generating;
        }
        Some(vec![Effect::SendQuery {
            request_id,
            request,
        }])
    }

    fn take_query(&mut self, request_id: RequestId) -> Option<InFlightQuery> {
        match &self.query {
            Some(query) if query.request_id == request_id => self.query.take(),
            _ => {
                desk_debug!("Ignoring stale query result {}", request_id);
                None
            }
        }
    }

    pub(crate) fn complete_query(
        &mut self,
        request_id: RequestId,
        response: QueryResponse,
    ) -> Option<Vec<Effect>> {
        let query = self.take_query(request_id)?;
        if let Some(message) = self.message_mut(query.placeholder) {
            message.content = normalize_answer(&response.answer);
            message.citations = response.citations;
            message.timestamp = response.generated_at;
            message.status = MessageStatus::Completed;
            message.error = None;
            message.can_retry = false;
        }
        let new_patterns = merge_by_id(
            &mut self.patterns,
            response.patterns.unwrap_or_default(),
            |pattern| &pattern.id,
        );
        let new_contradictions = merge_by_id(
            &mut self.contradictions,
            response.contradictions.unwrap_or_default(),
            |contradiction| &contradiction.id,
        );
        if new_contradictions > 0 {
            self.active_tab = AnalysisTab::Contradictions;
        } else if new_patterns > 0 {
            self.active_tab = AnalysisTab::Patterns;
        }
        Some(vec![self.persist_effect(), self.sync_effect()])
    }

    pub(crate) fn fail_query(
        &mut self,
        request_id: RequestId,
        failure: &Failure,
    ) -> Option<Vec<Effect>> {
        let query = self.take_query(request_id)?;
        let info = classify(failure);
        if let Some(message) = self.message_mut(query.placeholder) {
            if info.is_cancelled() {
                message.status = MessageStatus::Cancelled;
                message.error = None;
                message.can_retry = false;
            } else {
                message.status = MessageStatus::Error;
                message.error = Some(info.message.clone());
                message.can_retry = info.can_retry;
            }
        }
        let mut effects = vec![self.persist_effect()];
        if !info.is_cancelled() {
            effects.push(Effect::ShowToast(Toast::error(info.message)));
        }
        Some(effects)
    }

    /// Content of the user prompt behind a retryable failed answer.
    ///
    /// Removes both the failed answer and its prompt so the retry starts clean.
    pub(crate) fn take_retry(&mut self, message_id: MessageId) -> Option<String> {
        let idx = self.messages.iter().position(|message| {
            message.id == message_id
                && message.role == MessageRole::Assistant
                && message.status == MessageStatus::Error
                && message.can_retry
        })?;
        let prompt_idx = self.messages[..idx]
            .iter()
            .rposition(|message| message.role == MessageRole::User)?;
        self.messages.remove(idx);
        let prompt = self.messages.remove(prompt_idx);
        Some(prompt.content)
    }

    pub(crate) fn clear_conversation(&mut self) -> Vec<Effect> {
        let mut effects = self.cancel_query();
        self.messages.clear();
        effects.push(Effect::ClearCachedConversation {
            key: self.key.clone(),
        });
        effects.push(self.sync_effect());
        effects
    }
}

/// Appends items whose id is not present yet; returns how many were added.
fn merge_by_id<T>(existing: &mut Vec<T>, incoming: Vec<T>, id: impl Fn(&T) -> &String) -> usize {
    let before = existing.len();
    for item in incoming {
        if !existing.iter().any(|known| id(known) == id(&item)) {
            existing.push(item);
        }
    }
    existing.len() - before
}
