use chrono::{DateTime, Utc};

use crate::model::{
    Document, DocumentComparison, DocumentId, Project, ProjectId, QueryResponse, SavedAnalysis,
};
use crate::session::{CachedSession, MessageId};
use crate::{AnalysisTab, Failure, RequestId};

/// Which catalog list a load failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Documents,
    Projects,
    SavedAnalyses,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Application finished booting; request the initial catalog.
    Started,
    DocumentsLoaded(Vec<Document>),
    ProjectsLoaded(Vec<Project>),
    SavedAnalysesLoaded(Vec<SavedAnalysis>),
    LoadFailed { resource: Resource, failure: Failure },
    /// User expanded or collapsed a project node.
    ProjectToggled { project_id: ProjectId },
    SelectorToggled { document_id: DocumentId },
    SelectorToggleAll,
    /// User confirmed the current multi-document selection.
    SelectionConfirmed,
    /// User picked an entry from the recent analyses list.
    SavedAnalysisOpened { analysis_id: String },
    AnalysisClosed,
    /// Cache lookup result for a session key.
    SessionLoaded {
        key: String,
        session: Option<CachedSession>,
    },
    QueryInputChanged(String),
    QuerySubmitted { at: DateTime<Utc> },
    CancelClicked,
    RetryClicked {
        message_id: MessageId,
        at: DateTime<Utc>,
    },
    QueryCompleted {
        request_id: RequestId,
        response: QueryResponse,
    },
    QueryFailed {
        request_id: RequestId,
        failure: Failure,
    },
    ComparisonLoaded {
        request_id: RequestId,
        comparison: DocumentComparison,
    },
    ComparisonFailed {
        request_id: RequestId,
        failure: Failure,
    },
    ComparisonRetryClicked,
    TabSelected(AnalysisTab),
    ClearConversation,
    /// UI timer tick; drives the simulated progress ramps.
    Tick { elapsed_ms: u64 },
}
