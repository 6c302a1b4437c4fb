use docdesk_core::model::{
    Document, DocumentComparison, DocumentId, DocumentStatus, Project, ProjectId, QueryResponse,
    SavedAnalysis, User,
};
use docdesk_core::{Failure, RequestId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("request cancelled")]
    Cancelled,
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("http status {status}")]
    Status {
        status: u16,
        /// Error text extracted from the response body, if any.
        message: Option<String>,
    },
    #[error("could not decode response: {0}")]
    Decode(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl From<ApiError> for Failure {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Cancelled => Failure::Cancelled,
            ApiError::Timeout => Failure::Timeout,
            ApiError::Network(msg) => Failure::Network(msg),
            ApiError::Status { status, message } => Failure::Http { status, message },
            ApiError::Decode(msg) => Failure::Decode(msg),
            ApiError::InvalidRequest(msg) => Failure::Other(msg),
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("could not start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("could not build http client: {0}")]
    Client(#[from] ApiError),
}

/// Results reported back by the engine thread.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    DocumentsLoaded(Result<Vec<Document>, ApiError>),
    ProjectsLoaded(Result<Vec<Project>, ApiError>),
    SavedAnalysesLoaded(Result<Vec<SavedAnalysis>, ApiError>),
    ComparisonFinished {
        request_id: RequestId,
        result: Result<DocumentComparison, ApiError>,
    },
    QueryFinished {
        request_id: RequestId,
        result: Result<QueryResponse, ApiError>,
    },
    SignedIn(User),
    SignedOut,
    AuthFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Query parameters for `GET /documents`. Unset fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<DocumentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

/// One page of the document listing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocumentPage {
    pub documents: Vec<Document>,
    pub total: Option<u64>,
}

/// Accepts either a bare JSON array or an object wrapping the items.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum ListBody<T> {
    Bare(Vec<T>),
    Wrapped {
        #[serde(alias = "items", alias = "documents", alias = "projects")]
        data: Vec<T>,
        #[serde(default)]
        total: Option<u64>,
    },
}

impl<T> ListBody<T> {
    pub(crate) fn into_parts(self) -> (Vec<T>, Option<u64>) {
        match self {
            ListBody::Bare(items) => (items, None),
            ListBody::Wrapped { data, total } => (data, total),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkAction {
    Delete,
    Reprocess,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BulkRequest<'a> {
    pub action: BulkAction,
    pub document_ids: &'a [DocumentId],
}

/// Backend processing health, as reported by `GET /documents/health`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentHealth {
    pub status: String,
    #[serde(default)]
    pub processing: u64,
    #[serde(default)]
    pub ready: u64,
    #[serde(default)]
    pub failed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}
