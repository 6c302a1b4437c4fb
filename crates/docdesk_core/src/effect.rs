use crate::model::{DocumentId, QueryRequest, SavedAnalysisDraft};
use crate::session::CachedSession;
use crate::RequestId;

/// Side effects requested by [`crate::update`]; executed by the platform.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    LoadDocuments,
    LoadProjects,
    LoadSavedAnalyses,
    /// Read the cached session for `key`; answered with `Msg::SessionLoaded`.
    LoadSession { key: String },
    FetchComparison {
        request_id: RequestId,
        document_ids: Vec<DocumentId>,
    },
    SendQuery {
        request_id: RequestId,
        request: QueryRequest,
    },
    CancelQuery { request_id: RequestId },
    PersistSession { key: String, session: CachedSession },
    ClearCachedConversation { key: String },
    /// Best-effort mirror of session flags to the saved-analysis index.
    SyncSavedAnalysis { draft: SavedAnalysisDraft },
    ShowToast(Toast),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub level: ToastLevel,
    pub text: String,
}

impl Toast {
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Error,
            text: text.into(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Info,
            text: text.into(),
        }
    }
}
