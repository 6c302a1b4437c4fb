//! Docdesk core: pure state machine for document selection, project
//! hierarchy and cross-document analysis, plus the shared data model.
mod analysis;
mod effect;
mod failure;
pub mod hierarchy;
pub mod model;
mod msg;
mod progress;
mod selection;
mod session;
mod state;
mod text;
mod update;
mod view_model;

/// Correlates an effect with the message that answers it.
pub type RequestId = u64;

pub use analysis::{AnalysisTab, QueryPhase, MIN_ANALYSIS_DOCUMENTS};
pub use effect::{Effect, Toast, ToastLevel};
pub use failure::{classify, ErrorInfo, ErrorKind, Failure};
pub use msg::{Msg, Resource};
pub use progress::{
    ProgressRamp, GENERATION_CAP_PERCENT, GENERATION_NOMINAL_MS, RETRIEVAL_NOMINAL_MS,
};
pub use selection::{DocumentSelector, DEFAULT_MAX_SELECTION, DEFAULT_MIN_SELECTION};
pub use session::{session_key, CachedSession, Message, MessageId, MessageRole, MessageStatus};
pub use state::AppState;
pub use text::normalize_answer;
pub use update::update;
pub use view_model::{
    AnalysisView, AppViewModel, DocumentRowView, ProgressView, ProjectRowView, SelectionView,
};
