//! Docdesk engine: REST client, cancellable request execution, local store
//! and auth session.
mod auth;
mod client;
mod engine;
mod store;
mod types;

pub use auth::{AuthError, AuthSession};
pub use client::{cancellable, ApiSettings, DocumentApi, ReqwestApiClient};
pub use engine::EngineHandle;
pub use store::{LocalStore, Namespace, StoreError};
pub use types::{
    ApiError, BulkAction, DocumentFilter, DocumentHealth, DocumentPage, EngineError,
    EngineEvent, LoginResponse, SortOrder,
};
