use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    Citation, DocumentComparison, DocumentContradiction, DocumentId, DocumentPattern,
};

pub type MessageId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    #[default]
    Idle,
    Retrieving,
    Generating,
    Completed,
    Error,
    Cancelled,
}

impl MessageStatus {
    pub fn is_pending(self) -> bool {
        matches!(self, MessageStatus::Retrieving | MessageStatus::Generating)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub role: MessageRole,
    pub content: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub status: MessageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub can_retry: bool,
}

impl Message {
    pub(crate) fn user(id: MessageId, content: String, at: DateTime<Utc>) -> Self {
        Self {
            id,
            role: MessageRole::User,
            content,
            citations: Vec::new(),
            timestamp: at,
            status: MessageStatus::Completed,
            error: None,
            can_retry: false,
        }
    }

    pub(crate) fn placeholder(id: MessageId, at: DateTime<Utc>) -> Self {
        Self {
            id,
            role: MessageRole::Assistant,
            content: String::new(),
            citations: Vec::new(),
            timestamp: at,
            status: MessageStatus::Retrieving,
            error: None,
            can_retry: false,
        }
    }
}

/// Cache key for a document set: ids sorted, deduplicated and comma-joined.
///
/// The key is independent of selection order. A `,` or `\` inside an id is
/// backslash-escaped so distinct sets never share a key.
pub fn session_key(document_ids: &[DocumentId]) -> String {
    let mut ids: Vec<&str> = document_ids.iter().map(String::as_str).collect();
    ids.sort_unstable();
    ids.dedup();
    ids.iter()
        .map(|id| id.replace('\\', "\\\\").replace(',', "\\,"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Persistable snapshot of a cross-document session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CachedSession {
    pub messages: Vec<Message>,
    pub comparison: Option<DocumentComparison>,
    pub patterns: Vec<DocumentPattern>,
    pub contradictions: Vec<DocumentContradiction>,
}

impl CachedSession {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
            && self.comparison.is_none()
            && self.patterns.is_empty()
            && self.contradictions.is_empty()
    }
}
