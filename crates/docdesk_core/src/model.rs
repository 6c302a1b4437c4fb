//! Wire-level data model shared by the state machine and the REST client.
//!
//! Field names follow the backend's camelCase JSON.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type DocumentId = String;
pub type ProjectId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    #[default]
    Processing,
    Ready,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: DocumentId,
    pub name: String,
    /// File extension or mime-derived type label.
    #[serde(rename = "type")]
    pub doc_type: String,
    pub status: DocumentStatus,
    #[serde(default)]
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default)]
    pub uploaded_by: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
}

impl Document {
    pub fn is_ready(&self) -> bool {
        self.status == DocumentStatus::Ready
    }

    pub fn to_ref(&self) -> DocumentRef {
        DocumentRef {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

/// Minimal identity of a document taking part in an analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub id: DocumentId,
    pub name: String,
}

/// Node of the server-supplied project tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub children: Vec<Project>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    #[default]
    Member,
    Viewer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub user_id: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub document_id: DocumentId,
    #[serde(default)]
    pub document_name: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DocumentComparison {
    #[serde(default)]
    pub similarities: Vec<String>,
    #[serde(default)]
    pub differences: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPattern {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub document_ids: Vec<DocumentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentContradiction {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub document_ids: Vec<DocumentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub document_ids: Vec<DocumentId>,
    pub query: String,
    pub include_patterns: bool,
    pub include_contradictions: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub answer: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub patterns: Option<Vec<DocumentPattern>>,
    #[serde(default)]
    pub contradictions: Option<Vec<DocumentContradiction>>,
}

/// Flags describing which analysis artifacts exist for a document set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedAnalysisDraft {
    pub document_ids: Vec<DocumentId>,
    pub document_names: Vec<String>,
    pub has_comparison: bool,
    pub has_patterns: bool,
    pub has_contradictions: bool,
    pub has_messages: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedAnalysis {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub draft: SavedAnalysisDraft,
}

impl SavedAnalysis {
    pub fn documents(&self) -> Vec<DocumentRef> {
        self.draft
            .document_ids
            .iter()
            .enumerate()
            .map(|(idx, id)| DocumentRef {
                id: id.clone(),
                name: self
                    .draft
                    .document_names
                    .get(idx)
                    .cloned()
                    .unwrap_or_else(|| id.clone()),
            })
            .collect()
    }
}
