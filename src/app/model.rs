use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::Document;
use crate::insights::DocumentInsights;
use crate::viewer::ViewerState;

/// Import request: pages arrive as data URLs, already rasterized by the
/// client (or by the CLI import path).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDocumentRequest {
    pub title: String,
    pub pages: Vec<String>,
}

/// Library listing entry. Page payloads stay out of listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: Uuid,
    pub title: String,
    pub page_count: usize,
    pub created_at: DateTime<Utc>,
    pub summary: Option<String>,
}

impl DocumentSummary {
    pub fn of(document: &Document) -> Self {
        Self {
            id: document.id,
            title: document.title.clone(),
            page_count: document.page_count(),
            created_at: document.created_at,
            summary: document.summary.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub document_id: Uuid,
}

/// Analysis state carried by a session while the spawned analysis task runs.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InsightsStatus {
    Pending,
    Ready { insights: DocumentInsights },
}

/// Snapshot of a live session returned by the session routes.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub document_id: Uuid,
    pub total: usize,
    pub state: ViewerState,
    pub fullscreen: bool,
    pub can_go_next: bool,
    pub can_go_prev: bool,
    pub insights: InsightsStatus,
}
