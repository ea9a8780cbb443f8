use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::app::model::{InsightsStatus, SessionView};
use crate::document::Document;
use crate::insights::DocumentInsights;
use crate::notes::NoteStore;
use crate::viewer::{AUTOPLAY_INTERVAL, ViewerEvent, ViewerSession};

pub struct Session {
    pub document_id: Uuid,
    pub viewer: ViewerSession,
    pub insights: InsightsStatus,
}

/// Live viewer sessions held in memory. Each session owns its viewer (and
/// through it the document's note store) and gets a dedicated autoplay
/// ticker task that dies with the session.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<Mutex<HashMap<Uuid, Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a session over a document and starts its autoplay ticker.
    pub async fn open(&self, document: &Document, data_dir: &Path) -> Uuid {
        let notes = NoteStore::open(data_dir, &document.id.to_string());
        let session = Session {
            document_id: document.id,
            viewer: ViewerSession::new(document.page_count(), notes),
            insights: InsightsStatus::Pending,
        };

        let id = Uuid::new_v4();
        self.inner.lock().await.insert(id, session);
        self.spawn_autoplay_ticker(id);
        tracing::info!(session = %id, document = %document.id, "opened viewer session");
        id
    }

    pub async fn apply(&self, id: Uuid, event: ViewerEvent) -> Option<SessionView> {
        let mut sessions = self.inner.lock().await;
        let session = sessions.get_mut(&id)?;
        session.viewer.apply(event);
        Some(view(id, session))
    }

    pub async fn snapshot(&self, id: Uuid) -> Option<SessionView> {
        let sessions = self.inner.lock().await;
        sessions.get(&id).map(|session| view(id, session))
    }

    pub async fn set_insights(&self, id: Uuid, insights: DocumentInsights) {
        let mut sessions = self.inner.lock().await;
        if let Some(session) = sessions.get_mut(&id) {
            session.insights = InsightsStatus::Ready { insights };
        }
    }

    pub async fn close(&self, id: Uuid) -> bool {
        let removed = self.inner.lock().await.remove(&id).is_some();
        if removed {
            tracing::info!(session = %id, "closed viewer session");
        }
        removed
    }

    /// The ticker fires unconditionally; the tick event is a no-op while
    /// autoplay is off, and the task exits once the session is gone.
    fn spawn_autoplay_ticker(&self, id: Uuid) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let mut ticks = tokio::time::interval(AUTOPLAY_INTERVAL);
            ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            ticks.tick().await; // first tick completes immediately
            loop {
                ticks.tick().await;
                let mut sessions = inner.lock().await;
                let Some(session) = sessions.get_mut(&id) else {
                    break;
                };
                session.viewer.apply(ViewerEvent::AutoplayTick);
            }
        });
    }
}

fn view(id: Uuid, session: &Session) -> SessionView {
    SessionView {
        id,
        document_id: session.document_id,
        total: session.viewer.total(),
        state: session.viewer.state().clone(),
        fullscreen: session.viewer.fullscreen(),
        can_go_next: session.viewer.can_go_next(),
        can_go_prev: session.viewer.can_go_prev(),
        insights: session.insights.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PageImage;
    use crate::insights;

    fn doc(pages: usize) -> Document {
        Document::new(
            "t",
            (0..pages)
                .map(|i| PageImage(format!("data:image/png;base64,{i}")))
                .collect(),
        )
    }

    #[tokio::test]
    async fn open_apply_snapshot_close() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SessionRegistry::new();
        let id = registry.open(&doc(6), dir.path()).await;

        let after_next = registry.apply(id, ViewerEvent::Next).await.unwrap();
        assert_eq!(after_next.state.current_index, 2);

        let snapshot = registry.snapshot(id).await.unwrap();
        assert_eq!(snapshot.total, 6);
        assert!(snapshot.can_go_next);

        assert!(registry.close(id).await);
        assert!(!registry.close(id).await);
        assert!(registry.snapshot(id).await.is_none());
    }

    #[tokio::test]
    async fn insights_move_from_pending_to_ready() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SessionRegistry::new();
        let id = registry.open(&doc(1), dir.path()).await;

        let snapshot = registry.snapshot(id).await.unwrap();
        assert!(matches!(snapshot.insights, InsightsStatus::Pending));

        registry.set_insights(id, insights::fallback("t")).await;
        let snapshot = registry.snapshot(id).await.unwrap();
        assert!(matches!(snapshot.insights, InsightsStatus::Ready { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn autoplay_ticker_advances_only_while_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SessionRegistry::new();
        let id = registry.open(&doc(6), dir.path()).await;

        tokio::time::sleep(AUTOPLAY_INTERVAL * 2).await;
        let snapshot = registry.snapshot(id).await.unwrap();
        assert_eq!(snapshot.state.current_index, 0);

        registry.apply(id, ViewerEvent::ToggleAutoplay).await.unwrap();
        tokio::time::sleep(AUTOPLAY_INTERVAL + std::time::Duration::from_millis(10)).await;
        let snapshot = registry.snapshot(id).await.unwrap();
        assert_eq!(snapshot.state.current_index, 2);
    }
}
