// src/workflow/history.rs
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use crate::models::EventHistoryEntry;
use crate::repositories::RepackagingStore;

pub const EMPTY_HISTORY: &str = "No repackaging events recorded yet.";

#[derive(Debug, Clone, PartialEq)]
pub enum HistoryState {
    /// Nothing requested yet
    Idle,
    Loading,
    Error(String),
    Empty,
    Loaded(Vec<EventHistoryEntry>),
}

impl HistoryState {
    pub fn is_loading(&self) -> bool {
        matches!(self, HistoryState::Loading)
    }

    /// Inline message for the error and empty states.
    pub fn notice(&self) -> Option<&str> {
        match self {
            HistoryState::Error(message) => Some(message.as_str()),
            HistoryState::Empty => Some(EMPTY_HISTORY),
            _ => None,
        }
    }
}

/// Read-only listing of the signed-in user's events, newest first.
pub struct HistoryView {
    store: Arc<dyn RepackagingStore>,
    limit: i64,
    in_flight: AtomicBool,
    state: Mutex<HistoryState>,
}

impl HistoryView {
    pub fn new(store: Arc<dyn RepackagingStore>, limit: i64) -> Self {
        Self {
            store,
            limit,
            in_flight: AtomicBool::new(false),
            state: Mutex::new(HistoryState::Idle),
        }
    }

    pub async fn state(&self) -> HistoryState {
        self.state.lock().await.clone()
    }

    /// Fetches the history of `owner_id`. Returns `false` when a load is
    /// already running; that call is ignored.
    pub async fn load(&self, owner_id: &str) -> bool {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }

        *self.state.lock().await = HistoryState::Loading;
        let result = self.store.list_events(owner_id, self.limit).await;

        let next = match result {
            Ok(entries) if entries.is_empty() => HistoryState::Empty,
            Ok(entries) => HistoryState::Loaded(entries),
            Err(err) => {
                log::warn!("Loading history failed: {}", err);
                HistoryState::Error(err.detail())
            }
        };
        *self.state.lock().await = next;
        self.in_flight.store(false, Ordering::SeqCst);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::test_support::{history_entry, MockStore};

    #[actix_rt::test]
    async fn test_zero_rows_is_empty_not_error() {
        let view = HistoryView::new(Arc::new(MockStore::default()), 200);
        assert_eq!(view.state().await, HistoryState::Idle);
        assert!(view.load("user-a").await);
        assert_eq!(view.state().await, HistoryState::Empty);
        assert_eq!(view.state().await.notice(), Some(EMPTY_HISTORY));
    }

    #[actix_rt::test]
    async fn test_store_error_is_shown_and_loading_stops() {
        let view = HistoryView::new(Arc::new(MockStore::failing("JWT expired")), 200);
        view.load("user-a").await;
        let state = view.state().await;
        assert_eq!(state, HistoryState::Error("JWT expired".to_string()));
        assert!(!state.is_loading());
    }

    #[actix_rt::test]
    async fn test_loaded_entries_and_limit() {
        let store = Arc::new(MockStore {
            history: (1..=5).rev().map(history_entry).collect(),
            ..Default::default()
        });
        let view = HistoryView::new(store.clone(), 3);
        view.load("user-a").await;

        match view.state().await {
            HistoryState::Loaded(entries) => {
                let ids: Vec<i64> = entries.iter().map(|e| e.id).collect();
                assert_eq!(ids, vec![5, 4, 3]);
            }
            other => panic!("unexpected state: {:?}", other),
        }
        assert_eq!(store.history_reads.lock().unwrap()[0], ("user-a".to_string(), 3));
    }

    #[actix_rt::test]
    async fn test_reload_ignored_while_loading() {
        let store = Arc::new(MockStore {
            history: vec![history_entry(1)],
            gated_text: Some("user-a".to_string()),
            ..Default::default()
        });
        let view = HistoryView::new(store.clone(), 200);

        let (first, second) = futures::join!(view.load("user-a"), async {
            let loading = view.state().await;
            let accepted = view.load("user-a").await;
            store.gate.notify_one();
            (loading, accepted)
        });

        assert!(first);
        assert_eq!(second, (HistoryState::Loading, false));
        assert_eq!(store.history_reads.lock().unwrap().len(), 1);
        assert!(matches!(view.state().await, HistoryState::Loaded(_)));
    }
}
