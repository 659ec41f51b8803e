// src/workflow/picker.rs
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use crate::config::CatalogConfig;
use crate::models::{Medication, MedicationQuery};
use crate::pagination::PageWindow;
use crate::repositories::RepackagingStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Search-as-you-type: below `min_chars` nothing is requested.
    Incremental { limit: i64, min_chars: usize },
    /// Page-addressed listing; empty text lists the whole catalog.
    Paginated { page_size: i64 },
}

impl SearchMode {
    pub fn incremental(config: &CatalogConfig) -> Self {
        SearchMode::Incremental {
            limit: config.search_limit,
            min_chars: config.search_min_chars,
        }
    }

    pub fn paginated(config: &CatalogConfig) -> Self {
        SearchMode::Paginated {
            page_size: config.catalog_page_size,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The response was applied to the picker state.
    Applied,
    /// Query too short; results cleared without a request.
    Skipped,
    /// A newer search started meanwhile; the response was dropped.
    Stale,
    /// Navigation not available from the current page.
    Unavailable,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PickerState {
    pub query: String,
    pub results: Vec<Medication>,
    /// 0-based, paginated mode only
    pub page: i64,
    pub loading: bool,
    pub error: Option<String>,
}

/// Medication search shared by the recorder and the catalog browser.
///
/// Every search takes a new generation number; a response is applied only
/// if its generation is still the latest when it arrives.
pub struct MedicationPicker {
    store: Arc<dyn RepackagingStore>,
    mode: SearchMode,
    generation: AtomicU64,
    state: Mutex<PickerState>,
}

impl MedicationPicker {
    pub fn new(store: Arc<dyn RepackagingStore>, mode: SearchMode) -> Self {
        Self {
            store,
            mode,
            generation: AtomicU64::new(0),
            state: Mutex::new(PickerState::default()),
        }
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    pub async fn snapshot(&self) -> PickerState {
        self.state.lock().await.clone()
    }

    /// New search text. Resets to the first page.
    pub async fn set_query(&self, text: &str) -> SearchOutcome {
        {
            let mut state = self.state.lock().await;
            state.query = text.to_string();
            state.page = 0;
        }
        self.run().await
    }

    /// Re-runs the current query on the current page.
    pub async fn refresh(&self) -> SearchOutcome {
        self.run().await
    }

    pub async fn next_page(&self) -> SearchOutcome {
        {
            let mut state = self.state.lock().await;
            match self.window_of(&state) {
                Some(window) if window.has_next() && !state.loading => state.page += 1,
                _ => return SearchOutcome::Unavailable,
            }
        }
        self.run().await
    }

    pub async fn prev_page(&self) -> SearchOutcome {
        {
            let mut state = self.state.lock().await;
            match self.window_of(&state) {
                Some(window) if window.has_prev() && !state.loading => state.page -= 1,
                _ => return SearchOutcome::Unavailable,
            }
        }
        self.run().await
    }

    /// Clears the text and reloads the first page.
    pub async fn clear(&self) -> SearchOutcome {
        self.set_query("").await
    }

    /// Current page window, paginated mode only.
    pub async fn window(&self) -> Option<PageWindow> {
        let state = self.state.lock().await;
        self.window_of(&state)
    }

    /// Result with this SAP code in the current list.
    pub async fn find(&self, sap_code: i64) -> Option<Medication> {
        self.state
            .lock()
            .await
            .results
            .iter()
            .find(|m| m.sap_code == sap_code)
            .cloned()
    }

    fn window_of(&self, state: &PickerState) -> Option<PageWindow> {
        match self.mode {
            SearchMode::Paginated { page_size } => {
                Some(PageWindow::new(state.page, page_size, state.results.len() as i64))
            }
            SearchMode::Incremental { .. } => None,
        }
    }

    async fn run(&self) -> SearchOutcome {
        let token = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let query = {
            let mut state = self.state.lock().await;
            let query = match self.mode {
                SearchMode::Incremental { limit, min_chars } => {
                    if state.query.trim().chars().count() < min_chars {
                        state.results.clear();
                        state.loading = false;
                        state.error = None;
                        return SearchOutcome::Skipped;
                    }
                    MedicationQuery::new(&state.query, 0, limit)
                }
                SearchMode::Paginated { page_size } => {
                    MedicationQuery::new(&state.query, state.page * page_size, page_size)
                }
            };
            state.loading = true;
            state.error = None;
            query
        };

        let response = self.store.search_medications(&query).await;

        let mut state = self.state.lock().await;
        if self.generation.load(Ordering::SeqCst) != token {
            log::debug!("Discarding stale search response for {:?}", query.text);
            return SearchOutcome::Stale;
        }

        state.loading = false;
        match response {
            Ok(results) => state.results = results,
            Err(err) => {
                log::warn!("Medication search failed: {}", err);
                state.results.clear();
                state.error = Some(err.detail());
            }
        }
        SearchOutcome::Applied
    }
}
