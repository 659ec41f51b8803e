// src/workflow/screens.rs
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use crate::config::CatalogConfig;
use crate::repositories::RepackagingStore;
use crate::session::IdentityProvider;
use super::form::{EventForm, SubmitOutcome};
use super::history::HistoryView;
use super::picker::{MedicationPicker, SearchMode};
use super::session_gate::{GateDecision, SessionGate, SessionWatch};
use super::Route;

// ==================== EVENT RECORDER ====================

/// Search-driven picker plus the entry form, behind the session gate.
pub struct RecorderScreen {
    identity: Arc<dyn IdentityProvider>,
    gate: SessionGate,
    picker: MedicationPicker,
    form: EventForm,
}

impl RecorderScreen {
    pub fn new(
        store: Arc<dyn RepackagingStore>,
        identity: Arc<dyn IdentityProvider>,
        config: &CatalogConfig,
    ) -> Self {
        Self {
            gate: SessionGate::new(identity.clone()),
            identity,
            picker: MedicationPicker::new(store.clone(), SearchMode::incremental(config)),
            form: EventForm::new(store),
        }
    }

    /// `Some(route)` means leave the screen before rendering anything.
    pub async fn mount(&self) -> Option<Route> {
        match self.gate.check().await {
            GateDecision::Allow(_) => None,
            GateDecision::Redirect(route) => Some(route),
        }
    }

    /// Session-change watch for the lifetime of the screen.
    pub fn watch(&self) -> SessionWatch {
        self.gate.watch()
    }

    pub fn picker(&self) -> &MedicationPicker {
        &self.picker
    }

    pub fn form(&self) -> &EventForm {
        &self.form
    }

    /// Picks a medication from the current search results.
    pub async fn choose(&self, sap_code: i64) -> bool {
        match self.picker.find(sap_code).await {
            Some(medication) => {
                self.form.select_medication(Some(medication)).await;
                true
            }
            None => false,
        }
    }

    /// Submits for the session current at submit time. Without one, the
    /// caller is sent to the login route and nothing is validated or stored.
    pub async fn submit(&self) -> Result<SubmitOutcome, Route> {
        match self.gate.check().await {
            GateDecision::Allow(session) => Ok(self.form.submit(&session.user_id).await),
            GateDecision::Redirect(route) => Err(route),
        }
    }

    pub async fn sign_out(&self) -> Route {
        if let Err(err) = self.identity.sign_out().await {
            log::warn!("Sign-out failed: {}", err);
        }
        Route::Login
    }

    pub fn open_history(&self) -> Route {
        Route::History
    }
}

// ==================== HISTORY VIEWER ====================

pub struct HistoryScreen {
    gate: SessionGate,
    view: HistoryView,
}

impl HistoryScreen {
    pub fn new(
        store: Arc<dyn RepackagingStore>,
        identity: Arc<dyn IdentityProvider>,
        config: &CatalogConfig,
    ) -> Self {
        Self {
            gate: SessionGate::new(identity),
            view: HistoryView::new(store, config.history_limit),
        }
    }

    /// Checks the session, then loads. Nothing is fetched without one.
    pub async fn mount(&self) -> Option<Route> {
        match self.gate.check().await {
            GateDecision::Allow(session) => {
                self.view.load(&session.user_id).await;
                None
            }
            GateDecision::Redirect(route) => Some(route),
        }
    }

    /// Manual reload for the current session; ignored while a load is
    /// running or once the session has ended.
    pub async fn reload(&self) -> bool {
        match self.gate.check().await {
            GateDecision::Allow(session) => self.view.load(&session.user_id).await,
            GateDecision::Redirect(_) => false,
        }
    }

    pub fn view(&self) -> &HistoryView {
        &self.view
    }

    pub fn back(&self) -> Route {
        Route::Recorder
    }
}

// ==================== CATALOG BROWSER ====================

/// Paginated catalog with a toggleable inline recording panel.
pub struct CatalogBrowser {
    gate: SessionGate,
    picker: MedicationPicker,
    form: EventForm,
    panel_open: AtomicBool,
}

impl CatalogBrowser {
    pub fn new(
        store: Arc<dyn RepackagingStore>,
        identity: Arc<dyn IdentityProvider>,
        config: &CatalogConfig,
    ) -> Self {
        Self {
            gate: SessionGate::new(identity),
            picker: MedicationPicker::new(store.clone(), SearchMode::paginated(config)),
            form: EventForm::new(store),
            panel_open: AtomicBool::new(false),
        }
    }

    /// Loads the first page of the whole catalog.
    pub async fn mount(&self) {
        self.picker.refresh().await;
    }

    pub fn picker(&self) -> &MedicationPicker {
        &self.picker
    }

    pub fn form(&self) -> &EventForm {
        &self.form
    }

    pub fn panel_open(&self) -> bool {
        self.panel_open.load(Ordering::SeqCst)
    }

    /// Returns the new visibility. Closing the panel resets the form.
    pub async fn toggle_panel(&self) -> bool {
        let open = !self.panel_open.fetch_xor(true, Ordering::SeqCst);
        if !open {
            self.form.reset().await;
        }
        open
    }

    /// Opens the panel with this medication preselected.
    pub async fn record_for(&self, sap_code: i64) -> bool {
        match self.picker.find(sap_code).await {
            Some(medication) => {
                self.form.select_medication(Some(medication)).await;
                self.panel_open.store(true, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    /// Browsing is open to everyone; recording needs a session.
    pub async fn submit(&self) -> Result<SubmitOutcome, Route> {
        match self.gate.check().await {
            GateDecision::Allow(session) => Ok(self.form.submit(&session.user_id).await),
            GateDecision::Redirect(route) => Err(route),
        }
    }
}
