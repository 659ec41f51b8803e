// src/workflow/mod.rs
//! Screen logic of the catalog browser, the event recorder, the history
//! viewer and the login screen, kept as plain state a UI renders.

pub mod form;
pub mod history;
pub mod login;
pub mod picker;
pub mod screens;
pub mod session_gate;

pub use form::{EventForm, FormField, FormState, MethodOption, SubmitOutcome};
pub use history::{HistoryState, HistoryView};
pub use login::{LoginScreen, LoginState};
pub use picker::{MedicationPicker, PickerState, SearchMode, SearchOutcome};
pub use screens::{CatalogBrowser, HistoryScreen, RecorderScreen};
pub use session_gate::{GateDecision, SessionGate, SessionWatch};

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

// ==================== ROUTES ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr)]
pub enum Route {
    #[strum(serialize = "/")]
    Catalog,
    #[strum(serialize = "/login")]
    Login,
    #[strum(serialize = "/reenvasado")]
    Recorder,
    #[strum(serialize = "/historial")]
    History,
}

impl Route {
    pub fn requires_session(&self) -> bool {
        matches!(self, Route::Recorder | Route::History)
    }
}
