// src/models/event.rs
use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc};

pub const INCIDENT_NOTE_MAX_CHARS: usize = 255;

// ==================== DRAFT (FORM INPUT) ====================

/// Raw form values for a repackaging event, before validation.
/// Dates are kept as entered (`YYYY-MM-DD`, empty when not set).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventDraft {
    pub sap_code: Option<i64>,
    pub method_id: Option<i64>,
    pub initial_quantity: i64,
    pub final_quantity: i64,
    pub original_lot: String,
    pub original_expiry: String,
    pub repackaged_expiry: String,
    pub incident_note: String,
}

// ==================== INSERT PAYLOAD ====================

/// A validated event, ready for a single insert. Owner is supplied
/// separately by the caller from the authenticated session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRepackagingEvent {
    pub sap_code: i64,
    pub method_id: i64,
    pub initial_quantity: i64,
    pub final_quantity: i64,
    pub original_lot: String,
    pub original_expiry: NaiveDate,
    pub repackaged_expiry: NaiveDate,
    pub incident_note: Option<String>,
}

// ==================== STORED EVENT ====================

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq)]
pub struct RepackagingEvent {
    pub id: i64,
    pub recorded_at: DateTime<Utc>,
    pub user_id: String,
    pub sap_code: i64,
    pub method_id: i64,
    pub initial_quantity: i64,
    pub final_quantity: i64,
    pub original_lot: String,
    pub original_expiry: NaiveDate,
    pub repackaged_expiry: NaiveDate,
    pub incident_note: Option<String>,
}

/// Event row joined with medication and method metadata, as listed in the
/// history view. Joined columns are optional because the related rows may
/// be gone or unreadable.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq)]
pub struct EventHistoryEntry {
    pub id: i64,
    pub recorded_at: DateTime<Utc>,
    pub sap_code: i64,
    pub method_id: i64,
    pub initial_quantity: i64,
    pub final_quantity: i64,
    pub original_lot: String,
    pub original_expiry: NaiveDate,
    pub repackaged_expiry: NaiveDate,
    pub incident_note: Option<String>,
    pub medication_name: Option<String>,
    pub active_ingredient: Option<String>,
    pub method_label: Option<String>,
}

impl EventHistoryEntry {
    /// Medication name, or the raw SAP code when the join came back empty.
    pub fn medication_label(&self) -> String {
        self.medication_name
            .clone()
            .unwrap_or_else(|| format!("SAP {}", self.sap_code))
    }

    pub fn ingredient_label(&self) -> &str {
        self.active_ingredient.as_deref().unwrap_or("—")
    }

    pub fn method_display(&self) -> &str {
        self.method_label.as_deref().unwrap_or("—")
    }

    pub fn incident_display(&self) -> &str {
        self.incident_note.as_deref().unwrap_or("—")
    }

    pub fn formatted_timestamp(&self) -> String {
        self.recorded_at.format("%Y-%m-%d %H:%M").to_string()
    }
}
