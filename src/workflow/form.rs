// src/workflow/form.rs
use std::sync::Arc;
use tokio::sync::Mutex;
use crate::models::{EventDraft, Medication, RepackagingEvent};
use crate::repositories::RepackagingStore;
use crate::validator::{EventValidator, ValidationFailure};

pub const EVENT_RECORDED: &str = "Event recorded successfully.";

/// Editable fields below the medication and method selectors.
#[derive(Debug, Clone, PartialEq)]
pub enum FormField {
    InitialQuantity(i64),
    FinalQuantity(i64),
    OriginalLot(String),
    OriginalExpiry(String),
    RepackagedExpiry(String),
    IncidentNote(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodOption {
    pub id: i64,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormState {
    pub draft: EventDraft,
    pub selected: Option<Medication>,
    pub submitting: bool,
    pub error: Option<String>,
    pub success: Option<String>,
}

impl FormState {
    pub fn method_selector_enabled(&self) -> bool {
        self.selected.is_some()
    }

    pub fn method_options(&self) -> Vec<MethodOption> {
        self.selected
            .as_ref()
            .map(|medication| {
                medication
                    .methods
                    .iter()
                    .map(|m| MethodOption {
                        id: m.method_id,
                        label: m.option_label(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Recorded(RepackagingEvent),
    /// Rejected locally; the store was not called.
    Invalid(ValidationFailure),
    /// The store refused the insert; carries its message.
    Failed(String),
    /// A submission is already in flight.
    Busy,
}

/// Event entry form used by both recording screens.
pub struct EventForm {
    store: Arc<dyn RepackagingStore>,
    state: Mutex<FormState>,
}

impl EventForm {
    pub fn new(store: Arc<dyn RepackagingStore>) -> Self {
        Self {
            store,
            state: Mutex::new(FormState::default()),
        }
    }

    pub async fn snapshot(&self) -> FormState {
        self.state.lock().await.clone()
    }

    /// Selecting (or clearing) the medication resets every other field.
    /// A sole associated method is preselected.
    pub async fn select_medication(&self, medication: Option<Medication>) {
        let mut state = self.state.lock().await;
        state.draft = EventDraft {
            sap_code: medication.as_ref().map(|m| m.sap_code),
            method_id: medication.as_ref().and_then(Medication::sole_method),
            ..EventDraft::default()
        };
        state.selected = medication;
        state.error = None;
        state.success = None;
    }

    /// Returns `false` when no medication is selected or it does not
    /// offer the method.
    pub async fn select_method(&self, method_id: Option<i64>) -> bool {
        let mut state = self.state.lock().await;
        let offered = match (&state.selected, method_id) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(medication), Some(id)) => medication.offers_method(id),
        };
        if offered {
            state.draft.method_id = method_id;
        }
        offered
    }

    pub async fn set_field(&self, field: FormField) {
        let mut state = self.state.lock().await;
        let draft = &mut state.draft;
        match field {
            FormField::InitialQuantity(value) => draft.initial_quantity = value,
            FormField::FinalQuantity(value) => draft.final_quantity = value,
            FormField::OriginalLot(value) => draft.original_lot = value,
            FormField::OriginalExpiry(value) => draft.original_expiry = value,
            FormField::RepackagedExpiry(value) => draft.repackaged_expiry = value,
            FormField::IncidentNote(value) => draft.incident_note = value,
        }
    }

    pub async fn reset(&self) {
        *self.state.lock().await = FormState::default();
    }

    /// Validates and inserts the draft for `owner_id`. On success the form
    /// is cleared; on failure the values stay for another attempt.
    pub async fn submit(&self, owner_id: &str) -> SubmitOutcome {
        let event = {
            let mut state = self.state.lock().await;
            if state.submitting {
                return SubmitOutcome::Busy;
            }
            state.error = None;
            state.success = None;

            match EventValidator::validate(&state.draft) {
                Ok(event) => {
                    state.submitting = true;
                    event
                }
                Err(failure) => {
                    state.error = Some(failure.message.clone());
                    return SubmitOutcome::Invalid(failure);
                }
            }
        };

        let result = self.store.insert_event(owner_id, &event).await;

        let mut state = self.state.lock().await;
        state.submitting = false;
        match result {
            Ok(stored) => {
                log::info!("Repackaging event {} saved for SAP {}", stored.id, stored.sap_code);
                *state = FormState {
                    success: Some(EVENT_RECORDED.to_string()),
                    ..FormState::default()
                };
                SubmitOutcome::Recorded(stored)
            }
            Err(err) => {
                let message = err.detail();
                state.error = Some(message.clone());
                SubmitOutcome::Failed(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MethodLink;
    use crate::workflow::test_support::{ibuprofeno, paracetamol, MockStore};

    async fn filled_form(store: Arc<MockStore>) -> EventForm {
        let form = EventForm::new(store);
        form.select_medication(Some(paracetamol())).await;
        assert!(form.select_method(Some(5)).await);
        for field in [
            FormField::InitialQuantity(100),
            FormField::FinalQuantity(95),
            FormField::OriginalLot("L2024A".to_string()),
            FormField::OriginalExpiry("2025-01-01".to_string()),
            FormField::RepackagedExpiry("2025-02-01".to_string()),
            FormField::IncidentNote(String::new()),
        ] {
            form.set_field(field).await;
        }
        form
    }

    #[actix_rt::test]
    async fn test_paracetamol_scenario() {
        let store = Arc::new(MockStore::default());
        let form = filled_form(store.clone()).await;

        let outcome = form.submit("user-a").await;
        assert!(matches!(outcome, SubmitOutcome::Recorded(_)));

        let inserts = store.inserts.lock().unwrap().clone();
        assert_eq!(inserts.len(), 1);
        let (owner, event) = &inserts[0];
        assert_eq!(owner, "user-a");
        assert_eq!(event.sap_code, 1001);
        assert_eq!(event.method_id, 5);
        assert_eq!(event.initial_quantity, 100);
        assert_eq!(event.final_quantity, 95);
        assert_eq!(event.original_lot, "L2024A");
        assert_eq!(event.incident_note, None);

        let state = form.snapshot().await;
        assert_eq!(state.success.as_deref(), Some(EVENT_RECORDED));
        assert_eq!(state.error, None);
        assert_eq!(state.draft, EventDraft::default());
        assert_eq!(state.selected, None);
        assert!(!state.method_selector_enabled());
    }

    #[actix_rt::test]
    async fn test_invalid_draft_never_reaches_store() {
        let store = Arc::new(MockStore::default());
        let form = filled_form(store.clone()).await;
        form.set_field(FormField::FinalQuantity(101)).await;

        match form.submit("user-a").await {
            SubmitOutcome::Invalid(failure) => assert_eq!(failure.field, "final_quantity"),
            other => panic!("unexpected outcome: {:?}", other),
        }
        form.set_field(FormField::FinalQuantity(0)).await;
        form.set_field(FormField::InitialQuantity(0)).await;
        assert!(matches!(form.submit("user-a").await, SubmitOutcome::Invalid(_)));

        assert_eq!(store.insert_count(), 0);
        let state = form.snapshot().await;
        assert_eq!(state.error.as_deref(), Some("Initial quantity must be greater than 0."));
        // Values are kept for correction
        assert_eq!(state.draft.original_lot, "L2024A");
    }

    #[actix_rt::test]
    async fn test_expiry_ordering_enforced() {
        let store = Arc::new(MockStore::default());
        let form = filled_form(store.clone()).await;
        form.set_field(FormField::RepackagedExpiry("2024-12-01".to_string())).await;
        assert!(matches!(form.submit("user-a").await, SubmitOutcome::Invalid(_)));
        assert_eq!(store.insert_count(), 0);
    }

    #[actix_rt::test]
    async fn test_store_error_shown_verbatim() {
        let store = Arc::new(MockStore::failing("new row violates row-level security policy"));
        let form = filled_form(store.clone()).await;

        assert_eq!(
            form.submit("user-a").await,
            SubmitOutcome::Failed("new row violates row-level security policy".to_string())
        );
        let state = form.snapshot().await;
        assert_eq!(state.error.as_deref(), Some("new row violates row-level security policy"));
        assert!(!state.submitting);
        assert_eq!(state.draft.sap_code, Some(1001));
        assert_eq!(store.insert_count(), 1);
    }

    #[actix_rt::test]
    async fn test_sole_method_is_preselected() {
        let form = EventForm::new(Arc::new(MockStore::default()));

        form.select_medication(Some(ibuprofeno())).await;
        assert_eq!(form.snapshot().await.draft.method_id, Some(5));

        form.select_medication(Some(paracetamol())).await;
        assert_eq!(form.snapshot().await.draft.method_id, None);

        let none = crate::models::Medication { methods: Vec::new(), ..paracetamol() };
        form.select_medication(Some(none)).await;
        assert_eq!(form.snapshot().await.draft.method_id, None);
    }

    #[actix_rt::test]
    async fn test_selecting_medication_resets_fields() {
        let form = filled_form(Arc::new(MockStore::default())).await;
        form.set_field(FormField::IncidentNote("torn".to_string())).await;

        form.select_medication(Some(ibuprofeno())).await;
        let state = form.snapshot().await;
        assert_eq!(state.draft.sap_code, Some(1002));
        assert_eq!(state.draft.initial_quantity, 0);
        assert_eq!(state.draft.original_lot, "");
        assert_eq!(state.draft.incident_note, "");
    }

    #[actix_rt::test]
    async fn test_method_selector_follows_medication() {
        let form = EventForm::new(Arc::new(MockStore::default()));
        let state = form.snapshot().await;
        assert!(!state.method_selector_enabled());
        assert!(state.method_options().is_empty());
        assert!(!form.select_method(Some(5)).await);

        let unlabeled = crate::models::Medication {
            methods: vec![MethodLink::new(5, "Blister"), MethodLink { method_id: 9, label: None }],
            ..paracetamol()
        };
        form.select_medication(Some(unlabeled)).await;
        let state = form.snapshot().await;
        assert!(state.method_selector_enabled());
        assert_eq!(
            state.method_options(),
            vec![
                MethodOption { id: 5, label: "Blister".to_string() },
                MethodOption { id: 9, label: "Method 9".to_string() },
            ]
        );
        assert!(!form.select_method(Some(6)).await);
        assert!(form.select_method(Some(9)).await);
        assert_eq!(form.snapshot().await.draft.method_id, Some(9));
    }
}
