// src/validator.rs - Centralized validation module
use std::fmt;
use regex::Regex;
use lazy_static::lazy_static;
use chrono::NaiveDate;
use serde::Serialize;
use crate::error::ApiError;
use crate::models::{EventDraft, NewRepackagingEvent, INCIDENT_NOTE_MAX_CHARS};

lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();
}

pub const MIN_PASSWORD_LENGTH: usize = 6;

// ==================== VALIDATION FAILURE ====================

/// First rule that rejected a draft. `message` is shown to the user as is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationFailure {
    pub field: &'static str,
    pub message: String,
}

impl ValidationFailure {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<ValidationFailure> for ApiError {
    fn from(failure: ValidationFailure) -> Self {
        ApiError::ValidationError(failure.message)
    }
}

// ==================== FIELD VALIDATORS ====================

pub struct FieldValidator;

impl FieldValidator {
    /// Length in characters, not bytes.
    pub fn max_chars(value: &str, field: &str, max: usize) -> Result<(), String> {
        if value.chars().count() > max {
            Err(format!("{} cannot exceed {} characters", field, max))
        } else {
            Ok(())
        }
    }

    pub fn email(value: &str) -> Result<(), String> {
        if EMAIL_REGEX.is_match(value) {
            Ok(())
        } else {
            Err("Invalid email format".to_string())
        }
    }

    pub fn password(value: &str) -> Result<(), String> {
        if value.chars().count() < MIN_PASSWORD_LENGTH {
            Err(format!("Password must be at least {} characters", MIN_PASSWORD_LENGTH))
        } else {
            Ok(())
        }
    }

    /// `Ok(None)` for an empty value, `Err` when present but not `YYYY-MM-DD`.
    pub fn iso_date(value: &str) -> Result<Option<NaiveDate>, String> {
        let value = value.trim();
        if value.is_empty() {
            return Ok(None);
        }
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| format!("'{}' is not a valid date (expected YYYY-MM-DD)", value))
    }
}

// ==================== EVENT VALIDATION ====================

pub struct EventValidator;

impl EventValidator {
    /// Checks a draft rule by rule and stops at the first failure. Every
    /// recording path goes through here, so the expiry ordering rule
    /// applies everywhere.
    pub fn validate(draft: &EventDraft) -> Result<NewRepackagingEvent, ValidationFailure> {
        let sap_code = draft
            .sap_code
            .ok_or_else(|| ValidationFailure::new("sap_code", "Select a medication."))?;

        let method_id = draft
            .method_id
            .ok_or_else(|| ValidationFailure::new("method_id", "Select a repackaging method."))?;

        let original_lot = draft.original_lot.trim();
        if original_lot.is_empty() {
            return Err(ValidationFailure::new("original_lot", "Enter the original lot."));
        }

        let original_expiry = FieldValidator::iso_date(&draft.original_expiry)
            .map_err(|e| ValidationFailure::new("original_expiry", e))?
            .ok_or_else(|| ValidationFailure::new("original_expiry", "Enter the original expiry date."))?;

        let repackaged_expiry = FieldValidator::iso_date(&draft.repackaged_expiry)
            .map_err(|e| ValidationFailure::new("repackaged_expiry", e))?
            .ok_or_else(|| ValidationFailure::new("repackaged_expiry", "Enter the repackaged expiry date."))?;

        if draft.initial_quantity <= 0 {
            return Err(ValidationFailure::new(
                "initial_quantity",
                "Initial quantity must be greater than 0.",
            ));
        }

        if draft.final_quantity < 0 {
            return Err(ValidationFailure::new(
                "final_quantity",
                "Final quantity cannot be negative.",
            ));
        }

        if draft.final_quantity > draft.initial_quantity {
            return Err(ValidationFailure::new(
                "final_quantity",
                "Final quantity cannot exceed the initial quantity.",
            ));
        }

        if repackaged_expiry < original_expiry {
            return Err(ValidationFailure::new(
                "repackaged_expiry",
                "Repackaged expiry date cannot be earlier than the original expiry date.",
            ));
        }

        let note = draft.incident_note.trim();
        FieldValidator::max_chars(note, "Incident note", INCIDENT_NOTE_MAX_CHARS)
            .map_err(|e| ValidationFailure::new("incident_note", e))?;

        Ok(NewRepackagingEvent {
            sap_code,
            method_id,
            initial_quantity: draft.initial_quantity,
            final_quantity: draft.final_quantity,
            original_lot: original_lot.to_string(),
            original_expiry,
            repackaged_expiry,
            incident_note: (!note.is_empty()).then(|| note.to_string()),
        })
    }
}

// ==================== TESTS ====================

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_draft() -> EventDraft {
        EventDraft {
            sap_code: Some(1001),
            method_id: Some(5),
            initial_quantity: 100,
            final_quantity: 95,
            original_lot: "L2024A".to_string(),
            original_expiry: "2025-01-01".to_string(),
            repackaged_expiry: "2025-02-01".to_string(),
            incident_note: String::new(),
        }
    }

    fn failure_field(draft: &EventDraft) -> &'static str {
        EventValidator::validate(draft).unwrap_err().field
    }

    #[test]
    fn test_valid_draft_is_normalized() {
        let draft = EventDraft {
            original_lot: "  L2024A ".to_string(),
            incident_note: "   ".to_string(),
            ..valid_draft()
        };
        let event = EventValidator::validate(&draft).unwrap();
        assert_eq!(event.original_lot, "L2024A");
        assert_eq!(event.incident_note, None);
        assert_eq!(event.original_expiry, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(event.repackaged_expiry, NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
    }

    #[test]
    fn test_incident_note_is_trimmed() {
        let draft = EventDraft { incident_note: " torn blister ".to_string(), ..valid_draft() };
        let event = EventValidator::validate(&draft).unwrap();
        assert_eq!(event.incident_note.as_deref(), Some("torn blister"));
    }

    #[test]
    fn test_final_above_initial_rejected() {
        for (initial, fin) in [(1, 2), (10, 11), (100, 1000)] {
            let draft = EventDraft { initial_quantity: initial, final_quantity: fin, ..valid_draft() };
            let failure = EventValidator::validate(&draft).unwrap_err();
            assert_eq!(failure.field, "final_quantity");
            assert_eq!(failure.message, "Final quantity cannot exceed the initial quantity.");
        }
    }

    #[test]
    fn test_non_positive_initial_rejected() {
        for initial in [0, -1, -50] {
            let draft = EventDraft { initial_quantity: initial, final_quantity: 0, ..valid_draft() };
            assert_eq!(failure_field(&draft), "initial_quantity");
        }
    }

    #[test]
    fn test_final_bounds_inclusive() {
        let zero = EventDraft { final_quantity: 0, ..valid_draft() };
        assert!(EventValidator::validate(&zero).is_ok());
        let all = EventDraft { final_quantity: 100, ..valid_draft() };
        assert!(EventValidator::validate(&all).is_ok());
        let negative = EventDraft { final_quantity: -1, ..valid_draft() };
        assert_eq!(failure_field(&negative), "final_quantity");
    }

    #[test]
    fn test_repackaged_expiry_before_original_rejected() {
        let draft = EventDraft { repackaged_expiry: "2024-12-31".to_string(), ..valid_draft() };
        assert_eq!(failure_field(&draft), "repackaged_expiry");

        let same_day = EventDraft { repackaged_expiry: "2025-01-01".to_string(), ..valid_draft() };
        assert!(EventValidator::validate(&same_day).is_ok());
    }

    #[test]
    fn test_rules_run_in_order() {
        assert_eq!(failure_field(&EventDraft::default()), "sap_code");

        let no_method = EventDraft { method_id: None, original_lot: String::new(), ..valid_draft() };
        assert_eq!(failure_field(&no_method), "method_id");

        let no_lot = EventDraft { original_lot: "  ".to_string(), initial_quantity: 0, ..valid_draft() };
        assert_eq!(failure_field(&no_lot), "original_lot");

        let no_dates = EventDraft { original_expiry: String::new(), initial_quantity: 0, ..valid_draft() };
        assert_eq!(failure_field(&no_dates), "original_expiry");

        let no_repack = EventDraft { repackaged_expiry: String::new(), ..valid_draft() };
        assert_eq!(failure_field(&no_repack), "repackaged_expiry");
    }

    #[test]
    fn test_malformed_date_rejected() {
        let draft = EventDraft { original_expiry: "01/01/2025".to_string(), ..valid_draft() };
        let failure = EventValidator::validate(&draft).unwrap_err();
        assert_eq!(failure.field, "original_expiry");
        assert!(failure.message.contains("YYYY-MM-DD"));
    }

    #[test]
    fn test_incident_note_length() {
        let at_limit = EventDraft { incident_note: "é".repeat(255), ..valid_draft() };
        assert!(EventValidator::validate(&at_limit).is_ok());
        let over = EventDraft { incident_note: "x".repeat(256), ..valid_draft() };
        assert_eq!(failure_field(&over), "incident_note");
    }

    #[test]
    fn test_field_validators() {
        assert!(FieldValidator::email("user@example.com").is_ok());
        assert!(FieldValidator::email("not-an-email").is_err());
        assert!(FieldValidator::password("12345").is_err());
        assert!(FieldValidator::password("123456").is_ok());
        assert_eq!(FieldValidator::iso_date("").unwrap(), None);
    }

    #[test]
    fn test_failure_converts_to_api_error() {
        let err: ApiError = EventValidator::validate(&EventDraft::default()).unwrap_err().into();
        assert_eq!(err.detail(), "Select a medication.");
    }
}
