// src/models/medication.rs
use serde::{Deserialize, Serialize};

// ==================== REPACKAGING METHOD ====================

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq)]
pub struct RepackagingMethod {
    pub id: i64,
    pub label: String,
}

/// A row of the medication/method join with the method label expanded.
/// The label is optional because the joined method row may be missing.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MethodLink {
    pub method_id: i64,
    pub label: Option<String>,
}

impl MethodLink {
    pub fn new(method_id: i64, label: impl Into<String>) -> Self {
        Self {
            method_id,
            label: Some(label.into()),
        }
    }

    /// Label used in the method selector.
    pub fn option_label(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| format!("Method {}", self.method_id))
    }

    /// Label used in the catalog listing.
    pub fn listing_label(&self) -> &str {
        self.label.as_deref().unwrap_or("Unknown method")
    }
}

// ==================== MEDICATION ====================

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct MedicationRow {
    pub sap_code: i64,
    pub name: String,
    pub active_ingredient: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Medication {
    pub sap_code: i64,
    pub name: String,
    pub active_ingredient: Option<String>,
    #[serde(default)]
    pub methods: Vec<MethodLink>,
}

impl Medication {
    pub fn from_row(row: MedicationRow, methods: Vec<MethodLink>) -> Self {
        Self {
            sap_code: row.sap_code,
            name: row.name,
            active_ingredient: row.active_ingredient,
            methods,
        }
    }

    /// `<name> (SAP <code>)`, as offered in the medication selector.
    pub fn option_label(&self) -> String {
        format!("{} (SAP {})", self.name, self.sap_code)
    }

    pub fn ingredient_label(&self) -> &str {
        self.active_ingredient.as_deref().unwrap_or("—")
    }

    /// The method to preselect: only when exactly one is associated.
    pub fn sole_method(&self) -> Option<i64> {
        match self.methods.as_slice() {
            [only] => Some(only.method_id),
            _ => None,
        }
    }

    pub fn offers_method(&self, method_id: i64) -> bool {
        self.methods.iter().any(|m| m.method_id == method_id)
    }

    /// Method lines shown under the medication in the catalog listing.
    pub fn method_summary(&self) -> Vec<String> {
        if self.methods.is_empty() {
            return vec!["No repackaging method assigned".to_string()];
        }
        self.methods
            .iter()
            .map(|m| m.listing_label().to_string())
            .collect()
    }
}

// ==================== QUERY ====================

/// Filter and window for a catalog read. `text` is already trimmed; `None`
/// means "no filter".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MedicationQuery {
    pub text: Option<String>,
    pub offset: i64,
    pub limit: i64,
}

impl MedicationQuery {
    pub fn new(text: &str, offset: i64, limit: i64) -> Self {
        let trimmed = text.trim();
        Self {
            text: (!trimmed.is_empty()).then(|| trimmed.to_string()),
            offset,
            limit,
        }
    }
}
