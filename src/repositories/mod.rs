// src/repositories/mod.rs
//! Store seam: every catalog read and event read/write goes through
//! [`RepackagingStore`].

use async_trait::async_trait;
use crate::error::ApiResult;
use crate::models::{
    EventHistoryEntry, Medication, MedicationQuery, NewRepackagingEvent, RepackagingEvent,
    RepackagingMethod,
};

pub mod sqlite;

pub use sqlite::SqliteStore;

/// Data store used by the API handlers and the screen workflows.
///
/// Event operations take the owner id explicitly. Implementations must
/// scope reads to that owner and stamp writes with it; callers derive it
/// from the authenticated session only.
#[async_trait]
pub trait RepackagingStore: Send + Sync {
    /// Medications whose name or active ingredient contains `query.text`
    /// (case-insensitive), ordered by name, with their methods expanded.
    async fn search_medications(&self, query: &MedicationQuery) -> ApiResult<Vec<Medication>>;

    async fn list_methods(&self) -> ApiResult<Vec<RepackagingMethod>>;

    /// Single-row insert. The store sets the id and timestamp.
    async fn insert_event(
        &self,
        owner_id: &str,
        event: &NewRepackagingEvent,
    ) -> ApiResult<RepackagingEvent>;

    /// Most recent events of `owner_id`, newest first.
    async fn list_events(&self, owner_id: &str, limit: i64) -> ApiResult<Vec<EventHistoryEntry>>;
}

/// Escapes `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern.
pub fn escape_like_pattern(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Lowercased name and active ingredient, one per line. Stored with each
/// medication and matched by the catalog search. SQLite's `lower` and
/// `LIKE` only fold ASCII, so folding happens here.
pub fn search_key(name: &str, active_ingredient: Option<&str>) -> String {
    format!(
        "{}\n{}",
        name.to_lowercase(),
        active_ingredient.unwrap_or("").to_lowercase()
    )
}

/// `%text%`, lowercased and escaped.
pub fn contains_pattern(text: &str) -> String {
    format!("%{}%", escape_like_pattern(&text.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_pattern() {
        assert_eq!(escape_like_pattern("100%"), "100\\%");
        assert_eq!(escape_like_pattern("a_b"), "a\\_b");
        assert_eq!(escape_like_pattern("a\\b"), "a\\\\b");
        assert_eq!(escape_like_pattern("normal"), "normal");
    }

    #[test]
    fn test_search_key_folds_accents() {
        assert_eq!(
            search_key("ÁCIDO ACETILSALICÍLICO 100MG", Some("Ácido acetilsalicílico")),
            "ácido acetilsalicílico 100mg\nácido acetilsalicílico"
        );
        assert_eq!(search_key("Ñ", None), "ñ\n");
    }

    #[test]
    fn test_contains_pattern() {
        assert_eq!(contains_pattern("Para"), "%para%");
        assert_eq!(contains_pattern("5%"), "%5\\%%");
    }
}
