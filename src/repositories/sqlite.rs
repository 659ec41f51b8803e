// src/repositories/sqlite.rs
use std::collections::HashMap;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    EventHistoryEntry, Medication, MedicationQuery, MedicationRow, MethodLink,
    NewRepackagingEvent, RepackagingEvent, RepackagingMethod,
};
use super::{contains_pattern, search_key, RepackagingStore};

const EVENT_COLUMNS: &str = "id, recorded_at, user_id, sap_code, method_id, initial_quantity, \
    final_quantity, original_lot, original_expiry, repackaged_expiry, incident_note";

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn method_links(&self, sap_codes: &[i64]) -> ApiResult<HashMap<i64, Vec<MethodLink>>> {
        let mut links: HashMap<i64, Vec<MethodLink>> = HashMap::new();
        if sap_codes.is_empty() {
            return Ok(links);
        }

        let placeholders = vec!["?"; sap_codes.len()].join(", ");
        let sql = format!(
            r#"SELECT mm.sap_code, mm.method_id, m.label
               FROM medication_methods mm
               LEFT JOIN repackaging_methods m ON m.id = mm.method_id
               WHERE mm.sap_code IN ({})
               ORDER BY mm.sap_code, mm.method_id"#,
            placeholders
        );

        let mut query = sqlx::query_as::<_, (i64, i64, Option<String>)>(&sql);
        for code in sap_codes {
            query = query.bind(*code);
        }

        for (sap_code, method_id, label) in query.fetch_all(&self.pool).await? {
            links
                .entry(sap_code)
                .or_default()
                .push(MethodLink { method_id, label });
        }

        Ok(links)
    }

    // ==================== CATALOG MAINTENANCE ====================

    pub async fn upsert_medication(&self, row: &MedicationRow) -> ApiResult<()> {
        sqlx::query(
            r#"INSERT INTO medications (sap_code, name, active_ingredient, search_key)
               VALUES (?, ?, ?, ?)
               ON CONFLICT(sap_code) DO UPDATE SET
                   name = excluded.name,
                   active_ingredient = excluded.active_ingredient,
                   search_key = excluded.search_key"#
        )
            .bind(row.sap_code)
            .bind(&row.name)
            .bind(&row.active_ingredient)
            .bind(search_key(&row.name, row.active_ingredient.as_deref()))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Id of the method with this label, creating it when missing.
    pub async fn ensure_method(&self, label: &str) -> ApiResult<i64> {
        sqlx::query("INSERT OR IGNORE INTO repackaging_methods (label) VALUES (?)")
            .bind(label)
            .execute(&self.pool)
            .await?;

        let (id,): (i64,) = sqlx::query_as("SELECT id FROM repackaging_methods WHERE label = ?")
            .bind(label)
            .fetch_one(&self.pool)
            .await?;
        Ok(id)
    }

    pub async fn link_method(&self, sap_code: i64, method_id: i64) -> ApiResult<()> {
        sqlx::query("INSERT OR IGNORE INTO medication_methods (sap_code, method_id) VALUES (?, ?)")
            .bind(sap_code)
            .bind(method_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn medication_count(&self) -> ApiResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM medications")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl RepackagingStore for SqliteStore {
    async fn search_medications(&self, query: &MedicationQuery) -> ApiResult<Vec<Medication>> {
        let pattern = query.text.as_deref().map(contains_pattern);

        let mut sql = String::from("SELECT sap_code, name, active_ingredient FROM medications");
        if pattern.is_some() {
            sql.push_str(
                r" WHERE search_key LIKE ? ESCAPE '\'",
            );
        }
        sql.push_str(" ORDER BY name ASC, sap_code ASC LIMIT ? OFFSET ?");

        let mut select = sqlx::query_as::<_, MedicationRow>(&sql);
        if let Some(ref pattern) = pattern {
            select = select.bind(pattern);
        }
        let rows = select
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(&self.pool)
            .await?;

        let codes: Vec<i64> = rows.iter().map(|r| r.sap_code).collect();
        let mut links = self.method_links(&codes).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let methods = links.remove(&row.sap_code).unwrap_or_default();
                Medication::from_row(row, methods)
            })
            .collect())
    }

    async fn list_methods(&self) -> ApiResult<Vec<RepackagingMethod>> {
        let methods = sqlx::query_as::<_, RepackagingMethod>(
            "SELECT id, label FROM repackaging_methods ORDER BY label ASC"
        )
            .fetch_all(&self.pool)
            .await?;
        Ok(methods)
    }

    async fn insert_event(
        &self,
        owner_id: &str,
        event: &NewRepackagingEvent,
    ) -> ApiResult<RepackagingEvent> {
        let mut tx = self.pool.begin().await?;

        let medication: Option<(i64,)> = sqlx::query_as("SELECT sap_code FROM medications WHERE sap_code = ?")
            .bind(event.sap_code)
            .fetch_optional(&mut *tx)
            .await?;
        if medication.is_none() {
            return Err(ApiError::medication_not_found(event.sap_code));
        }

        let method: Option<(i64,)> = sqlx::query_as("SELECT id FROM repackaging_methods WHERE id = ?")
            .bind(event.method_id)
            .fetch_optional(&mut *tx)
            .await?;
        if method.is_none() {
            return Err(ApiError::method_not_found(event.method_id));
        }

        let link: Option<(i64,)> = sqlx::query_as(
            "SELECT method_id FROM medication_methods WHERE sap_code = ? AND method_id = ?"
        )
            .bind(event.sap_code)
            .bind(event.method_id)
            .fetch_optional(&mut *tx)
            .await?;
        if link.is_none() {
            return Err(ApiError::method_not_linked(event.sap_code, event.method_id));
        }

        let result = sqlx::query(
            r#"INSERT INTO repackaging_events (
                recorded_at, user_id, sap_code, method_id, initial_quantity, final_quantity,
                original_lot, original_expiry, repackaged_expiry, incident_note
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#
        )
            .bind(Utc::now())
            .bind(owner_id)
            .bind(event.sap_code)
            .bind(event.method_id)
            .bind(event.initial_quantity)
            .bind(event.final_quantity)
            .bind(&event.original_lot)
            .bind(event.original_expiry)
            .bind(event.repackaged_expiry)
            .bind(&event.incident_note)
            .execute(&mut *tx)
            .await?;

        let sql = format!("SELECT {} FROM repackaging_events WHERE id = ?", EVENT_COLUMNS);
        let stored = sqlx::query_as::<_, RepackagingEvent>(&sql)
            .bind(result.last_insert_rowid())
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        log::info!(
            "Repackaging event {} recorded by {} (SAP {}, method {})",
            stored.id, owner_id, stored.sap_code, stored.method_id
        );
        Ok(stored)
    }

    async fn list_events(&self, owner_id: &str, limit: i64) -> ApiResult<Vec<EventHistoryEntry>> {
        let entries = sqlx::query_as::<_, EventHistoryEntry>(
            r#"SELECT e.id, e.recorded_at, e.sap_code, e.method_id,
                      e.initial_quantity, e.final_quantity, e.original_lot,
                      e.original_expiry, e.repackaged_expiry, e.incident_note,
                      m.name AS medication_name,
                      m.active_ingredient AS active_ingredient,
                      rm.label AS method_label
               FROM repackaging_events e
               LEFT JOIN medications m ON m.sap_code = e.sap_code
               LEFT JOIN repackaging_methods rm ON rm.id = e.method_id
               WHERE e.user_id = ?
               ORDER BY e.recorded_at DESC, e.id DESC
               LIMIT ?"#
        )
            .bind(owner_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(entries)
    }
}
