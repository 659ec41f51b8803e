// src/import_export.rs - Catalog CSV seeding and export
use actix_web::{web, HttpResponse};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::models::{MedicationQuery, MedicationRow};
use crate::repositories::{RepackagingStore, SqliteStore};
use crate::AppState;

/// Separator of method labels inside the `methods` column.
pub const METHOD_SEPARATOR: &str = ";";

const EXPORT_BATCH: i64 = 500;

// ==================== IMPORT MODELS ====================

#[derive(Debug, Deserialize)]
pub struct CatalogRecord {
    pub sap_code: i64,
    pub name: String,
    pub active_ingredient: Option<String>,
    pub methods: Option<String>,
}

impl CatalogRecord {
    pub fn method_labels(&self) -> Vec<&str> {
        self.methods
            .as_deref()
            .unwrap_or("")
            .split(METHOD_SEPARATOR)
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .collect()
    }
}

#[derive(Debug, Default, Serialize, PartialEq)]
pub struct ImportSummary {
    pub imported: usize,
    pub total: usize,
    pub errors: Vec<String>,
}

// ==================== IMPORT ====================

/// Upserts every medication of a `sap_code,name,active_ingredient,methods`
/// CSV. Methods are created by label when missing; links are idempotent,
/// so the same file can be loaded twice.
pub async fn import_catalog<R: Read>(store: &SqliteStore, reader: R) -> ApiResult<ImportSummary> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut summary = ImportSummary::default();
    let mut records = Vec::new();
    for (idx, result) in csv_reader.deserialize::<CatalogRecord>().enumerate() {
        summary.total += 1;
        match result {
            Ok(record) => records.push((idx + 1, record)),
            Err(e) => summary.errors.push(format!("Row {}: {}", idx + 1, e)),
        }
    }

    for (row, record) in records {
        if record.name.trim().is_empty() {
            summary.errors.push(format!("Row {}: Name is required", row));
            continue;
        }

        let medication = MedicationRow {
            sap_code: record.sap_code,
            name: record.name.clone(),
            active_ingredient: record.active_ingredient.clone().filter(|s| !s.is_empty()),
        };

        if let Err(e) = import_record(store, &medication, &record.method_labels()).await {
            summary.errors.push(format!("Row {}: {}", row, e.detail()));
            continue;
        }
        summary.imported += 1;
    }

    Ok(summary)
}

async fn import_record(store: &SqliteStore, medication: &MedicationRow, labels: &[&str]) -> ApiResult<()> {
    store.upsert_medication(medication).await?;
    for label in labels {
        let method_id = store.ensure_method(label).await?;
        store.link_method(medication.sap_code, method_id).await?;
    }
    Ok(())
}

/// Startup seeding from `catalog.seed_file`.
pub async fn seed_catalog_file(store: &SqliteStore, path: &Path) -> anyhow::Result<ImportSummary> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open catalog seed file: {}", path.display()))?;
    let summary = import_catalog(store, file)
        .await
        .map_err(|e| anyhow::anyhow!("Catalog seeding failed: {}", e))?;

    log::info!(
        "Catalog seed {}: {}/{} medications imported",
        path.display(),
        summary.imported,
        summary.total
    );
    for error in &summary.errors {
        log::warn!("Catalog seed: {}", error);
    }
    Ok(summary)
}

// ==================== EXPORT ====================

/// Whole catalog as CSV, in the format [`import_catalog`] reads.
pub async fn export_catalog(app_state: web::Data<Arc<AppState>>) -> ApiResult<HttpResponse> {
    let csv_data = catalog_csv(&app_state.store).await?;

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header(("Content-Disposition", "attachment; filename=\"medications.csv\""))
        .body(csv_data))
}

pub async fn catalog_csv(store: &dyn RepackagingStore) -> ApiResult<Vec<u8>> {
    let mut rows = Vec::new();
    let mut offset = 0;
    loop {
        let page = store
            .search_medications(&MedicationQuery::new("", offset, EXPORT_BATCH))
            .await?;
        let fetched = page.len() as i64;
        rows.extend(page);
        if fetched < EXPORT_BATCH {
            break;
        }
        offset += EXPORT_BATCH;
    }

    let mut csv_data = Vec::new();
    {
        let mut writer = csv::Writer::from_writer(&mut csv_data);

        writer.write_record(["sap_code", "name", "active_ingredient", "methods"])
            .map_err(|e| ApiError::InternalServerError(e.to_string()))?;

        for medication in rows {
            let methods: Vec<&str> = medication
                .methods
                .iter()
                .filter_map(|m| m.label.as_deref())
                .collect();
            writer.write_record([
                medication.sap_code.to_string(),
                medication.name,
                medication.active_ingredient.unwrap_or_default(),
                methods.join(METHOD_SEPARATOR),
            ]).map_err(|e| ApiError::InternalServerError(e.to_string()))?;
        }

        writer.flush().map_err(|e| ApiError::InternalServerError(e.to_string()))?;
    }

    Ok(csv_data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use crate::db::test_support::memory_pool;

    const CATALOG: &str = "\
sap_code,name,active_ingredient,methods
1001,Paracetamol 500mg,Paracetamol,Blister; Sachet
1002,Ibuprofeno 600mg,Ibuprofeno,Blister
1003,Suero fisiologico,,
not-a-number,Broken,,
1004,  ,Nothing,
";

    #[actix_rt::test]
    async fn test_import_catalog() {
        let store = SqliteStore::new(memory_pool().await);
        let summary = import_catalog(&store, CATALOG.as_bytes()).await.unwrap();

        assert_eq!(summary.total, 5);
        assert_eq!(summary.imported, 3);
        assert_eq!(summary.errors.len(), 2);
        assert!(summary.errors[0].starts_with("Row 4:"));
        assert_eq!(summary.errors[1], "Row 5: Name is required");

        let found = store.search_medications(&MedicationQuery::new("", 0, 50)).await.unwrap();
        let names: Vec<&str> = found.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Ibuprofeno 600mg", "Paracetamol 500mg", "Suero fisiologico"]);
        assert_eq!(found[1].methods.len(), 2);
        assert_eq!(found[2].active_ingredient, None);
        assert!(found[2].methods.is_empty());
        assert_eq!(store.list_methods().await.unwrap().len(), 2);
    }

    #[actix_rt::test]
    async fn test_import_is_idempotent() {
        let store = SqliteStore::new(memory_pool().await);
        import_catalog(&store, CATALOG.as_bytes()).await.unwrap();
        import_catalog(&store, CATALOG.as_bytes()).await.unwrap();

        assert_eq!(store.medication_count().await.unwrap(), 3);
        assert_eq!(store.list_methods().await.unwrap().len(), 2);
        let found = store.search_medications(&MedicationQuery::new("paracetamol", 0, 50)).await.unwrap();
        assert_eq!(found[0].methods.len(), 2);
    }

    #[actix_rt::test]
    async fn test_seed_file_and_export() -> anyhow::Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(CATALOG.as_bytes())?;

        let store = SqliteStore::new(memory_pool().await);
        let summary = seed_catalog_file(&store, file.path()).await?;
        assert_eq!(summary.imported, 3);

        let exported = String::from_utf8(catalog_csv(&store).await.unwrap())?;
        let lines: Vec<&str> = exported.lines().collect();
        assert_eq!(lines[0], "sap_code,name,active_ingredient,methods");
        assert_eq!(lines[2], "1001,Paracetamol 500mg,Paracetamol,Blister;Sachet");
        assert_eq!(lines.len(), 4);

        // The export loads back unchanged
        let reloaded = SqliteStore::new(memory_pool().await);
        let again = import_catalog(&reloaded, exported.as_bytes()).await.unwrap();
        assert_eq!(again.imported, 3);
        assert!(again.errors.is_empty());

        assert!(seed_catalog_file(&store, Path::new("/nonexistent/catalog.csv")).await.is_err());
        Ok(())
    }

    #[test]
    fn test_method_labels() {
        let record = CatalogRecord {
            sap_code: 1,
            name: "x".to_string(),
            active_ingredient: None,
            methods: Some(" Blister ;; Sachet;".to_string()),
        };
        assert_eq!(record.method_labels(), vec!["Blister", "Sachet"]);
    }
}
