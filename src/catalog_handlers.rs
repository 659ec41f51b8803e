// src/catalog_handlers.rs
use actix_web::{web, HttpResponse};
use std::sync::Arc;

use crate::error::ApiResult;
use crate::handlers::ApiResponse;
use crate::models::{Medication, MedicationQuery, SearchQuery};
use crate::pagination::{CatalogPageQuery, PageWindow, PaginatedResponse};
use crate::repositories::RepackagingStore;
use crate::AppState;

/// Paginated catalog. An empty `q` lists every medication.
pub async fn list_medications(
    app_state: web::Data<Arc<AppState>>,
    query: web::Query<CatalogPageQuery>,
) -> ApiResult<HttpResponse> {
    let (page, per_page, offset) = query.normalize(app_state.config.catalog.catalog_page_size);
    let medication_query = MedicationQuery::new(query.search_text(), offset, per_page);

    let data = app_state.store.search_medications(&medication_query).await?;
    let window = PageWindow::new(page - 1, per_page, data.len() as i64);

    Ok(HttpResponse::Ok().json(ApiResponse::success(PaginatedResponse {
        data,
        pagination: window.into(),
    })))
}

/// Incremental search. Below the minimum length nothing is queried.
pub async fn search_medications(
    app_state: web::Data<Arc<AppState>>,
    query: web::Query<SearchQuery>,
) -> ApiResult<HttpResponse> {
    let catalog = &app_state.config.catalog;
    let text = query.q.as_deref().map(str::trim).unwrap_or("");

    if text.chars().count() < catalog.search_min_chars {
        return Ok(HttpResponse::Ok().json(ApiResponse::success(Vec::<Medication>::new())));
    }

    let limit = query.limit.unwrap_or(catalog.search_limit).clamp(1, catalog.search_limit);
    let results = app_state
        .store
        .search_medications(&MedicationQuery::new(text, 0, limit))
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(results)))
}

pub async fn list_methods(app_state: web::Data<Arc<AppState>>) -> ApiResult<HttpResponse> {
    let methods = app_state.store.list_methods().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(methods)))
}
