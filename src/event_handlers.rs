// src/event_handlers.rs
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::get_current_user;
use crate::error::ApiResult;
use crate::handlers::ApiResponse;
use crate::models::EventDraft;
use crate::repositories::RepackagingStore;
use crate::validator::EventValidator;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

/// Records one event for the signed-in user. The owner always comes from
/// the token.
pub async fn create_event(
    app_state: web::Data<Arc<AppState>>,
    draft: web::Json<EventDraft>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = get_current_user(&http_request)?;
    let event = EventValidator::validate(&draft)?;

    let stored = app_state.store.insert_event(&claims.sub, &event).await?;

    Ok(HttpResponse::Created().json(ApiResponse::success_with_message(
        stored,
        "Event recorded successfully".to_string(),
    )))
}

pub async fn get_history(
    app_state: web::Data<Arc<AppState>>,
    query: web::Query<HistoryQuery>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = get_current_user(&http_request)?;
    let max = app_state.config.catalog.history_limit;
    let limit = query.limit.unwrap_or(max).clamp(1, max);

    let entries = app_state.store.list_events(&claims.sub, limit).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(entries)))
}
