// src/auth_handlers.rs
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use validator::Validate;

use crate::auth::{authenticate, get_current_user, revoke_token, AuthService, Credentials, LoginResponse, User};
use crate::error::{ApiError, ApiResult};
use crate::handlers::ApiResponse;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub user_id: String,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

// ======== AUTH HANDLERS ========

pub async fn login(
    app_state: web::Data<Arc<AppState>>,
    auth_service: web::Data<Arc<AuthService>>,
    request: web::Json<Credentials>,
) -> ApiResult<HttpResponse> {
    request.validate()?;

    let user = authenticate(
        &app_state.db_pool,
        &auth_service,
        &app_state.config.auth,
        &request,
    ).await?;

    let (token, _) = auth_service.generate_token(&user)?;

    let response = LoginResponse {
        token,
        expires_in: auth_service.token_lifetime_secs(),
        user: user.into(),
    };

    log::info!("User {} logged in successfully", response.user.email);

    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        response,
        "Login successful".to_string(),
    )))
}

pub async fn register(
    app_state: web::Data<Arc<AppState>>,
    auth_service: web::Data<Arc<AuthService>>,
    request: web::Json<Credentials>,
) -> ApiResult<HttpResponse> {
    if !app_state.config.auth.allow_self_registration {
        return Err(ApiError::Forbidden("Self-registration is disabled".to_string()));
    }
    request.validate()?;

    let user = User::create(&app_state.db_pool, &request, &auth_service).await?;
    let (token, _) = auth_service.generate_token(&user)?;

    let response = LoginResponse {
        token,
        expires_in: auth_service.token_lifetime_secs(),
        user: user.into(),
    };

    log::info!("New user registered: {}", response.user.email);

    Ok(HttpResponse::Created().json(ApiResponse::success_with_message(
        response,
        "User registered successfully".to_string(),
    )))
}

pub async fn get_session(http_request: HttpRequest) -> ApiResult<HttpResponse> {
    let claims = get_current_user(&http_request)?;

    let info = SessionInfo {
        expires_at: claims.expires_at(),
        user_id: claims.sub,
        email: claims.email,
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success(info)))
}

/// Revokes the presented token; later requests carrying it are refused.
pub async fn logout(
    app_state: web::Data<Arc<AppState>>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = get_current_user(&http_request)?;
    revoke_token(&app_state.db_pool, &claims).await?;

    log::info!("User {} signed out", claims.email);

    Ok(HttpResponse::Ok().json(ApiResponse::message("Signed out".to_string())))
}
