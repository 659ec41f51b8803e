// src/routes.rs - HTTP route table
use actix_web::web;
use actix_web_httpauth::middleware::HttpAuthentication;

use crate::auth::jwt_middleware;
use crate::auth_handlers::{get_session, login, logout, register};
use crate::catalog_handlers::{list_medications, list_methods, search_medications};
use crate::event_handlers::{create_event, get_history};
use crate::handlers::health;
use crate::import_export::export_catalog;

/// Registers every route. Expects `web::Data<Arc<AppState>>` and
/// `web::Data<Arc<AuthService>>` on the app.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        // Health check (no auth)
        .route("/health", web::get().to(health))

        // Auth endpoints (no authentication required)
        .service(
            web::scope("/auth")
                .route("/login", web::post().to(login))
                .route("/register", web::post().to(register))
        )

        // Session endpoints (bearer token)
        .service(
            web::scope("/api/auth")
                .wrap(HttpAuthentication::bearer(jwt_middleware))
                .route("/session", web::get().to(get_session))
                .route("/logout", web::post().to(logout))
        )

        // Events, scoped to the token's owner
        .service(
            web::scope("/api/events")
                .wrap(HttpAuthentication::bearer(jwt_middleware))
                .route("", web::post().to(create_event))
                .route("/history", web::get().to(get_history))
        )

        // Catalog reads (public)
        .service(
            web::scope("/api")
                .route("/medications", web::get().to(list_medications))
                .route("/medications/search", web::get().to(search_medications))
                .route("/medications/export", web::get().to(export_catalog))
                .route("/methods", web::get().to(list_methods))
        );
}
