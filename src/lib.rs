//! Repackaging (reenvasado) tracking: medication catalog, repackaging
//! events and their history, behind an actix-web JSON API, plus the
//! client-side screen workflows that drive it.

pub mod auth;
pub mod auth_handlers;
pub mod catalog_handlers;
pub mod config;
pub mod db;
pub mod error;
pub mod event_handlers;
pub mod handlers;
pub mod import_export;
pub mod models;
pub mod pagination;
pub mod repositories;
pub mod routes;
pub mod session;
pub mod validator;
pub mod workflow;

use sqlx::SqlitePool;
use config::Config;
use repositories::SqliteStore;

pub struct AppState {
    pub db_pool: SqlitePool,
    pub config: Config,
    pub store: SqliteStore,
}

impl AppState {
    pub fn new(db_pool: SqlitePool, config: Config) -> Self {
        Self {
            store: SqliteStore::new(db_pool.clone()),
            db_pool,
            config,
        }
    }
}
