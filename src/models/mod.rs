// src/models/mod.rs

pub mod event;
pub mod medication;

pub use event::*;
pub use medication::*;

use serde::Deserialize;

// ==================== COMMON / SHARED ====================

/// Parameters of the incremental medication search
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub limit: Option<i64>,
}
