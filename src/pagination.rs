// src/pagination.rs
//! Offset pagination of the medication catalog.
//! No total count: "next" is offered while the last page came back full.

use serde::{Deserialize, Serialize};

pub const MAX_PER_PAGE: i64 = 100;
pub const MAX_PAGE: i64 = 1_000_000;

// ==================== QUERY PARAMETERS ====================

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CatalogPageQuery {
    pub q: Option<String>,
    /// 1-based
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl CatalogPageQuery {
    /// `(page, per_page, offset)` with the page clamped to `1..=MAX_PAGE`
    /// and the size to `1..=MAX_PER_PAGE`.
    pub fn normalize(&self, default_per_page: i64) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).clamp(1, MAX_PAGE);
        let per_page = self.per_page.unwrap_or(default_per_page).clamp(1, MAX_PER_PAGE);
        let offset = (page - 1) * per_page;
        (page, per_page, offset)
    }

    pub fn search_text(&self) -> &str {
        self.q.as_deref().map(str::trim).unwrap_or("")
    }
}

// ==================== PAGE WINDOW ====================

/// One fetched page: its 0-based index, the requested size and how many
/// rows came back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    pub index: i64,
    pub size: i64,
    pub shown: i64,
}

impl PageWindow {
    pub fn new(index: i64, size: i64, shown: i64) -> Self {
        Self { index, size, shown }
    }

    pub fn offset(&self) -> i64 {
        self.index * self.size
    }

    pub fn has_next(&self) -> bool {
        self.shown == self.size
    }

    pub fn has_prev(&self) -> bool {
        self.index > 0
    }

    /// 1-based page number for display.
    pub fn page_number(&self) -> i64 {
        self.index + 1
    }

    /// `"51–100"`, or `None` when the page is empty.
    pub fn range_text(&self) -> Option<String> {
        if self.shown == 0 {
            return None;
        }
        let from = self.offset();
        Some(format!("{}–{}", from + 1, from + self.shown))
    }
}

// ==================== RESPONSE STRUCTURES ====================

#[derive(Debug, Serialize)]
pub struct PaginationInfo {
    pub page: i64,
    pub per_page: i64,
    pub has_next: bool,
    pub has_prev: bool,
    pub range: Option<String>,
}

impl From<PageWindow> for PaginationInfo {
    fn from(window: PageWindow) -> Self {
        Self {
            page: window.page_number(),
            per_page: window.size,
            has_next: window.has_next(),
            has_prev: window.has_prev(),
            range: window.range_text(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationInfo,
}
