// src/models/metadata.rs

use serde::Serialize;

use crate::models::pagination::PageRequest;

/// Pagination summary returned next to every listing.
/// Derived from the filtered total, never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub current_page: i64,
    pub page_size: i64,
    pub first_page: i64,
    pub last_page: i64,
    pub total_records: i64,
}

impl Metadata {
    /// All fields are zero when there is nothing to page through.
    pub fn calculate(total_records: i64, page: &PageRequest) -> Self {
        if total_records <= 0 || page.page_size <= 0 {
            return Metadata::default();
        }

        Metadata {
            current_page: page.page,
            page_size: page.page_size,
            first_page: 1,
            last_page: (total_records + page.page_size - 1) / page.page_size,
            total_records,
        }
    }
}
