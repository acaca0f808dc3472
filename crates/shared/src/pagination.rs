//! Offset pagination utilities.
//!
//! Pages are 1-based. Listing endpoints return the [`Paginated`] envelope
//! `{page, limit, total, results}` where `total` is the full match count.

use serde::{Deserialize, Serialize};

/// First page number.
pub const DEFAULT_PAGE: u32 = 1;

/// Page size used when the caller does not supply one.
pub const DEFAULT_LIMIT: u32 = 50;

/// Largest page size a caller may request.
pub const MAX_LIMIT: u32 = 200;

/// Clamps a requested page into `[1, ∞)`, defaulting to the first page.
pub fn normalize_page(page: Option<u32>) -> u32 {
    page.unwrap_or(DEFAULT_PAGE).max(1)
}

/// Clamps a requested page size into `[1, MAX_LIMIT]`, defaulting to [`DEFAULT_LIMIT`].
pub fn normalize_limit(limit: Option<u32>) -> u32 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// Number of rows to skip for a 1-based page.
pub fn offset(page: u32, limit: u32) -> i64 {
    (i64::from(page.max(1)) - 1) * i64::from(limit)
}

/// Paginated response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub results: Vec<T>,
}

impl<T> Paginated<T> {
    pub fn new(page: u32, limit: u32, total: u64, results: Vec<T>) -> Self {
        Self {
            page,
            limit,
            total,
            results,
        }
    }

    /// An envelope with no results and a zero total.
    pub fn empty(page: u32, limit: u32) -> Self {
        Self::new(page, limit, 0, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_page() {
        assert_eq!(normalize_page(None), 1);
        assert_eq!(normalize_page(Some(0)), 1);
        assert_eq!(normalize_page(Some(7)), 7);
    }

    #[test]
    fn test_normalize_limit() {
        assert_eq!(normalize_limit(None), 50);
        assert_eq!(normalize_limit(Some(0)), 1);
        assert_eq!(normalize_limit(Some(500)), 200);
        assert_eq!(normalize_limit(Some(25)), 25);
    }

    #[test]
    fn test_offset() {
        assert_eq!(offset(1, 50), 0);
        assert_eq!(offset(2, 50), 50);
        assert_eq!(offset(3, 2), 4);
    }

    #[test]
    fn test_offset_large_page_does_not_overflow() {
        assert_eq!(offset(u32::MAX, MAX_LIMIT), (i64::from(u32::MAX) - 1) * 200);
    }

    #[test]
    fn test_empty_envelope_serialization() {
        let page: Paginated<String> = Paginated::empty(1, 50);
        let json = serde_json::to_value(&page).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"page": 1, "limit": 50, "total": 0, "results": []})
        );
        assert!(page.is_empty());
    }
}
