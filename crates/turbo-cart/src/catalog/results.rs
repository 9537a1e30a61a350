//! Search results and pagination.

use serde::{Deserialize, Serialize};

/// Pagination info.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pagination {
    /// Current page (1-indexed).
    pub page: i64,
    /// Items per page.
    pub per_page: i64,
    /// Total number of items.
    pub total: i64,
    /// Total number of pages; at least 1.
    pub total_pages: i64,
    /// Whether there's a next page.
    pub has_next: bool,
    /// Whether there's a previous page.
    pub has_prev: bool,
}

impl Pagination {
    /// Create pagination info, clamping `page` into `1..=total_pages`.
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        let per_page = per_page.max(1);
        let total = total.max(0);
        let total_pages = Self::pages_for(total, per_page);
        let page = page.clamp(1, total_pages);

        Self {
            page,
            per_page,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }

    /// Number of pages needed for `total` items; 1 when empty.
    pub fn pages_for(total: i64, per_page: i64) -> i64 {
        if total <= 0 {
            1
        } else {
            (total + per_page - 1) / per_page
        }
    }

    /// Get the item offset of the current page.
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }

    /// Get page numbers for display (e.g., [3, 4, 5, 6, 7]).
    pub fn page_numbers(&self, max_visible: usize) -> Vec<i64> {
        if self.total_pages as usize <= max_visible {
            return (1..=self.total_pages).collect();
        }

        let half = max_visible / 2;
        let start = (self.page - half as i64).max(1);
        let end = (start + max_visible as i64 - 1).min(self.total_pages);
        let start = (end - max_visible as i64 + 1).max(1);

        (start..=end).collect()
    }

    /// Check if on first page.
    pub fn is_first(&self) -> bool {
        self.page == 1
    }

    /// Check if on last page.
    pub fn is_last(&self) -> bool {
        self.page >= self.total_pages
    }

    /// Get start item number (1-indexed).
    pub fn start_item(&self) -> i64 {
        if self.total == 0 {
            0
        } else {
            self.offset() + 1
        }
    }

    /// Get end item number.
    pub fn end_item(&self) -> i64 {
        (self.page * self.per_page).min(self.total)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(1, 12, 0)
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults<T> {
    /// The result items.
    pub items: Vec<T>,
    /// Pagination info.
    pub pagination: Pagination,
    /// Page the caller asked for before clamping.
    pub requested_page: i64,
}

impl<T> SearchResults<T> {
    pub fn new(items: Vec<T>, pagination: Pagination, requested_page: i64) -> Self {
        Self {
            items,
            pagination,
            requested_page,
        }
    }

    /// Whether the requested page was out of range and got clamped.
    pub fn was_clamped(&self) -> bool {
        self.requested_page != self.pagination.page
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get number of items in this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }
}
