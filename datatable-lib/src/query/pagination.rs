//! Page window for a query.

use serde::Deserialize;
use serde::Serialize;

/// Zero-based page window.
///
/// # Example
///
/// ```
/// use datatable_lib::query::Pagination;
///
/// let page = Pagination::new(2, 25);
/// assert_eq!(page.offset(), 50);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Zero-based page index.
    pub page_index: usize,
    /// Number of rows per page.
    pub page_size: usize,
}

impl Pagination {
    /// Creates a new page window.
    pub fn new(page_index: usize, page_size: usize) -> Self {
        Self {
            page_index,
            page_size,
        }
    }

    /// Index of the first row on this page.
    pub fn offset(&self) -> usize {
        self.page_index.saturating_mul(self.page_size)
    }

    /// Number of pages needed for `total` rows.
    pub fn page_count(&self, total: usize) -> usize {
        if self.page_size == 0 {
            return 0;
        }
        total.div_ceil(self.page_size)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(0, 10)
    }
}
