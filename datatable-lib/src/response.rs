//! Response returned by a data source, with pagination flags and cache status

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::DateTime;
use chrono::Utc;
use serde_json::Value;

use crate::query::Pagination;

/// One page of rows plus totals and metadata.
///
/// # Example
///
/// ```
/// use datatable_lib::DataSourceResponse;
/// use datatable_lib::query::Pagination;
///
/// let response = DataSourceResponse::paginated(vec![3, 4], 5, Some(Pagination::new(1, 2)));
/// assert_eq!(response.page_count, Some(3));
/// assert_eq!(response.has_next_page, Some(true));
/// assert_eq!(response.has_prev_page, Some(true));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DataSourceResponse<T> {
    /// Rows on this page.
    pub data: Vec<T>,
    /// Number of rows matching the query across all pages.
    pub total: usize,
    /// Number of pages, when the query was paginated.
    pub page_count: Option<usize>,
    /// Whether a page follows this one.
    pub has_next_page: Option<bool>,
    /// Whether a page precedes this one.
    pub has_prev_page: Option<bool>,
    /// Aggregate results keyed by [`Aggregation::result_key`](crate::query::Aggregation::result_key).
    pub aggregations: Option<BTreeMap<String, Value>>,
    /// Execution metadata.
    pub metadata: ResponseMetadata,
}

impl<T> DataSourceResponse<T> {
    /// Creates an unpaginated response.
    pub fn new(data: Vec<T>, total: usize) -> Self {
        Self {
            data,
            total,
            page_count: None,
            has_next_page: None,
            has_prev_page: None,
            aggregations: None,
            metadata: ResponseMetadata::default(),
        }
    }

    /// Creates a response and derives pagination flags from `total`.
    pub fn paginated(data: Vec<T>, total: usize, pagination: Option<Pagination>) -> Self {
        let mut response = Self::new(data, total);
        if let Some(page) = pagination {
            let page_count = page.page_count(total);
            response.page_count = Some(page_count);
            response.has_next_page = Some(page.page_index + 1 < page_count);
            response.has_prev_page = Some(page.page_index > 0);
        }
        response
    }

    /// Creates a page for a backend that reports no total.
    ///
    /// `total` counts the rows seen up to the end of this page, `page_count`
    /// stays unknown, and a full page is assumed to have a successor.
    pub fn open_ended(data: Vec<T>, pagination: Pagination) -> Self {
        let received = data.len();
        let mut response = Self::new(data, pagination.offset().saturating_add(received));
        response.has_next_page = Some(pagination.page_size > 0 && received == pagination.page_size);
        response.has_prev_page = Some(pagination.page_index > 0);
        response
    }

    /// Attaches aggregation results.
    pub fn with_aggregations(mut self, aggregations: BTreeMap<String, Value>) -> Self {
        self.aggregations = Some(aggregations);
        self
    }

    /// Records how long the fetch took.
    pub fn with_execution_time(mut self, elapsed: Duration) -> Self {
        self.metadata.execution_time = Some(elapsed);
        self
    }

    /// Returns `true` if this response was served from cache.
    pub fn is_cached(&self) -> bool {
        self.metadata.cache.is_hit()
    }

    /// Number of rows on this page.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if this page has no rows.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Maps each row, keeping totals and metadata.
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> DataSourceResponse<U> {
        DataSourceResponse {
            data: self.data.into_iter().map(f).collect(),
            total: self.total,
            page_count: self.page_count,
            has_next_page: self.has_next_page,
            has_prev_page: self.has_prev_page,
            aggregations: self.aggregations,
            metadata: self.metadata,
        }
    }
}

/// Execution metadata attached to a response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponseMetadata {
    /// Wall time spent in the backend, when measured.
    pub execution_time: Option<Duration>,
    /// Whether the response came from the cache.
    pub cache: CacheStatus,
}

/// Cache status for a response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheStatus {
    /// Cache was disabled or bypassed for this request.
    #[default]
    None,
    /// Cache miss - data was freshly fetched and is now cached.
    Miss {
        /// When the data was cached.
        cached_at: DateTime<Utc>,
        /// When the cached data will expire.
        expires_at: DateTime<Utc>,
    },
    /// Cache hit - data was returned from cache.
    Hit {
        /// When the data was originally cached.
        cached_at: DateTime<Utc>,
        /// When the cached data will expire.
        expires_at: DateTime<Utc>,
    },
}

impl CacheStatus {
    /// Returns `true` if this is a cache hit.
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit { .. })
    }

    /// Returns `true` if this is a cache miss.
    pub fn is_miss(&self) -> bool {
        matches!(self, Self::Miss { .. })
    }

    /// Returns `true` if caching was not involved.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Returns when the data was cached, if applicable.
    pub fn cached_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::None => None,
            Self::Miss { cached_at, .. } | Self::Hit { cached_at, .. } => Some(*cached_at),
        }
    }

    /// Returns when the cached data expires, if applicable.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::None => None,
            Self::Miss { expires_at, .. } | Self::Hit { expires_at, .. } => Some(*expires_at),
        }
    }
}
