//! Cross-cutting policy layered over any data source.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use log::trace;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::Capabilities;
use super::ChangeEvent;
use super::ColumnInfo;
use super::DataSource;
use crate::cache::CacheConfig;
use crate::cache::ResponseCache;
use crate::error::DataSourceError;
use crate::error::ValidationResult;
use crate::export::ExportFormat;
use crate::export::ExportOutput;
use crate::filter::FilterOperator;
use crate::query::DataSourceQuery;
use crate::response::CacheStatus;
use crate::response::DataSourceResponse;
use crate::retry::RetryPolicy;
use crate::retry::with_retry_if;

/// Predicate deciding whether a failed fetch is attempted again.
pub type ShouldRetryFn = Arc<dyn Fn(&DataSourceError) -> bool + Send + Sync>;

/// Rows fetched per request by the default export.
pub const DEFAULT_EXPORT_BATCH_SIZE: usize = 1000;

/// Configuration for [`BaseDataSource`].
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use datatable_lib::cache::CacheConfig;
/// use datatable_lib::retry::RetryPolicy;
/// use datatable_lib::source::BaseDataSourceConfig;
///
/// let config = BaseDataSourceConfig::default()
///     .cache(CacheConfig::enabled().with_ttl(Duration::from_secs(30)))
///     .retry(RetryPolicy::default().max_attempts(5))
///     .should_retry(|e| e.is_retryable());
/// ```
#[derive(Clone)]
pub struct BaseDataSourceConfig {
    /// Response caching. Disabled by default.
    pub cache: CacheConfig,
    /// Retry policy for fetches.
    pub retry: RetryPolicy,
    /// Vetoes retries for non-retriable errors. Unset retries every error.
    pub should_retry: Option<ShouldRetryFn>,
    /// Page size used when exporting.
    pub export_batch_size: usize,
}

impl Default for BaseDataSourceConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            retry: RetryPolicy::default(),
            should_retry: None,
            export_batch_size: DEFAULT_EXPORT_BATCH_SIZE,
        }
    }
}

impl BaseDataSourceConfig {
    /// Sets the cache config.
    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Sets the retry policy.
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the retry predicate.
    pub fn should_retry<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&DataSourceError) -> bool + Send + Sync + 'static,
    {
        self.should_retry = Some(Arc::new(predicate));
        self
    }

    /// Sets the export page size.
    pub fn export_batch_size(mut self, size: usize) -> Self {
        self.export_batch_size = size.max(1);
        self
    }
}

impl fmt::Debug for BaseDataSourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseDataSourceConfig")
            .field("cache", &self.cache)
            .field("retry", &self.retry)
            .field("should_retry", &self.should_retry.as_ref().map(|_| "<fn>"))
            .field("export_batch_size", &self.export_batch_size)
            .finish()
    }
}

/// Wraps a source with a TTL cache, retry with backoff, and default
/// `count`/`export` implementations.
///
/// Capabilities the wrapped source declares are delegated to it; `count`
/// and `export` are always available. Successful writes clear the cache.
///
/// # Example
///
/// ```ignore
/// let source = BaseDataSource::new(
///     InMemoryDataSource::new(rows),
///     BaseDataSourceConfig::default().cache(CacheConfig::enabled()),
/// );
/// let page = source.fetch(&DataSourceQuery::new().page(0, 20)).await?;
/// ```
pub struct BaseDataSource<S: DataSource> {
    inner: S,
    config: BaseDataSourceConfig,
    cache: ResponseCache<S::Row>,
}

impl<S: DataSource> BaseDataSource<S> {
    /// Wraps `inner` with the given policy.
    pub fn new(inner: S, config: BaseDataSourceConfig) -> Self {
        let cache = ResponseCache::new(config.cache.ttl);
        Self { inner, config, cache }
    }

    /// Wraps `inner` with default policy (no cache, 3 attempts).
    pub fn with_defaults(inner: S) -> Self {
        Self::new(inner, BaseDataSourceConfig::default())
    }

    /// The wrapped source.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Active configuration.
    pub fn config(&self) -> &BaseDataSourceConfig {
        &self.config
    }

    /// Drops every cached response.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Drops the cached response for one query.
    pub fn invalidate_cache(&self, query: &DataSourceQuery) {
        self.cache.invalidate(&self.config.cache.key_for(query));
    }

    /// Number of cached responses (including expired ones not yet evicted).
    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    /// Fetches through the retry policy, bypassing the cache.
    async fn fetch_fresh(&self, query: &DataSourceQuery) -> Result<DataSourceResponse<S::Row>, DataSourceError> {
        let query = self.inner.transform_query(query.clone());
        let started = Instant::now();

        let should_retry = self.config.should_retry.clone();
        let response = with_retry_if(
            &self.config.retry,
            |e: &DataSourceError| should_retry.as_ref().is_none_or(|p| p(e)),
            || self.inner.fetch(&query),
        )
        .await?;

        let mut response = self.inner.transform_response(response);
        if response.metadata.execution_time.is_none() {
            response.metadata.execution_time = Some(started.elapsed());
        }
        Ok(response)
    }

    fn write_through<T>(&self, result: Result<T, DataSourceError>) -> Result<T, DataSourceError> {
        if result.is_ok() {
            self.cache.clear();
        }
        result
    }
}

impl<S> BaseDataSource<S>
where
    S: DataSource,
    S::Row: Serialize,
{
    /// Like [`DataSource::fetch`], resolving to
    /// [`DataSourceError::Cancelled`] if `cancel` fires first.
    pub async fn fetch_with_cancel(
        &self,
        query: &DataSourceQuery,
        cancel: CancellationToken,
    ) -> Result<DataSourceResponse<S::Row>, DataSourceError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(DataSourceError::Cancelled),
            result = self.fetch(query) => result,
        }
    }

    /// Like [`DataSource::export`], resolving to
    /// [`DataSourceError::Cancelled`] if `cancel` fires first.
    pub async fn export_with_cancel(
        &self,
        query: &DataSourceQuery,
        format: ExportFormat,
        cancel: CancellationToken,
    ) -> Result<ExportOutput, DataSourceError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(DataSourceError::Cancelled),
            result = self.export(query, format) => result,
        }
    }

    /// Fetches every page of `query` in fixed-size batches.
    async fn fetch_all(&self, query: &DataSourceQuery) -> Result<Vec<S::Row>, DataSourceError> {
        let batch_size = self.config.export_batch_size;
        let mut rows = Vec::new();
        let mut page_index = 0;

        loop {
            let page = self.fetch_fresh(&query.with_page(page_index, batch_size)).await?;
            let received = page.data.len();
            let has_next = page.has_next_page;
            rows.extend(page.data);
            debug!("export batch {} returned {} rows", page_index, received);

            if has_next == Some(false) || received < batch_size {
                break;
            }
            page_index += 1;
        }

        Ok(rows)
    }
}

#[async_trait]
impl<S> DataSource for BaseDataSource<S>
where
    S: DataSource,
    S::Row: Serialize,
{
    type Row = S::Row;

    async fn fetch(&self, query: &DataSourceQuery) -> Result<DataSourceResponse<S::Row>, DataSourceError> {
        if !self.config.cache.enabled {
            return self.fetch_fresh(query).await;
        }

        let key = self.config.cache.key_for(query);
        if let Some(entry) = self.cache.get(&key) {
            trace!("cache hit for {}", key);
            let expires_at = entry.expires_at();
            let mut response = entry.data;
            response.metadata.cache = CacheStatus::Hit {
                cached_at: entry.cached_at,
                expires_at,
            };
            return Ok(response);
        }

        trace!("cache miss for {}", key);
        let mut response = self.fetch_fresh(query).await?;
        let entry = self.cache.insert(key, response.clone());
        response.metadata.cache = CacheStatus::Miss {
            cached_at: entry.cached_at,
            expires_at: entry.expires_at(),
        };
        Ok(response)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            count: true,
            export: true,
            ..self.inner.capabilities()
        }
    }

    /// Uses the wrapped source's count when declared, otherwise fetches a
    /// single row and reads `total`.
    async fn count(&self, query: &DataSourceQuery) -> Result<usize, DataSourceError> {
        if self.inner.capabilities().count {
            return self.inner.count(query).await;
        }
        let response = self.fetch(&query.with_page(0, 1)).await?;
        Ok(response.total)
    }

    /// Uses the wrapped source's export when declared, otherwise fetches
    /// every page and serializes the accumulated rows.
    async fn export(&self, query: &DataSourceQuery, format: ExportFormat) -> Result<ExportOutput, DataSourceError> {
        if self.inner.capabilities().export {
            return self.inner.export(query, format).await;
        }

        let rows = self.fetch_all(query).await?;
        let values = rows
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        ExportOutput::from_rows(&values, format)
    }

    async fn columns(&self) -> Result<Vec<ColumnInfo>, DataSourceError> {
        self.inner.columns().await
    }

    async fn filter_operators(&self, field: &str) -> Result<Vec<FilterOperator>, DataSourceError> {
        self.inner.filter_operators(field).await
    }

    fn validate_query(&self, query: &DataSourceQuery) -> Result<ValidationResult, DataSourceError> {
        self.inner.validate_query(query)
    }

    fn subscribe(&self) -> Result<broadcast::Receiver<ChangeEvent<S::Row>>, DataSourceError> {
        self.inner.subscribe()
    }

    async fn create(&self, row: S::Row) -> Result<S::Row, DataSourceError> {
        self.write_through(self.inner.create(row).await)
    }

    async fn update(&self, id: &str, changes: S::Row) -> Result<S::Row, DataSourceError> {
        self.write_through(self.inner.update(id, changes).await)
    }

    async fn delete(&self, id: &str) -> Result<(), DataSourceError> {
        self.write_through(self.inner.delete(id).await)
    }

    async fn create_many(&self, rows: Vec<S::Row>) -> Result<Vec<S::Row>, DataSourceError> {
        self.write_through(self.inner.create_many(rows).await)
    }

    async fn update_many(&self, changes: Vec<(String, S::Row)>) -> Result<Vec<S::Row>, DataSourceError> {
        self.write_through(self.inner.update_many(changes).await)
    }

    async fn delete_many(&self, ids: &[String]) -> Result<usize, DataSourceError> {
        self.write_through(self.inner.delete_many(ids).await)
    }
}

impl<S: DataSource + fmt::Debug> fmt::Debug for BaseDataSource<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseDataSource")
            .field("inner", &self.inner)
            .field("config", &self.config)
            .field("cached_entries", &self.cache.len())
            .finish()
    }
}
