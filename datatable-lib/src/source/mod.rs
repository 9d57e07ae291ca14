//! The data source contract and its implementations.
//!
//! Every backend implements [`DataSource::fetch`]. All other operations are
//! optional: a source advertises them through [`Capabilities`] and callers
//! check the flags before invoking them. Calling an undeclared capability
//! yields [`DataSourceError::Unsupported`].
//!
//! - [`BaseDataSource`] wraps any source with caching, retry, a default
//!   `count` and a default paginated `export`.
//! - [`InMemoryDataSource`] serves JSON rows held in memory.
//! - [`HttpDataSource`] maps queries onto a conventional REST endpoint.

mod base;
mod http;
mod memory;

pub use base::*;
pub use http::*;
pub use memory::*;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::error::Capability;
use crate::error::DataSourceError;
use crate::error::ValidationResult;
use crate::export::ExportFormat;
use crate::export::ExportOutput;
use crate::filter::FieldType;
use crate::filter::FilterOperator;
use crate::query::DataSourceQuery;
use crate::response::DataSourceResponse;

/// Optional operations a source supports beyond `fetch`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub count: bool,
    pub export: bool,
    pub columns: bool,
    pub filter_operators: bool,
    pub validate_query: bool,
    /// Source rewrites queries or responses via the transform hooks.
    pub transform: bool,
    pub subscribe: bool,
    /// Single-row create/update/delete.
    pub crud: bool,
    /// Multi-row create/update/delete.
    pub batch: bool,
}

impl Capabilities {
    /// Only `fetch`.
    pub fn fetch_only() -> Self {
        Self::default()
    }

    /// Returns `true` if the given capability is declared.
    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Count => self.count,
            Capability::Export => self.export,
            Capability::Columns => self.columns,
            Capability::FilterOperators => self.filter_operators,
            Capability::ValidateQuery => self.validate_query,
            Capability::Subscribe => self.subscribe,
            Capability::Crud => self.crud,
            Capability::Batch => self.batch,
        }
    }
}

/// Column description reported by a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    /// Field path in each row.
    pub field: String,
    /// Display label.
    pub label: String,
    pub field_type: FieldType,
    #[serde(default = "default_true")]
    pub sortable: bool,
    #[serde(default = "default_true")]
    pub filterable: bool,
}

fn default_true() -> bool {
    true
}

impl ColumnInfo {
    /// Sortable, filterable column labelled with its field name.
    pub fn new(field: impl Into<String>, field_type: FieldType) -> Self {
        let field = field.into();
        Self {
            label: field.clone(),
            field,
            field_type,
            sortable: true,
            filterable: true,
        }
    }

    /// Sets the display label.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// Notification of a change to the backing rows.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent<T> {
    Created(T),
    Updated { id: String, row: T },
    Deleted { id: String },
}

fn unsupported<T>(capability: Capability) -> Result<T, DataSourceError> {
    Err(DataSourceError::Unsupported(capability))
}

/// A backend supplying paginated, sortable, filterable rows.
///
/// Given the same query and unchanged backing data, `fetch` must return the
/// same rows, total and pagination flags.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Row type produced by this source.
    type Row: Clone + Send + Sync + 'static;

    /// Fetches one page of rows.
    async fn fetch(&self, query: &DataSourceQuery) -> Result<DataSourceResponse<Self::Row>, DataSourceError>;

    /// Optional operations this source implements.
    fn capabilities(&self) -> Capabilities {
        Capabilities::fetch_only()
    }

    /// Number of rows matching the query.
    async fn count(&self, _query: &DataSourceQuery) -> Result<usize, DataSourceError> {
        unsupported(Capability::Count)
    }

    /// All rows matching the query, serialized.
    async fn export(&self, _query: &DataSourceQuery, _format: ExportFormat) -> Result<ExportOutput, DataSourceError> {
        unsupported(Capability::Export)
    }

    /// Column descriptions.
    async fn columns(&self) -> Result<Vec<ColumnInfo>, DataSourceError> {
        unsupported(Capability::Columns)
    }

    /// Operators offered for a field.
    async fn filter_operators(&self, _field: &str) -> Result<Vec<FilterOperator>, DataSourceError> {
        unsupported(Capability::FilterOperators)
    }

    /// Checks a query before it is sent.
    fn validate_query(&self, _query: &DataSourceQuery) -> Result<ValidationResult, DataSourceError> {
        unsupported(Capability::ValidateQuery)
    }

    /// Rewrites a query before it is fetched.
    fn transform_query(&self, query: DataSourceQuery) -> DataSourceQuery {
        query
    }

    /// Rewrites a response after it is fetched.
    fn transform_response(&self, response: DataSourceResponse<Self::Row>) -> DataSourceResponse<Self::Row> {
        response
    }

    /// Stream of changes to the backing rows.
    fn subscribe(&self) -> Result<broadcast::Receiver<ChangeEvent<Self::Row>>, DataSourceError> {
        unsupported(Capability::Subscribe)
    }

    async fn create(&self, _row: Self::Row) -> Result<Self::Row, DataSourceError> {
        unsupported(Capability::Crud)
    }

    /// Merges `changes` into the row with `id`.
    async fn update(&self, _id: &str, _changes: Self::Row) -> Result<Self::Row, DataSourceError> {
        unsupported(Capability::Crud)
    }

    async fn delete(&self, _id: &str) -> Result<(), DataSourceError> {
        unsupported(Capability::Crud)
    }

    async fn create_many(&self, _rows: Vec<Self::Row>) -> Result<Vec<Self::Row>, DataSourceError> {
        unsupported(Capability::Batch)
    }

    async fn update_many(&self, _changes: Vec<(String, Self::Row)>) -> Result<Vec<Self::Row>, DataSourceError> {
        unsupported(Capability::Batch)
    }

    /// Deletes every listed id, returning how many rows were removed.
    async fn delete_many(&self, _ids: &[String]) -> Result<usize, DataSourceError> {
        unsupported(Capability::Batch)
    }
}
