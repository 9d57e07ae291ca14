//! Query types passed to a [`DataSource`](crate::source::DataSource).
//!
//! A [`DataSourceQuery`] is an immutable per-call value: pagination, sorting,
//! filters, free-text search, projection, relation includes, grouping,
//! aggregations and opaque custom parameters. Two queries are the same
//! query when they are structurally equal.

mod aggregate;
mod builder;
mod filter;
mod pagination;
mod sort;

pub use aggregate::AggregateFunction;
pub use aggregate::Aggregation;
pub use builder::DataSourceQuery;
pub use filter::QueryFilter;
pub use pagination::Pagination;
pub use sort::SortSpec;
