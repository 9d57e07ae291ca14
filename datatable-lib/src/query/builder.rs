//! The query value object and its fluent builder methods.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use super::Aggregation;
use super::Pagination;
use super::QueryFilter;
use super::SortSpec;
use crate::filter::AdvancedFilter;

/// Parameters for one fetch.
///
/// # Example
///
/// ```
/// use datatable_lib::query::{AggregateFunction, DataSourceQuery, QueryFilter};
///
/// let query = DataSourceQuery::new()
///     .page(0, 20)
///     .sort_desc("born")
///     .filter(QueryFilter::eq("dynasty", "Tang"))
///     .search("li")
///     .aggregate("age", AggregateFunction::Avg);
///
/// assert_eq!(query.pagination.unwrap().page_size, 20);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataSourceQuery {
    /// Page window. `None` means all rows.
    pub pagination: Option<Pagination>,
    /// Ordered sort keys.
    pub sorting: Vec<SortSpec>,
    /// Flat filters, all of which must pass.
    pub filters: Vec<QueryFilter>,
    /// Nested AND/OR filter tree, applied after `filters`.
    pub advanced_filter: Option<AdvancedFilter>,
    /// Free-text search across all fields.
    pub global_filter: Option<String>,
    /// Field projection. `None` returns whole rows.
    pub fields: Option<Vec<String>>,
    /// Relations the backend should include.
    pub include: Vec<String>,
    /// Fields to group aggregations by.
    pub group_by: Vec<String>,
    /// Aggregates to compute over the filtered set.
    pub aggregations: Vec<Aggregation>,
    /// Opaque backend-specific parameters.
    pub params: BTreeMap<String, Value>,
}

impl DataSourceQuery {
    /// Creates an empty query (first page of everything).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page window.
    pub fn page(mut self, page_index: usize, page_size: usize) -> Self {
        self.pagination = Some(Pagination::new(page_index, page_size));
        self
    }

    /// Sets or clears the page window.
    pub fn pagination(mut self, pagination: Option<Pagination>) -> Self {
        self.pagination = pagination;
        self
    }

    /// Adds an ascending sort key.
    pub fn sort_asc(mut self, field: impl Into<String>) -> Self {
        self.sorting.push(SortSpec::asc(field));
        self
    }

    /// Adds a descending sort key.
    pub fn sort_desc(mut self, field: impl Into<String>) -> Self {
        self.sorting.push(SortSpec::desc(field));
        self
    }

    /// Adds a flat filter.
    pub fn filter(mut self, filter: QueryFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Sets the advanced filter tree.
    pub fn advanced_filter(mut self, filter: AdvancedFilter) -> Self {
        self.advanced_filter = Some(filter);
        self
    }

    /// Sets the global search term.
    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.global_filter = Some(term.into());
        self
    }

    /// Restricts returned rows to the given fields.
    pub fn select(mut self, fields: &[&str]) -> Self {
        self.fields = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    /// Asks the backend to include a relation.
    pub fn include(mut self, relation: impl Into<String>) -> Self {
        self.include.push(relation.into());
        self
    }

    /// Adds a group-by field.
    pub fn group_by(mut self, field: impl Into<String>) -> Self {
        self.group_by.push(field.into());
        self
    }

    /// Requests an aggregate.
    pub fn aggregate(mut self, field: impl Into<String>, function: super::AggregateFunction) -> Self {
        self.aggregations.push(Aggregation::new(field, function));
        self
    }

    /// Sets a custom parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Returns a copy of this query with a different page window.
    pub fn with_page(&self, page_index: usize, page_size: usize) -> Self {
        let mut query = self.clone();
        query.pagination = Some(Pagination::new(page_index, page_size));
        query
    }

    /// Returns the trimmed search term, or `None` when it is empty.
    pub fn search_term(&self) -> Option<&str> {
        self.global_filter
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::AggregateFunction;

    #[test]
    fn test_builder_chains() {
        let query = DataSourceQuery::new()
            .page(1, 50)
            .sort_asc("name")
            .sort_desc("born")
            .include("offices")
            .group_by("dynasty")
            .aggregate("age", AggregateFunction::Max)
            .param("locale", "zh");

        assert_eq!(query.pagination, Some(Pagination::new(1, 50)));
        assert_eq!(query.sorting, vec![SortSpec::asc("name"), SortSpec::desc("born")]);
        assert_eq!(query.include, vec!["offices".to_string()]);
        assert_eq!(query.aggregations[0].result_key(), "max_age");
        assert_eq!(query.params["locale"], "zh");
    }

    #[test]
    fn test_deserialize_partial_query() {
        let query: DataSourceQuery = serde_json::from_str(
            r#"{"pagination":{"pageIndex":1,"pageSize":2},"filters":[{"field":"a","value":3}]}"#,
        )
        .unwrap();

        assert_eq!(query.pagination, Some(Pagination::new(1, 2)));
        assert_eq!(query.filters[0].operator, "eq");
        assert!(query.sorting.is_empty());
    }

    #[test]
    fn test_search_term_ignores_blank() {
        assert_eq!(DataSourceQuery::new().search("   ").search_term(), None);
        assert_eq!(DataSourceQuery::new().search(" wang ").search_term(), Some("wang"));
    }

    #[test]
    fn test_page_count() {
        let page = Pagination::new(0, 2);
        assert_eq!(page.page_count(5), 3);
        assert_eq!(page.page_count(0), 0);
        assert_eq!(Pagination::new(0, 0).page_count(5), 0);
    }
}
