//! A data source over JSON rows held in memory.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use async_trait::async_trait;
use log::debug;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use tokio::sync::RwLock;
use tokio::sync::broadcast;

use super::Capabilities;
use super::ChangeEvent;
use super::ColumnInfo;
use super::DataSource;
use crate::error::DataSourceError;
use crate::error::ValidationResult;
use crate::export::ExportFormat;
use crate::export::ExportOutput;
use crate::filter::FieldType;
use crate::filter::FilterEngine;
use crate::filter::FilterOperator;
use crate::filter::as_number;
use crate::filter::operators_for_type;
use crate::filter::partial_compare;
use crate::filter::resolve_path;
use crate::filter::row_contains;
use crate::filter::sort_compare;
use crate::filter::stringify;
use crate::query::AggregateFunction;
use crate::query::Aggregation;
use crate::query::DataSourceQuery;
use crate::query::SortSpec;
use crate::response::DataSourceResponse;

const EVENT_CAPACITY: usize = 64;

/// Serves, filters, sorts and edits JSON object rows in memory.
///
/// # Example
///
/// ```
/// use datatable_lib::query::{DataSourceQuery, QueryFilter};
/// use datatable_lib::source::{DataSource, InMemoryDataSource};
/// use serde_json::json;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let source = InMemoryDataSource::new(vec![
///     json!({"id": 1, "name": "Ada", "age": 36}),
///     json!({"id": 2, "name": "Grace", "age": 85}),
/// ]);
///
/// let page = source
///     .fetch(&DataSourceQuery::new().filter(QueryFilter::eq("name", "grace")))
///     .await
///     .unwrap();
/// assert_eq!(page.total, 1);
/// # }
/// ```
#[derive(Debug)]
pub struct InMemoryDataSource {
    rows: RwLock<Vec<Value>>,
    id_field: String,
    columns: Option<Vec<ColumnInfo>>,
    search_fields: Option<Vec<String>>,
    engine: FilterEngine,
    events: broadcast::Sender<ChangeEvent<Value>>,
}

impl InMemoryDataSource {
    /// Creates a source over `rows`, identified by their `"id"` field.
    pub fn new(rows: Vec<Value>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            rows: RwLock::new(rows),
            id_field: "id".to_string(),
            columns: None,
            search_fields: None,
            engine: FilterEngine::new(),
            events,
        }
    }

    /// Sets the field used to identify rows for CRUD.
    pub fn with_id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }

    /// Declares columns instead of inferring them from the first row.
    pub fn with_columns(mut self, columns: Vec<ColumnInfo>) -> Self {
        self.columns = Some(columns);
        self
    }

    /// Restricts the global search to these fields.
    pub fn with_search_fields(mut self, fields: Vec<String>) -> Self {
        self.search_fields = Some(fields);
        self
    }

    /// Uses an engine carrying custom operators.
    pub fn with_filter_engine(mut self, engine: FilterEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Field used to identify rows.
    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    /// Snapshot of all rows.
    pub async fn rows(&self) -> Vec<Value> {
        self.rows.read().await.clone()
    }

    /// Number of rows held.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    /// Returns `true` if no rows are held.
    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// Replaces every row. No change events are sent.
    pub async fn replace_all(&self, rows: Vec<Value>) {
        *self.rows.write().await = rows;
    }

    fn row_id(&self, row: &Value) -> Option<String> {
        row.get(&self.id_field)
            .filter(|id| !id.is_null())
            .map(stringify)
    }

    fn position(&self, rows: &[Value], id: &str) -> Option<usize> {
        rows.iter()
            .position(|row| self.row_id(row).as_deref() == Some(id))
    }

    /// Copies every key of `changes` except the id field into `row`.
    fn merge(&self, row: &mut Value, changes: Map<String, Value>) {
        if let Value::Object(target) = row {
            for (key, value) in changes {
                if key != self.id_field {
                    target.insert(key, value);
                }
            }
        }
    }

    fn notify(&self, event: ChangeEvent<Value>) {
        // No receivers is not an error.
        let _ = self.events.send(event);
    }

    /// Applies flat filters, the advanced tree and the global search.
    fn filter_rows(&self, rows: &[Value], query: &DataSourceQuery) -> Vec<Value> {
        let term = query.search_term().map(str::to_lowercase);

        rows.iter()
            .filter(|row| {
                query
                    .filters
                    .iter()
                    .all(|f| self.engine.apply_filter(row, &f.field, &f.operator, &f.value))
            })
            .filter(|row| {
                query
                    .advanced_filter
                    .as_ref()
                    .is_none_or(|tree| self.engine.apply_advanced_filter(row, tree))
            })
            .filter(|row| {
                term.as_deref()
                    .is_none_or(|t| row_contains(row, t, self.search_fields.as_deref()))
            })
            .cloned()
            .collect()
    }

    /// Filtered and sorted rows, before pagination.
    fn matching_rows(&self, rows: &[Value], query: &DataSourceQuery) -> Vec<Value> {
        let mut matched = self.filter_rows(rows, query);
        sort_rows(&mut matched, &query.sorting);
        matched
    }

    fn validate_condition(&self, field: &str, operator: &str, value: &Value) -> ValidationResult {
        if field.is_empty() {
            return ValidationResult::invalid("Filter field must not be empty");
        }
        let result = self.engine.validate(operator, value);
        match result.message {
            Some(message) if !result.valid => ValidationResult::invalid(format!("Filter on '{}': {}", field, message)),
            _ => ValidationResult::ok(),
        }
    }

    /// Assigns an id if missing and rejects non-objects.
    fn prepare_new(&self, mut row: Value) -> Result<(String, Value), DataSourceError> {
        let Value::Object(map) = &mut row else {
            return Err(DataSourceError::InvalidQuery("Rows must be JSON objects".to_string()));
        };
        let id = match map.get(&self.id_field).filter(|v| !v.is_null()) {
            Some(id) => stringify(id),
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                map.insert(self.id_field.clone(), Value::String(id.clone()));
                id
            }
        };
        Ok((id, row))
    }

    fn conflict(id: &str) -> DataSourceError {
        DataSourceError::http(409, format!("Row '{}' already exists", id)).with_code("conflict")
    }
}

/// Stable multi-key sort. Nulls and missing fields come first in either
/// direction.
fn sort_rows(rows: &mut [Value], sorting: &[SortSpec]) {
    if sorting.is_empty() {
        return;
    }
    rows.sort_by(|a, b| {
        sorting
            .iter()
            .map(|spec| {
                let left = resolve_path(a, &spec.field).unwrap_or(&Value::Null);
                let right = resolve_path(b, &spec.field).unwrap_or(&Value::Null);
                match (left.is_null(), right.is_null()) {
                    (true, true) => Ordering::Equal,
                    (true, false) => Ordering::Less,
                    (false, true) => Ordering::Greater,
                    (false, false) if spec.desc => sort_compare(right, left),
                    (false, false) => sort_compare(left, right),
                }
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    });
}

/// Computes one aggregate over `rows`. Non-numeric values are ignored by
/// `sum`/`avg`; nulls are ignored by every function.
fn aggregate(rows: &[&Value], aggregation: &Aggregation) -> Value {
    let values: Vec<&Value> = rows
        .iter()
        .filter_map(|row| resolve_path(row, &aggregation.field))
        .filter(|v| !v.is_null())
        .collect();
    let numbers = || values.iter().filter_map(|v| as_number(v));

    match aggregation.function {
        AggregateFunction::Count => json!(values.len()),
        AggregateFunction::Sum => json!(numbers().sum::<f64>()),
        AggregateFunction::Avg => {
            let (sum, n) = numbers().fold((0.0, 0usize), |(s, n), x| (s + x, n + 1));
            if n == 0 { Value::Null } else { json!(sum / n as f64) }
        }
        AggregateFunction::Min => extreme(&values, Ordering::Less),
        AggregateFunction::Max => extreme(&values, Ordering::Greater),
    }
}

fn extreme(values: &[&Value], wanted: Ordering) -> Value {
    values
        .iter()
        .copied()
        .reduce(|best, v| {
            if partial_compare(v, best) == Some(wanted) { v } else { best }
        })
        .cloned()
        .unwrap_or(Value::Null)
}

/// Aggregates over all matching rows, plus a `groups` array when grouped.
fn compute_aggregations(rows: &[Value], query: &DataSourceQuery) -> Option<BTreeMap<String, Value>> {
    if query.aggregations.is_empty() {
        return None;
    }

    let all: Vec<&Value> = rows.iter().collect();
    let mut result: BTreeMap<String, Value> = query
        .aggregations
        .iter()
        .map(|agg| (agg.result_key(), aggregate(&all, agg)))
        .collect();

    if !query.group_by.is_empty() {
        // Groups keep first-appearance order.
        let mut groups: Vec<(Vec<Value>, Vec<&Value>)> = Vec::new();
        for row in rows {
            let key: Vec<Value> = query
                .group_by
                .iter()
                .map(|field| resolve_path(row, field).cloned().unwrap_or(Value::Null))
                .collect();
            match groups.iter_mut().find(|(k, _)| *k == key) {
                Some((_, members)) => members.push(row),
                None => groups.push((key, vec![row])),
            }
        }

        let groups: Vec<Value> = groups
            .into_iter()
            .map(|(key, members)| {
                let mut entry = Map::new();
                for (field, value) in query.group_by.iter().zip(key) {
                    entry.insert(field.clone(), value);
                }
                for agg in &query.aggregations {
                    entry.insert(agg.result_key(), aggregate(&members, agg));
                }
                Value::Object(entry)
            })
            .collect();
        result.insert("groups".to_string(), Value::Array(groups));
    }

    Some(result)
}

/// Keeps only `fields` (dot paths allowed) in each row.
fn project(row: Value, fields: Option<&[String]>) -> Value {
    let Some(fields) = fields else {
        return row;
    };
    let projected: Map<String, Value> = fields
        .iter()
        .filter_map(|field| resolve_path(&row, field).map(|v| (field.clone(), v.clone())))
        .collect();
    Value::Object(projected)
}

#[async_trait]
impl DataSource for InMemoryDataSource {
    type Row = Value;

    async fn fetch(&self, query: &DataSourceQuery) -> Result<DataSourceResponse<Value>, DataSourceError> {
        let rows = self.rows.read().await;
        let matched = self.matching_rows(&rows, query);
        drop(rows);

        let total = matched.len();
        let aggregations = compute_aggregations(&matched, query);
        let fields = query.fields.as_deref();

        let page: Vec<Value> = match query.pagination {
            Some(p) => matched
                .into_iter()
                .skip(p.offset())
                .take(p.page_size)
                .map(|row| project(row, fields))
                .collect(),
            None => matched.into_iter().map(|row| project(row, fields)).collect(),
        };
        debug!("in-memory fetch matched {} rows, returning {}", total, page.len());

        let response = DataSourceResponse::paginated(page, total, query.pagination);
        Ok(match aggregations {
            Some(aggs) => response.with_aggregations(aggs),
            None => response,
        })
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            count: true,
            export: true,
            columns: true,
            filter_operators: true,
            validate_query: true,
            transform: false,
            subscribe: true,
            crud: true,
            batch: true,
        }
    }

    async fn count(&self, query: &DataSourceQuery) -> Result<usize, DataSourceError> {
        let rows = self.rows.read().await;
        Ok(self.filter_rows(&rows, query).len())
    }

    async fn export(&self, query: &DataSourceQuery, format: ExportFormat) -> Result<ExportOutput, DataSourceError> {
        let rows = self.rows.read().await;
        let fields = query.fields.as_deref();
        let matched: Vec<Value> = self
            .matching_rows(&rows, query)
            .into_iter()
            .map(|row| project(row, fields))
            .collect();
        ExportOutput::from_rows(&matched, format)
    }

    async fn columns(&self) -> Result<Vec<ColumnInfo>, DataSourceError> {
        if let Some(columns) = &self.columns {
            return Ok(columns.clone());
        }
        let rows = self.rows.read().await;
        let columns = match rows.first() {
            Some(Value::Object(map)) => map
                .iter()
                .map(|(field, value)| ColumnInfo::new(field.clone(), FieldType::infer(value)))
                .collect(),
            _ => Vec::new(),
        };
        Ok(columns)
    }

    async fn filter_operators(&self, field: &str) -> Result<Vec<FilterOperator>, DataSourceError> {
        let declared = self
            .columns
            .as_ref()
            .and_then(|cols| cols.iter().find(|c| c.field == field))
            .map(|c| c.field_type);

        let field_type = match declared {
            Some(ft) => ft,
            None => {
                let rows = self.rows.read().await;
                rows.iter()
                    .filter_map(|row| resolve_path(row, field))
                    .find(|v| !v.is_null())
                    .map(FieldType::infer)
                    .unwrap_or(FieldType::String)
            }
        };
        Ok(operators_for_type(field_type).to_vec())
    }

    fn validate_query(&self, query: &DataSourceQuery) -> Result<ValidationResult, DataSourceError> {
        if query.pagination.is_some_and(|p| p.page_size == 0) {
            return Ok(ValidationResult::invalid("Page size must be greater than zero"));
        }
        if query.sorting.iter().any(|s| s.field.is_empty()) {
            return Ok(ValidationResult::invalid("Sort field must not be empty"));
        }

        let flat = query
            .filters
            .iter()
            .map(|f| (f.field.as_str(), f.operator.as_str(), &f.value));
        let tree = query
            .advanced_filter
            .iter()
            .flat_map(|tree| tree.leaves());

        for (field, operator, value) in flat.chain(tree) {
            let result = self.validate_condition(field, operator, value);
            if !result.valid {
                return Ok(result);
            }
        }
        Ok(ValidationResult::ok())
    }

    fn subscribe(&self) -> Result<broadcast::Receiver<ChangeEvent<Value>>, DataSourceError> {
        Ok(self.events.subscribe())
    }

    async fn create(&self, row: Value) -> Result<Value, DataSourceError> {
        let (id, row) = self.prepare_new(row)?;
        let mut rows = self.rows.write().await;
        if self.position(&rows, &id).is_some() {
            return Err(Self::conflict(&id));
        }
        rows.push(row.clone());
        drop(rows);

        self.notify(ChangeEvent::Created(row.clone()));
        Ok(row)
    }

    /// Merges the keys of `changes` into the row. The id field is kept.
    async fn update(&self, id: &str, changes: Value) -> Result<Value, DataSourceError> {
        let Value::Object(changes) = changes else {
            return Err(DataSourceError::InvalidQuery("Changes must be a JSON object".to_string()));
        };
        let mut rows = self.rows.write().await;
        let index = self
            .position(&rows, id)
            .ok_or_else(|| DataSourceError::NotFound(id.to_string()))?;

        self.merge(&mut rows[index], changes);
        let row = rows[index].clone();
        drop(rows);

        self.notify(ChangeEvent::Updated {
            id: id.to_string(),
            row: row.clone(),
        });
        Ok(row)
    }

    async fn delete(&self, id: &str) -> Result<(), DataSourceError> {
        let mut rows = self.rows.write().await;
        let index = self
            .position(&rows, id)
            .ok_or_else(|| DataSourceError::NotFound(id.to_string()))?;
        rows.remove(index);
        drop(rows);

        self.notify(ChangeEvent::Deleted { id: id.to_string() });
        Ok(())
    }

    /// Inserts every row or none of them.
    async fn create_many(&self, new_rows: Vec<Value>) -> Result<Vec<Value>, DataSourceError> {
        let prepared = new_rows
            .into_iter()
            .map(|row| self.prepare_new(row))
            .collect::<Result<Vec<_>, _>>()?;

        let mut rows = self.rows.write().await;
        for (i, (id, _)) in prepared.iter().enumerate() {
            let repeated = prepared[..i].iter().any(|(other, _)| other == id);
            if repeated || self.position(&rows, id).is_some() {
                return Err(Self::conflict(id));
            }
        }
        let created: Vec<Value> = prepared.into_iter().map(|(_, row)| row).collect();
        rows.extend(created.iter().cloned());
        drop(rows);

        for row in &created {
            self.notify(ChangeEvent::Created(row.clone()));
        }
        Ok(created)
    }

    /// Applies every change or none of them.
    async fn update_many(&self, changes: Vec<(String, Value)>) -> Result<Vec<Value>, DataSourceError> {
        let mut rows = self.rows.write().await;

        let mut resolved = Vec::with_capacity(changes.len());
        for (id, change) in changes {
            let index = self
                .position(&rows, &id)
                .ok_or_else(|| DataSourceError::NotFound(id.clone()))?;
            let Value::Object(change) = change else {
                return Err(DataSourceError::InvalidQuery("Changes must be a JSON object".to_string()));
            };
            resolved.push((id, index, change));
        }

        let mut updated = Vec::with_capacity(resolved.len());
        for (id, index, change) in resolved {
            self.merge(&mut rows[index], change);
            updated.push((id, rows[index].clone()));
        }
        drop(rows);

        for (id, row) in &updated {
            self.notify(ChangeEvent::Updated {
                id: id.clone(),
                row: row.clone(),
            });
        }
        Ok(updated.into_iter().map(|(_, row)| row).collect())
    }

    /// Deletes the listed rows that exist; unknown ids are skipped.
    async fn delete_many(&self, ids: &[String]) -> Result<usize, DataSourceError> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        let mut removed = Vec::new();
        rows.retain(|row| match self.row_id(row) {
            Some(id) if ids.contains(&id) => {
                removed.push(id);
                false
            }
            _ => true,
        });
        let count = before - rows.len();
        drop(rows);

        for id in removed {
            self.notify(ChangeEvent::Deleted { id });
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::AdvancedFilter;
    use crate::query::QueryFilter;

    fn people() -> Vec<Value> {
        vec![
            json!({"id": 1, "name": "Ada", "team": "core", "age": 36}),
            json!({"id": 2, "name": "Grace", "team": "infra", "age": 85}),
            json!({"id": 3, "name": "Linus", "team": "core", "age": null}),
            json!({"id": 4, "name": "Barbara", "team": "infra", "age": 61}),
            json!({"id": 5, "name": "Ken", "team": "core", "age": 80}),
        ]
    }

    fn ids(rows: &[Value]) -> Vec<i64> {
        rows.iter().filter_map(|r| r["id"].as_i64()).collect()
    }

    #[tokio::test]
    async fn test_first_page_by_name() {
        let source = InMemoryDataSource::new(people());
        let query = DataSourceQuery::new().page(0, 2).sort_asc("name");

        let response = source.fetch(&query).await.unwrap();
        assert_eq!(ids(&response.data), vec![1, 4]);
        assert_eq!(response.total, 5);
        assert_eq!(response.page_count, Some(3));
        assert_eq!(response.has_next_page, Some(true));
        assert_eq!(response.has_prev_page, Some(false));
    }

    #[tokio::test]
    async fn test_last_page_flags() {
        let source = InMemoryDataSource::new(people());
        let response = source.fetch(&DataSourceQuery::new().page(2, 2)).await.unwrap();
        assert_eq!(ids(&response.data), vec![5]);
        assert_eq!(response.has_next_page, Some(false));
        assert_eq!(response.has_prev_page, Some(true));
    }

    #[tokio::test]
    async fn test_sort_nulls_first_both_directions() {
        let source = InMemoryDataSource::new(people());

        let asc = source.fetch(&DataSourceQuery::new().sort_asc("age")).await.unwrap();
        assert_eq!(ids(&asc.data), vec![3, 1, 4, 5, 2]);

        let desc = source.fetch(&DataSourceQuery::new().sort_desc("age")).await.unwrap();
        assert_eq!(ids(&desc.data), vec![3, 2, 5, 4, 1]);
    }

    #[tokio::test]
    async fn test_multi_key_sort_is_stable() {
        let source = InMemoryDataSource::new(people());
        let query = DataSourceQuery::new().sort_asc("team").sort_desc("age");
        let response = source.fetch(&query).await.unwrap();
        assert_eq!(ids(&response.data), vec![3, 5, 1, 2, 4]);
    }

    #[tokio::test]
    async fn test_filters_tree_and_search_combine() {
        let source = InMemoryDataSource::new(people());
        let query = DataSourceQuery::new()
            .filter(QueryFilter::eq("team", "core"))
            .advanced_filter(AdvancedFilter::or([
                AdvancedFilter::leaf("age", FilterOperator::Gt, 50),
                AdvancedFilter::leaf("age", FilterOperator::IsNull, Value::Null),
            ]))
            .search("li");

        let response = source.fetch(&query).await.unwrap();
        assert_eq!(ids(&response.data), vec![3]);
        assert_eq!(source.count(&query).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_search_fields_restrict() {
        let source = InMemoryDataSource::new(people()).with_search_fields(vec!["team".to_string()]);
        let response = source.fetch(&DataSourceQuery::new().search("ada")).await.unwrap();
        assert!(response.data.is_empty());
    }

    #[tokio::test]
    async fn test_projection() {
        let source = InMemoryDataSource::new(people());
        let query = DataSourceQuery::new().page(0, 1).select(&["name"]);
        let response = source.fetch(&query).await.unwrap();
        assert_eq!(response.data, vec![json!({"name": "Ada"})]);
    }

    #[tokio::test]
    async fn test_aggregations_grouped() {
        let source = InMemoryDataSource::new(people());
        let query = DataSourceQuery::new()
            .page(0, 1)
            .group_by("team")
            .aggregate("age", AggregateFunction::Max)
            .aggregate("age", AggregateFunction::Count);

        let response = source.fetch(&query).await.unwrap();
        let aggs = response.aggregations.unwrap();
        assert_eq!(aggs["max_age"], json!(85));
        assert_eq!(aggs["count_age"], json!(4));
        assert_eq!(
            aggs["groups"],
            json!([
                {"team": "core", "max_age": 80, "count_age": 2},
                {"team": "infra", "max_age": 85, "count_age": 2},
            ])
        );
    }

    #[tokio::test]
    async fn test_sum_and_avg() {
        let source = InMemoryDataSource::new(people());
        let query = DataSourceQuery::new()
            .filter(QueryFilter::eq("team", "infra"))
            .aggregate("age", AggregateFunction::Sum)
            .aggregate("age", AggregateFunction::Avg);
        let aggs = source.fetch(&query).await.unwrap().aggregations.unwrap();
        assert_eq!(aggs["sum_age"], json!(146.0));
        assert_eq!(aggs["avg_age"], json!(73.0));
    }

    #[tokio::test]
    async fn test_columns_inferred() {
        let source = InMemoryDataSource::new(vec![json!({"name": "x", "age": 3, "born": "2020-01-02"})]);
        let columns = source.columns().await.unwrap();
        let types: Vec<(&str, FieldType)> = columns.iter().map(|c| (c.field.as_str(), c.field_type)).collect();
        assert_eq!(
            types,
            vec![("name", FieldType::String), ("age", FieldType::Number), ("born", FieldType::Date)]
        );
    }

    #[tokio::test]
    async fn test_filter_operators_by_type() {
        let source = InMemoryDataSource::new(people());
        let ops = source.filter_operators("age").await.unwrap();
        assert!(ops.contains(&FilterOperator::Between));
        assert!(!ops.contains(&FilterOperator::Contains));
    }

    #[test]
    fn test_validate_query() {
        let source = InMemoryDataSource::new(vec![]);

        let ok = DataSourceQuery::new().filter(QueryFilter::new("age", FilterOperator::Between, json!([1, 2])));
        assert!(source.validate_query(&ok).unwrap().valid);

        let bad = DataSourceQuery::new().filter(QueryFilter::new("age", FilterOperator::Between, json!([1])));
        let result = source.validate_query(&bad).unwrap();
        assert!(!result.valid);
        assert!(result.message.unwrap().starts_with("Filter on 'age'"));

        let unknown = DataSourceQuery::new().advanced_filter(AdvancedFilter::and([AdvancedFilter::custom_leaf(
            "age", "roughly", 3,
        )]));
        assert!(!source.validate_query(&unknown).unwrap().valid);

        let zero = DataSourceQuery::new().page(0, 0);
        assert!(!source.validate_query(&zero).unwrap().valid);
    }

    #[tokio::test]
    async fn test_crud_and_events() {
        let source = InMemoryDataSource::new(people());
        let mut events = source.subscribe().unwrap();

        let created = source.create(json!({"name": "Margaret"})).await.unwrap();
        let id = created["id"].as_str().unwrap().to_string();
        assert_eq!(source.len().await, 6);
        assert!(matches!(events.recv().await.unwrap(), ChangeEvent::Created(_)));

        let updated = source.update(&id, json!({"age": 70, "id": "other"})).await.unwrap();
        assert_eq!(updated["age"], json!(70));
        assert_eq!(updated["id"], json!(id));

        source.delete(&id).await.unwrap();
        assert!(matches!(source.delete(&id).await, Err(DataSourceError::NotFound(_))));
        assert_eq!(source.len().await, 5);
    }

    #[tokio::test]
    async fn test_create_duplicate_conflicts() {
        let source = InMemoryDataSource::new(people());
        let err = source.create(json!({"id": 1})).await.unwrap_err();
        assert_eq!(err.status_code(), Some(409));
    }

    #[tokio::test]
    async fn test_batch_is_all_or_nothing() {
        let source = InMemoryDataSource::new(people());

        let err = source
            .create_many(vec![json!({"id": 10}), json!({"id": 10})])
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(409));
        assert_eq!(source.len().await, 5);

        let err = source
            .update_many(vec![("1".to_string(), json!({"age": 1})), ("99".to_string(), json!({}))])
            .await
            .unwrap_err();
        assert!(matches!(err, DataSourceError::NotFound(id) if id == "99"));
        assert_eq!(source.rows().await[0]["age"], json!(36));

        let removed = source
            .delete_many(&["1".to_string(), "2".to_string(), "99".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, 2);
    }

    #[tokio::test]
    async fn test_update_many_rejects_whole_batch() {
        let source = InMemoryDataSource::new(people());
        let mut events = source.subscribe().unwrap();

        let err = source
            .update_many(vec![("1".to_string(), json!({"age": 1})), ("2".to_string(), json!("oops"))])
            .await
            .unwrap_err();
        assert!(matches!(err, DataSourceError::InvalidQuery(_)));
        assert_eq!(source.rows().await[0]["age"], json!(36));
        assert!(events.try_recv().is_err());

        let updated = source
            .update_many(vec![("1".to_string(), json!({"age": 1})), ("2".to_string(), json!({"age": 2}))])
            .await
            .unwrap();
        assert_eq!(updated.len(), 2);
        assert!(matches!(events.try_recv(), Ok(ChangeEvent::Updated { id, .. }) if id == "1"));
        assert!(matches!(events.try_recv(), Ok(ChangeEvent::Updated { id, .. }) if id == "2"));
    }

    #[tokio::test]
    async fn test_update_many_races_delete_atomically() {
        let source = std::sync::Arc::new(InMemoryDataSource::new(people()));

        let deleter = {
            let source = source.clone();
            tokio::spawn(async move { source.delete("2").await })
        };
        let result = source
            .update_many(vec![("1".to_string(), json!({"age": 1})), ("2".to_string(), json!({"age": 2}))])
            .await;
        deleter.await.unwrap().unwrap();

        let rows = source.rows().await;
        let ada = rows.iter().find(|r| r["id"] == json!(1)).unwrap();
        match result {
            Ok(updated) => {
                assert_eq!(updated.len(), 2);
                assert_eq!(ada["age"], json!(1));
            }
            Err(DataSourceError::NotFound(id)) => {
                assert_eq!(id, "2");
                assert_eq!(ada["age"], json!(36));
            }
            Err(other) => panic!("unexpected {:?}", other),
        }
    }
}
