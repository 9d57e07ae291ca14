//! Client-side filtering of JSON rows.
//!
//! [`FilterEngine`] evaluates per-field operators, nested AND/OR
//! [`AdvancedFilter`] trees and free-text search over rows held in memory.
//! Built-in operators can be extended or overridden per engine instance
//! with [`FilterEngine::register_filter`].
//!
//! An unknown operator name logs a warning and lets the row pass.

mod compare;
mod operator;
mod path;
mod tree;
mod validate;

pub use compare::*;
pub use operator::FilterOperator;
pub use operator::UnknownOperator;
pub use path::resolve_path;
pub use tree::AdvancedFilter;
pub use tree::Combinator;
pub use validate::FieldType;
pub use validate::operators_for_type;
pub use validate::validate_filter_value;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::warn;
use serde_json::Value;

use crate::error::ValidationResult;

/// A row as the filter engine sees it.
pub type Row = Value;

/// Predicate `(field_value, filter_value, row) -> bool`.
pub type FilterFn = Arc<dyn Fn(&Value, &Value, &Row) -> bool + Send + Sync>;

/// Evaluates filters over rows.
///
/// # Example
///
/// ```
/// use datatable_lib::filter::{FilterEngine, FilterOperator};
/// use serde_json::json;
///
/// let mut engine = FilterEngine::new();
/// engine.register_filter("even", |field, _, _| field.as_i64().is_some_and(|n| n % 2 == 0));
///
/// let row = json!({ "person": { "age": 42 } });
/// assert!(engine.apply_filter(&row, "person.age", "even", &json!(null)));
/// assert!(engine.apply_filter(&row, "person.age", "between", &json!([40, 50])));
/// ```
#[derive(Clone, Default)]
pub struct FilterEngine {
    custom: HashMap<String, FilterFn>,
}

impl FilterEngine {
    /// Creates an engine with only the built-in operators.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an operator. A later registration for the same name
    /// wins, including over a built-in.
    pub fn register_filter<F>(&mut self, name: impl Into<String>, predicate: F)
    where
        F: Fn(&Value, &Value, &Row) -> bool + Send + Sync + 'static,
    {
        self.custom.insert(name.into(), Arc::new(predicate));
    }

    /// Returns `true` if `name` is a registered or built-in operator.
    pub fn has_operator(&self, name: &str) -> bool {
        self.custom.contains_key(name) || name.parse::<FilterOperator>().is_ok()
    }

    /// All operator names known to this engine, sorted.
    pub fn operator_names(&self) -> Vec<String> {
        let mut names: Vec<String> = FilterOperator::ALL
            .iter()
            .map(|op| op.as_str().to_string())
            .chain(self.custom.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Tests one condition against a row. `field` may be a dot path.
    pub fn apply_filter(&self, row: &Row, field: &str, operator: &str, value: &Value) -> bool {
        let field_value = resolve_path(row, field).unwrap_or(&Value::Null);

        if let Some(predicate) = self.custom.get(operator) {
            return predicate(field_value, value, row);
        }

        match operator.parse::<FilterOperator>() {
            Ok(op) => op.evaluate(field_value, value),
            Err(_) => {
                warn!("unknown filter operator '{}' on field '{}', row passes", operator, field);
                true
            }
        }
    }

    /// Evaluates a filter tree against a row.
    pub fn apply_advanced_filter(&self, row: &Row, filter: &AdvancedFilter) -> bool {
        match filter {
            AdvancedFilter::Leaf {
                field,
                operator,
                value,
                ..
            } => self.apply_filter(row, field, operator, value),
            AdvancedFilter::Group {
                combinator,
                children,
                ..
            } => self.combine(row, children, *combinator),
        }
    }

    /// Returns `true` if `row` passes `filters` combined with `combinator`.
    ///
    /// An empty list passes every row.
    pub fn matches(&self, row: &Row, filters: &[AdvancedFilter], combinator: Combinator) -> bool {
        filters.is_empty() || self.combine(row, filters, combinator)
    }

    /// Keeps the rows passing the top-level list of trees.
    ///
    /// An empty filter list returns every row.
    pub fn apply_filters(&self, rows: &[Row], filters: &[AdvancedFilter], combinator: Combinator) -> Vec<Row> {
        rows.iter()
            .filter(|row| self.matches(row, filters, combinator))
            .cloned()
            .collect()
    }

    /// Keeps rows where any searched field contains `term`, ignoring case.
    ///
    /// With `fields` unset every top-level field is searched. An empty term
    /// returns every row.
    pub fn apply_global_filter(&self, rows: &[Row], term: &str, fields: Option<&[String]>) -> Vec<Row> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return rows.to_vec();
        }
        rows.iter()
            .filter(|row| row_contains(row, &term, fields))
            .cloned()
            .collect()
    }

    /// Validates `value` for an operator name.
    ///
    /// Registered operators accept any value; unknown names are invalid.
    pub fn validate(&self, operator: &str, value: &Value) -> ValidationResult {
        if self.custom.contains_key(operator) {
            return ValidationResult::ok();
        }
        match operator.parse::<FilterOperator>() {
            Ok(op) => validate_filter_value(op, value),
            Err(e) => ValidationResult::invalid(e.to_string()),
        }
    }

    fn combine(&self, row: &Row, children: &[AdvancedFilter], combinator: Combinator) -> bool {
        match combinator {
            Combinator::And => children.iter().all(|c| self.apply_advanced_filter(row, c)),
            Combinator::Or => children.iter().any(|c| self.apply_advanced_filter(row, c)),
        }
    }
}

/// Case-insensitive substring test; `term` must already be lowercase.
pub(crate) fn row_contains(row: &Row, term: &str, fields: Option<&[String]>) -> bool {
    let hit = |value: &Value| !value.is_null() && stringify(value).to_lowercase().contains(term);

    match fields {
        Some(fields) => fields
            .iter()
            .filter_map(|f| resolve_path(row, f))
            .any(hit),
        None => match row {
            Value::Object(map) => map.values().any(hit),
            other => hit(other),
        },
    }
}

impl fmt::Debug for FilterEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut custom: Vec<&String> = self.custom.keys().collect();
        custom.sort();
        f.debug_struct("FilterEngine").field("custom", &custom).finish()
    }
}
