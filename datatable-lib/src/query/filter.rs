//! Flat per-field filter carried by a query.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::filter::FilterOperator;

/// A single `{field, value, operator}` condition.
///
/// The operator is kept as its wire name so that operators registered on a
/// [`FilterEngine`](crate::filter::FilterEngine) at runtime can be addressed
/// the same way as built-ins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryFilter {
    /// Field to test. Dot paths address nested fields.
    pub field: String,
    /// Operand; ignored by the null-check operators.
    #[serde(default)]
    pub value: Value,
    /// Operator name, e.g. `"eq"` or `"notContains"`.
    #[serde(default = "default_operator")]
    pub operator: String,
}

fn default_operator() -> String {
    FilterOperator::Eq.as_str().to_string()
}

impl QueryFilter {
    /// Creates a filter with a built-in operator.
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            operator: operator.as_str().to_string(),
        }
    }

    /// Creates a filter with an operator name, which may be a custom one.
    pub fn custom(field: impl Into<String>, operator: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            operator: operator.into(),
        }
    }

    /// Shorthand for an `eq` filter.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOperator::Eq, value)
    }
}
