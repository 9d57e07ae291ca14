//! Aggregation requests.

use serde::Deserialize;
use serde::Serialize;

/// Aggregate function applied over the filtered row set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunction {
    /// Lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "count",
            AggregateFunction::Sum => "sum",
            AggregateFunction::Avg => "avg",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
        }
    }
}

/// A requested aggregate over one field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Aggregation {
    pub field: String,
    pub function: AggregateFunction,
}

impl Aggregation {
    pub fn new(field: impl Into<String>, function: AggregateFunction) -> Self {
        Self {
            field: field.into(),
            function,
        }
    }

    /// Key under which the result is reported, e.g. `sum_revenue`.
    pub fn result_key(&self) -> String {
        format!("{}_{}", self.function.as_str(), self.field)
    }
}
