//! Operator/value shape contracts and type-to-operator mapping.

use regex::Regex;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use super::FilterOperator;
use super::compare::parse_date;
use super::operator::range_bounds;
use crate::error::ValidationResult;

/// Logical column type, used to offer applicable operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Date,
    Enum,
}

impl FieldType {
    /// Guesses a field type from a sample value.
    pub fn infer(value: &Value) -> FieldType {
        match value {
            Value::Number(_) => FieldType::Number,
            Value::Bool(_) => FieldType::Boolean,
            Value::String(_) if parse_date(value).is_some() => FieldType::Date,
            _ => FieldType::String,
        }
    }
}

/// Operators applicable to a field type.
pub fn operators_for_type(field_type: FieldType) -> &'static [FilterOperator] {
    use FilterOperator as Op;

    match field_type {
        FieldType::String => &[
            Op::Eq,
            Op::Neq,
            Op::Contains,
            Op::NotContains,
            Op::StartsWith,
            Op::EndsWith,
            Op::In,
            Op::NotIn,
            Op::Regex,
            Op::NotRegex,
            Op::IsNull,
            Op::IsNotNull,
        ],
        FieldType::Number => &[
            Op::Eq,
            Op::Neq,
            Op::Lt,
            Op::Lte,
            Op::Gt,
            Op::Gte,
            Op::Between,
            Op::NotBetween,
            Op::In,
            Op::NotIn,
            Op::IsNull,
            Op::IsNotNull,
        ],
        FieldType::Boolean => &[Op::Eq, Op::Neq, Op::IsNull, Op::IsNotNull],
        FieldType::Date => &[
            Op::Eq,
            Op::Neq,
            Op::Before,
            Op::After,
            Op::DateRange,
            Op::IsNull,
            Op::IsNotNull,
        ],
        FieldType::Enum => &[Op::Eq, Op::Neq, Op::In, Op::NotIn, Op::IsNull, Op::IsNotNull],
    }
}

/// Checks that `value` has the shape `operator` expects.
///
/// Never fails; returns `{valid: false, message}` for a bad shape.
pub fn validate_filter_value(operator: FilterOperator, value: &Value) -> ValidationResult {
    if !operator.requires_value() {
        return ValidationResult::ok();
    }

    if operator.is_range() {
        let Some((low, high)) = range_bounds(value) else {
            return ValidationResult::invalid(format!(
                "Operator '{}' requires an array of exactly two values",
                operator
            ));
        };
        if operator == FilterOperator::DateRange && (parse_date(low).is_none() || parse_date(high).is_none()) {
            return ValidationResult::invalid("Operator 'dateRange' requires two valid dates");
        }
        return ValidationResult::ok();
    }

    if operator.is_list() {
        return match value {
            Value::Array(_) => ValidationResult::ok(),
            _ => ValidationResult::invalid(format!("Operator '{}' requires an array of values", operator)),
        };
    }

    if value.is_null() {
        return ValidationResult::invalid(format!("Operator '{}' requires a value", operator));
    }

    match operator {
        FilterOperator::Regex | FilterOperator::NotRegex => match value.as_str().map(Regex::new) {
            Some(Ok(_)) => ValidationResult::ok(),
            Some(Err(e)) => ValidationResult::invalid(format!("Invalid regular expression: {}", e)),
            None => ValidationResult::invalid(format!("Operator '{}' requires a string pattern", operator)),
        },
        FilterOperator::Before | FilterOperator::After if parse_date(value).is_none() => {
            ValidationResult::invalid(format!("Operator '{}' requires a valid date", operator))
        }
        _ => ValidationResult::ok(),
    }
}
