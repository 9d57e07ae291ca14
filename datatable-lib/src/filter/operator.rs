//! Built-in filter operators.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use log::warn;
use regex::RegexBuilder;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use super::compare::loose_eq;
use super::compare::parse_date;
use super::compare::partial_compare;
use super::compare::stringify;

/// The built-in operator set.
///
/// String operators are case-insensitive. Range operators are inclusive on
/// both bounds and require a two-element array operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    In,
    NotIn,
    Between,
    NotBetween,
    IsNull,
    IsNotNull,
    Regex,
    NotRegex,
    Before,
    After,
    DateRange,
}

impl FilterOperator {
    /// Every built-in operator.
    pub const ALL: [FilterOperator; 21] = [
        FilterOperator::Eq,
        FilterOperator::Neq,
        FilterOperator::Lt,
        FilterOperator::Lte,
        FilterOperator::Gt,
        FilterOperator::Gte,
        FilterOperator::Contains,
        FilterOperator::NotContains,
        FilterOperator::StartsWith,
        FilterOperator::EndsWith,
        FilterOperator::In,
        FilterOperator::NotIn,
        FilterOperator::Between,
        FilterOperator::NotBetween,
        FilterOperator::IsNull,
        FilterOperator::IsNotNull,
        FilterOperator::Regex,
        FilterOperator::NotRegex,
        FilterOperator::Before,
        FilterOperator::After,
        FilterOperator::DateRange,
    ];

    /// Wire name, e.g. `"notContains"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Neq => "neq",
            FilterOperator::Lt => "lt",
            FilterOperator::Lte => "lte",
            FilterOperator::Gt => "gt",
            FilterOperator::Gte => "gte",
            FilterOperator::Contains => "contains",
            FilterOperator::NotContains => "notContains",
            FilterOperator::StartsWith => "startsWith",
            FilterOperator::EndsWith => "endsWith",
            FilterOperator::In => "in",
            FilterOperator::NotIn => "notIn",
            FilterOperator::Between => "between",
            FilterOperator::NotBetween => "notBetween",
            FilterOperator::IsNull => "isNull",
            FilterOperator::IsNotNull => "isNotNull",
            FilterOperator::Regex => "regex",
            FilterOperator::NotRegex => "notRegex",
            FilterOperator::Before => "before",
            FilterOperator::After => "after",
            FilterOperator::DateRange => "dateRange",
        }
    }

    /// Returns `false` for the null checks, which ignore their operand.
    pub fn requires_value(&self) -> bool {
        !matches!(self, FilterOperator::IsNull | FilterOperator::IsNotNull)
    }

    /// Operators taking a `[low, high]` operand.
    pub fn is_range(&self) -> bool {
        matches!(
            self,
            FilterOperator::Between | FilterOperator::NotBetween | FilterOperator::DateRange
        )
    }

    /// Operators taking an array operand of any length.
    pub fn is_list(&self) -> bool {
        matches!(self, FilterOperator::In | FilterOperator::NotIn)
    }

    /// Evaluates the operator against a resolved field value.
    pub fn evaluate(&self, field: &Value, operand: &Value) -> bool {
        match self {
            FilterOperator::Eq => loose_eq(field, operand),
            FilterOperator::Neq => !loose_eq(field, operand),
            FilterOperator::Lt => compare_is(field, operand, |o| o == Ordering::Less),
            FilterOperator::Lte => compare_is(field, operand, |o| o != Ordering::Greater),
            FilterOperator::Gt => compare_is(field, operand, |o| o == Ordering::Greater),
            FilterOperator::Gte => compare_is(field, operand, |o| o != Ordering::Less),
            FilterOperator::Contains => text_test(field, operand, |f, v| f.contains(v)),
            FilterOperator::NotContains => {
                field.is_null() || !text_test(field, operand, |f, v| f.contains(v))
            }
            FilterOperator::StartsWith => text_test(field, operand, |f, v| f.starts_with(v)),
            FilterOperator::EndsWith => text_test(field, operand, |f, v| f.ends_with(v)),
            FilterOperator::In => match operand {
                Value::Array(items) => items.iter().any(|item| loose_eq(field, item)),
                _ => false,
            },
            FilterOperator::NotIn => match operand {
                Value::Array(items) => !items.iter().any(|item| loose_eq(field, item)),
                _ => true,
            },
            FilterOperator::Between => in_range(field, operand).unwrap_or(false),
            FilterOperator::NotBetween => in_range(field, operand).is_some_and(|inside| !inside),
            FilterOperator::IsNull => field.is_null(),
            FilterOperator::IsNotNull => !field.is_null(),
            FilterOperator::Regex => regex_match(field, operand).unwrap_or(false),
            FilterOperator::NotRegex => regex_match(field, operand).is_some_and(|m| !m),
            FilterOperator::Before => match (parse_date(field), parse_date(operand)) {
                (Some(f), Some(v)) => f < v,
                _ => false,
            },
            FilterOperator::After => match (parse_date(field), parse_date(operand)) {
                (Some(f), Some(v)) => f > v,
                _ => false,
            },
            FilterOperator::DateRange => date_in_range(field, operand),
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown operator name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown filter operator '{0}'")]
pub struct UnknownOperator(pub String);

impl FromStr for FilterOperator {
    type Err = UnknownOperator;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterOperator::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| UnknownOperator(s.to_string()))
    }
}

fn compare_is(field: &Value, operand: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    partial_compare(field, operand).is_some_and(accept)
}

fn text_test(field: &Value, operand: &Value, test: impl Fn(&str, &str) -> bool) -> bool {
    if field.is_null() {
        return false;
    }
    let haystack = stringify(field).to_lowercase();
    let needle = stringify(operand).to_lowercase();
    test(&haystack, &needle)
}

/// Splits a `[low, high]` operand. Any other shape yields `None`.
pub(crate) fn range_bounds(operand: &Value) -> Option<(&Value, &Value)> {
    match operand {
        Value::Array(items) if items.len() == 2 => Some((&items[0], &items[1])),
        _ => None,
    }
}

/// `Some(inside)` when the operand is well-formed and the field comparable.
fn in_range(field: &Value, operand: &Value) -> Option<bool> {
    let (low, high) = range_bounds(operand)?;
    let above = partial_compare(field, low)? != Ordering::Less;
    let below = partial_compare(field, high)? != Ordering::Greater;
    Some(above && below)
}

fn date_in_range(field: &Value, operand: &Value) -> bool {
    let Some((low, high)) = range_bounds(operand) else {
        return false;
    };
    match (parse_date(field), parse_date(low), parse_date(high)) {
        (Some(f), Some(l), Some(h)) => f >= l && f <= h,
        _ => false,
    }
}

/// `Some(matched)` when the pattern compiles, `None` otherwise.
fn regex_match(field: &Value, operand: &Value) -> Option<bool> {
    let pattern = operand.as_str()?;
    match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(re) => Some(re.is_match(&stringify(field))),
        Err(e) => {
            warn!("invalid regex pattern '{}': {}", pattern, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn eval(op: FilterOperator, field: Value, operand: Value) -> bool {
        op.evaluate(&field, &operand)
    }

    #[test]
    fn test_names_round_trip() {
        for op in FilterOperator::ALL {
            assert_eq!(op.as_str().parse::<FilterOperator>(), Ok(op));
            assert_eq!(serde_json::to_value(op).unwrap(), json!(op.as_str()));
        }
        assert!("like".parse::<FilterOperator>().is_err());
    }

    #[test]
    fn test_between_is_inclusive() {
        assert!(eval(FilterOperator::Between, json!(5), json!([5, 10])));
        assert!(eval(FilterOperator::Between, json!(10), json!([5, 10])));
        assert!(!eval(FilterOperator::Between, json!(11), json!([5, 10])));
        assert!(!eval(FilterOperator::Between, json!(4), json!([5, 10])));
    }

    #[test]
    fn test_not_between() {
        assert!(!eval(FilterOperator::NotBetween, json!(5), json!([5, 10])));
        assert!(!eval(FilterOperator::NotBetween, json!(10), json!([5, 10])));
        assert!(eval(FilterOperator::NotBetween, json!(11), json!([5, 10])));
        assert!(!eval(FilterOperator::NotBetween, json!(11), json!([5])));
    }

    #[test]
    fn test_range_requires_two_elements() {
        assert!(!eval(FilterOperator::Between, json!(5), json!([5])));
        assert!(!eval(FilterOperator::Between, json!(5), json!([1, 5, 10])));
        assert!(!eval(FilterOperator::Between, json!(5), json!(5)));
    }

    #[test]
    fn test_relational_boundaries() {
        assert!(eval(FilterOperator::Lt, json!(4), json!(5)));
        assert!(!eval(FilterOperator::Lt, json!(5), json!(5)));
        assert!(eval(FilterOperator::Lte, json!(5), json!(5)));
        assert!(!eval(FilterOperator::Lte, json!(6), json!(5)));
        assert!(eval(FilterOperator::Gt, json!(6), json!(5)));
        assert!(!eval(FilterOperator::Gt, json!(5), json!(5)));
        assert!(eval(FilterOperator::Gte, json!(5), json!(5)));
        assert!(!eval(FilterOperator::Gte, json!(4), json!(5)));
        assert!(!eval(FilterOperator::Gt, json!(null), json!(5)));
    }

    #[test]
    fn test_string_operators_ignore_case() {
        assert!(eval(FilterOperator::Contains, json!("Su Shi"), json!("SHI")));
        assert!(!eval(FilterOperator::Contains, json!(null), json!("a")));
        assert!(eval(FilterOperator::NotContains, json!("Su Shi"), json!("wang")));
        assert!(!eval(FilterOperator::NotContains, json!("Su Shi"), json!("su")));
        assert!(eval(FilterOperator::NotContains, json!(null), json!("a")));
        assert!(eval(FilterOperator::StartsWith, json!("Ouyang Xiu"), json!("ouyang")));
        assert!(!eval(FilterOperator::StartsWith, json!("Ouyang Xiu"), json!("xiu")));
        assert!(eval(FilterOperator::EndsWith, json!("Ouyang Xiu"), json!("XIU")));
        assert!(eval(FilterOperator::Eq, json!("Song"), json!("song")));
        assert!(eval(FilterOperator::Neq, json!("Song"), json!("tang")));
    }

    #[test]
    fn test_membership() {
        assert!(eval(FilterOperator::In, json!("b"), json!(["a", "B"])));
        assert!(!eval(FilterOperator::In, json!("c"), json!(["a", "b"])));
        assert!(!eval(FilterOperator::In, json!("a"), json!("a")));
        assert!(eval(FilterOperator::NotIn, json!("c"), json!(["a", "b"])));
        assert!(!eval(FilterOperator::NotIn, json!(2), json!([1, 2])));
    }

    #[test]
    fn test_null_checks() {
        assert!(eval(FilterOperator::IsNull, json!(null), json!(null)));
        assert!(!eval(FilterOperator::IsNull, json!(""), json!(null)));
        assert!(eval(FilterOperator::IsNotNull, json!(0), json!(null)));
        assert!(!eval(FilterOperator::IsNotNull, json!(null), json!("ignored")));
    }

    #[test]
    fn test_regex() {
        assert!(eval(FilterOperator::Regex, json!("Wang Anshi"), json!("^wang")));
        assert!(!eval(FilterOperator::Regex, json!("Wang Anshi"), json!("^an")));
        assert!(eval(FilterOperator::NotRegex, json!("Wang Anshi"), json!("^an")));
        assert!(!eval(FilterOperator::Regex, json!("x"), json!("(")));
        assert!(!eval(FilterOperator::NotRegex, json!("x"), json!("(")));
    }

    #[test]
    fn test_dates() {
        assert!(eval(FilterOperator::Before, json!("1037-01-08"), json!("1101-08-24")));
        assert!(!eval(FilterOperator::Before, json!("1101-08-24"), json!("1101-08-24")));
        assert!(eval(FilterOperator::After, json!("1101-08-25"), json!("1101-08-24")));
        assert!(!eval(FilterOperator::After, json!("garbage"), json!("1101-08-24")));
        assert!(eval(
            FilterOperator::DateRange,
            json!("1037-01-08"),
            json!(["1037-01-08", "1101-08-24"])
        ));
        assert!(eval(
            FilterOperator::DateRange,
            json!("1101-08-24T00:00:00Z"),
            json!(["1037-01-08", "1101-08-24"])
        ));
        assert!(!eval(
            FilterOperator::DateRange,
            json!("1101-08-25"),
            json!(["1037-01-08", "1101-08-24"])
        ));
        assert!(!eval(FilterOperator::DateRange, json!("1050-01-01"), json!(["1037-01-08"])));
    }
}
