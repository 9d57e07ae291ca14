//! Value coercion and comparison shared by operators and sorting.

use std::cmp::Ordering;

use chrono::DateTime;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::TimeZone;
use chrono::Utc;
use serde_json::Value;

/// Numeric view of a value. Numeric strings count as numbers.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Display form of a value used for text matching and CSV cells.
///
/// Null renders as the empty string; arrays and objects as compact JSON.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Parses a date from RFC 3339, `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS`, or
/// epoch milliseconds.
pub fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let millis = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            Utc.timestamp_millis_opt(millis).single()
        }
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
                if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
                    return Some(dt.and_utc());
                }
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
        }
        _ => None,
    }
}

/// Equality used by `eq`, `neq`, `in` and `notIn`.
///
/// Numbers compare numerically (a numeric string equals the same number),
/// strings compare case-insensitively, everything else structurally.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(x), Value::String(y)) => x.to_lowercase() == y.to_lowercase(),
        (Value::Number(_), _) | (_, Value::Number(_)) => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
        _ => a == b,
    }
}

/// Ordering used by the relational operators.
///
/// Returns `None` when either side is null or the pair is not comparable.
pub fn partial_compare(a: &Value, b: &Value) -> Option<Ordering> {
    if a.is_null() || b.is_null() {
        return None;
    }
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x.partial_cmp(&y);
    }
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.to_lowercase().cmp(&y.to_lowercase())),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Total ordering for sorting rows: nulls first, then booleans, numbers,
/// strings, arrays, objects.
pub fn sort_compare(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x
            .to_lowercase()
            .cmp(&y.to_lowercase())
            .then_with(|| x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
            a.to_string().cmp(&b.to_string())
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_loose_eq() {
        assert!(loose_eq(&json!("Wang"), &json!("wang")));
        assert!(loose_eq(&json!(5), &json!(5.0)));
        assert!(loose_eq(&json!("5"), &json!(5)));
        assert!(!loose_eq(&json!("x"), &json!(5)));
        assert!(loose_eq(&json!(null), &json!(null)));
        assert!(!loose_eq(&json!(true), &json!("true")));
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = Utc.with_ymd_and_hms(1021, 3, 4, 0, 0, 0).unwrap();
        assert_eq!(parse_date(&json!("1021-03-04")), Some(expected));
        assert_eq!(parse_date(&json!("1021-03-04T00:00:00Z")), Some(expected));
        assert_eq!(parse_date(&json!("1021-03-04 00:00:00")), Some(expected));
        assert_eq!(parse_date(&json!(0)), Some(Utc.timestamp_millis_opt(0).unwrap()));
        assert_eq!(parse_date(&json!("not a date")), None);
        assert_eq!(parse_date(&json!(true)), None);
    }

    #[test]
    fn test_sort_compare_nulls_first() {
        let mut values = vec![json!("b"), json!(null), json!(2), json!("A"), json!(1)];
        values.sort_by(sort_compare);
        assert_eq!(values, vec![json!(null), json!(1), json!(2), json!("A"), json!("b")]);
    }

    #[test]
    fn test_partial_compare() {
        assert_eq!(partial_compare(&json!(3), &json!("10")), Some(Ordering::Less));
        assert_eq!(partial_compare(&json!("apple"), &json!("Banana")), Some(Ordering::Less));
        assert_eq!(partial_compare(&json!(null), &json!(1)), None);
        assert_eq!(partial_compare(&json!([1]), &json!(1)), None);
    }

    #[test]
    fn test_stringify() {
        assert_eq!(stringify(&json!(null)), "");
        assert_eq!(stringify(&json!(1.5)), "1.5");
        assert_eq!(stringify(&json!({"a": 1})), r#"{"a":1}"#);
    }
}
