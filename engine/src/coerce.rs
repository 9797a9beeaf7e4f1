//! Field-level coercions used by the normalizer.
//!
//! Each helper takes whatever JSON happens to sit in a field (possibly
//! missing) and returns a well-typed value or `None`. None of them fail.

use crate::clock::{format_timestamp, parse_timestamp};
use chrono::{DateTime, NaiveDate, NaiveTime};
use serde_json::Value;

/// A finite number, also accepting numeric strings such as `"1200"`.
pub fn number(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok()?
        }
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// A finite number that is zero or greater.
pub fn non_negative(value: Option<&Value>) -> Option<f64> {
    number(value).filter(|n| *n >= 0.0)
}

/// A finite number strictly greater than zero.
pub fn positive(value: Option<&Value>) -> Option<f64> {
    number(value).filter(|n| *n > 0.0)
}

/// `true` only for a JSON `true` or the string `"true"`.
pub fn flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// A trimmed, non-empty string.
pub fn text(value: Option<&Value>) -> Option<String> {
    let trimmed = value?.as_str()?.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// A calendar date from `YYYY-MM-DD` or a `YYYY-MM-DDT...` timestamp,
/// falling back to `today`.
pub fn date(value: Option<&Value>, today: NaiveDate) -> NaiveDate {
    value
        .and_then(Value::as_str)
        .and_then(calendar_date)
        .unwrap_or(today)
}

/// Parse the `YYYY-MM-DD` head of a date or timestamp string.
pub fn calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let head = raw.get(..10)?;
    let rest = &raw[10..];
    if !(rest.is_empty() || rest.starts_with('T')) {
        return None;
    }
    let bytes = head.as_bytes();
    if bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// An ISO-8601 timestamp. Valid strings are kept verbatim; epoch
/// milliseconds are converted.
pub fn timestamp(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => parse_timestamp(s).map(|_| s.trim().to_string()),
        Value::Number(n) => {
            let millis = n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| f as i64)
            })?;
            DateTime::from_timestamp_millis(millis).map(format_timestamp)
        }
        _ => None,
    }
}

/// A wall-clock time normalized to zero-padded `HH:MM`.
pub fn clock_time(value: Option<&Value>) -> Option<String> {
    let raw = value?.as_str()?.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .ok()
        .map(|t| t.format("%H:%M").to_string())
}

/// A list of trimmed, non-empty strings from either an array or a
/// comma-separated string.
pub fn string_list(value: Option<&Value>) -> Vec<String> {
    let items: Vec<&str> = match value {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        Some(Value::String(s)) => s.split(',').collect(),
        _ => Vec::new(),
    };
    items
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()
    }

    #[test]
    fn number_coercion() {
        assert_eq!(number(Some(&json!(12))), Some(12.0));
        assert_eq!(number(Some(&json!(80.5))), Some(80.5));
        assert_eq!(number(Some(&json!(" 1200 "))), Some(1200.0));
        assert_eq!(number(Some(&json!("NaN"))), None);
        assert_eq!(number(Some(&json!("inf"))), None);
        assert_eq!(number(Some(&json!("abc"))), None);
        assert_eq!(number(Some(&json!(""))), None);
        assert_eq!(number(Some(&json!(true))), None);
        assert_eq!(number(Some(&Value::Null)), None);
        assert_eq!(number(None), None);
    }

    #[test]
    fn sign_filters() {
        assert_eq!(non_negative(Some(&json!(0))), Some(0.0));
        assert_eq!(non_negative(Some(&json!(-1))), None);
        assert_eq!(positive(Some(&json!(0))), None);
        assert_eq!(positive(Some(&json!(3))), Some(3.0));
    }

    #[test]
    fn flag_coercion() {
        assert!(flag(Some(&json!(true))));
        assert!(flag(Some(&json!("TRUE"))));
        assert!(!flag(Some(&json!(1))));
        assert!(!flag(Some(&json!("yes"))));
        assert!(!flag(None));
    }

    #[test]
    fn date_coercion() {
        let expected = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        assert_eq!(date(Some(&json!("2026-02-01")), today()), expected);
        assert_eq!(
            date(Some(&json!("2026-02-01T14:00:00.000Z")), today()),
            expected
        );
        assert_eq!(date(Some(&json!("2026-02-01 14:00")), today()), today());
        assert_eq!(date(Some(&json!("2026-13-40")), today()), today());
        assert_eq!(date(Some(&json!("01/02/2026")), today()), today());
        assert_eq!(date(Some(&json!("2026-2-1")), today()), today());
        assert_eq!(date(Some(&json!(20260201)), today()), today());
        assert_eq!(date(Some(&json!("日本語テキストです")), today()), today());
        assert_eq!(date(None, today()), today());
    }

    #[test]
    fn timestamp_coercion() {
        assert_eq!(
            timestamp(Some(&json!("2026-02-01T14:00:00.000Z"))).as_deref(),
            Some("2026-02-01T14:00:00.000Z")
        );
        assert_eq!(
            timestamp(Some(&json!(1_769_954_400_000_i64))).as_deref(),
            Some("2026-02-01T14:00:00.000Z")
        );
        assert_eq!(timestamp(Some(&json!("2026-02-01"))), None);
        assert_eq!(timestamp(Some(&json!(null))), None);
    }

    #[test]
    fn clock_time_coercion() {
        assert_eq!(clock_time(Some(&json!("12:00"))).as_deref(), Some("12:00"));
        assert_eq!(clock_time(Some(&json!("9:30"))).as_deref(), Some("09:30"));
        assert_eq!(clock_time(Some(&json!("24:00"))), None);
        assert_eq!(clock_time(Some(&json!("12:60"))), None);
        assert_eq!(clock_time(Some(&json!("noon"))), None);
        assert_eq!(clock_time(Some(&json!(1200))), None);
    }

    #[test]
    fn string_list_coercion() {
        assert_eq!(
            string_list(Some(&json!("push, pull,,legs "))),
            vec!["push", "pull", "legs"]
        );
        assert_eq!(
            string_list(Some(&json!(["a", 1, " b ", ""]))),
            vec!["a", "b"]
        );
        assert!(string_list(Some(&json!({"a": 1}))).is_empty());
    }
}
