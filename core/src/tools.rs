//! Helpers for working with service payloads.

use chrono::{DateTime, FixedOffset};
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::params::{ParamValue, ParameterMap};
use crate::types::Item;

/// Timestamp format used by the service, e.g. `2017-06-12T08:00:00:000-0600`.
/// Note the colon before the milliseconds.
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S:%3f%z";

pub fn parse_date(value: &str) -> Result<DateTime<FixedOffset>, ApiError> {
    DateTime::parse_from_str(value, DATE_FORMAT)
        .map_err(|e| ApiError::DeserializationError(format!("bad timestamp {value:?}: {e}")))
}

/// Flatten nested objects into `parent{sep}child` keys.
///
/// `{"name": "t", "project": {"ID": "p1"}}` becomes
/// `{"name": "t", "project:ID": "p1"}` with `sep = ":"`. Arrays are kept as
/// values.
pub fn flatten_record(record: &Item, sep: &str) -> Item {
    let mut out = Map::new();
    flatten_into(&mut out, record, "", sep);
    out
}

fn flatten_into(out: &mut Item, record: &Item, prefix: &str, sep: &str) {
    for (key, value) in record {
        let key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}{sep}{key}")
        };
        match value {
            Value::Object(nested) => flatten_into(out, nested, &key, sep),
            other => {
                out.insert(key, other.clone());
            }
        }
    }
}

/// `flatten_record` over a search result. Non-object rows pass through.
pub fn flatten_response(rows: &[Value], sep: &str) -> Vec<Value> {
    rows.iter()
        .map(|row| match row {
            Value::Object(record) => Value::Object(flatten_record(record, sep)),
            other => other.clone(),
        })
        .collect()
}

/// Convert a "text mode" filter, as copied from the web UI, into parameters.
///
/// One `key=value` per line; a tab-separated value is a list.
pub fn text_mode_params(text: &str) -> Result<ParameterMap, ApiError> {
    let mut params = ParameterMap::new();
    for line in text.lines().map(str::trim_end).filter(|l| !l.trim().is_empty()) {
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| ApiError::validation(format!("expected key=value, got {line:?}")))?;
        let value = if value.contains('\t') {
            ParamValue::List(value.split('\t').map(str::to_string).collect())
        } else {
            ParamValue::Scalar(value.to_string())
        };
        params.insert(key.trim(), value)?;
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_service_timestamps() {
        let date = parse_date("2017-06-12T08:30:15:250-0600").unwrap();
        assert_eq!(date.year(), 2017);
        assert_eq!(date.hour(), 8);
        assert_eq!(date.nanosecond(), 250_000_000);
        assert_eq!(date.offset().local_minus_utc(), -6 * 3600);
    }

    #[test]
    fn rejects_other_formats() {
        assert!(parse_date("2017-06-12").is_err());
    }

    #[test]
    fn flattens_nested_objects() {
        let row = json!({
            "ID": "t1",
            "name": "test task",
            "project": {"ID": "p1", "owner": {"name": "Ann"}},
            "tags": ["a", "b"]
        });
        let flat = flatten_record(row.as_object().unwrap(), ":");
        assert_eq!(
            Value::Object(flat),
            json!({
                "ID": "t1",
                "name": "test task",
                "project:ID": "p1",
                "project:owner:name": "Ann",
                "tags": ["a", "b"]
            })
        );
    }

    #[test]
    fn flatten_response_maps_rows() {
        let rows = vec![json!({"a": {"b": 1}}), json!(5)];
        assert_eq!(flatten_response(&rows, "."), vec![json!({"a.b": 1}), json!(5)]);
    }

    #[test]
    fn text_mode_lists_use_tabs() {
        let params = text_mode_params("status=CUR\tPLN\nstatus_Mod=in\n\nname=Launch").unwrap();
        assert_eq!(
            params.get("status"),
            Some(&ParamValue::List(vec!["CUR".into(), "PLN".into()]))
        );
        assert_eq!(params.get("status_Mod"), Some(&ParamValue::Scalar("in".into())));
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn text_mode_rejects_lines_without_equals() {
        assert!(matches!(text_mode_params("garbage"), Err(ApiError::Validation(_))));
        assert!(matches!(text_mode_params("=x"), Err(ApiError::Validation(_))));
    }
}
