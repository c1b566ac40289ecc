//! Record helpers for composite operations.
//!
//! XML responses carry every scalar as a string, so numeric and boolean
//! reads accept both encodings.

use crate::domain::error::{GatewayError, GatewayResult};
use crate::domain::types::BulkOutcome;
use serde_json::Value;
use std::cmp::Ordering;

pub fn field_u64(record: &Value, field: &str) -> Option<u64> {
    match record.get(field)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn field_f64(record: &Value, field: &str) -> Option<f64> {
    match record.get(field)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// `true`, non-zero numbers and `"1"`/`"true"` strings
pub fn is_truthy(record: &Value, field: &str) -> bool {
    match record.get(field) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => matches!(s.trim(), "1" | "true" | "TRUE" | "True"),
        _ => false,
    }
}

/// Whether a record's `tags` contain `tag`.
///
/// Tags may be plain strings or objects with a `name`; XML lists of tags
/// arrive wrapped as `{"item": ...}`.
pub fn has_tag(record: &Value, tag: &str) -> bool {
    let Some(tags) = record.get("tags") else {
        return false;
    };
    let tags: Vec<&Value> = match tags {
        Value::Array(items) => items.iter().collect(),
        Value::Object(wrapper) => match wrapper.get("item") {
            Some(Value::Array(items)) => items.iter().collect(),
            Some(item) => vec![item],
            None => vec![tags],
        },
        other => vec![other],
    };
    tags.into_iter().any(|t| match t {
        Value::String(name) => name.eq_ignore_ascii_case(tag),
        Value::Object(object) => object
            .get("name")
            .and_then(Value::as_str)
            .is_some_and(|name| name.eq_ignore_ascii_case(tag)),
        _ => false,
    })
}

/// First date-like string among `fields`
pub fn date_of<'a>(record: &'a Value, fields: &[&str]) -> Option<&'a str> {
    fields
        .iter()
        .find_map(|field| record.get(*field).and_then(Value::as_str))
}

/// Stable ascending sort on the first present date field; undated records last
pub fn sort_by_date(records: &mut [Value], fields: &[&str]) {
    records.sort_by(|a, b| match (date_of(a, fields), date_of(b, fields)) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

pub fn bulk_value(outcome: &BulkOutcome<Value>) -> GatewayResult<Value> {
    serde_json::to_value(outcome)
        .map_err(|e| GatewayError::validation(format!("cannot encode bulk outcome: {}", e)))
}
