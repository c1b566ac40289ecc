//! Core value types shared by the gateway and the router.

use crate::domain::error::{GatewayError, GatewayResult};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// HTTP method of an upstream call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Whether callers may safely repeat the call
    pub fn is_idempotent(&self) -> bool {
        matches!(self, HttpMethod::Get | HttpMethod::Put | HttpMethod::Delete)
    }

    /// Whether the payload travels in the body rather than the query string
    pub fn has_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response encoding requested from upstream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Json,
    Xml,
}

impl ResponseFormat {
    /// Parse a caller-supplied format name.
    ///
    /// `csv` is accepted and served as JSON; the upstream has no CSV encoding.
    pub fn parse_lenient(raw: &str) -> GatewayResult<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "json" => Ok(ResponseFormat::Json),
            "xml" => Ok(ResponseFormat::Xml),
            "csv" => {
                tracing::debug!("csv format requested, serving json");
                Ok(ResponseFormat::Json)
            }
            other => Err(GatewayError::validation(format!(
                "unsupported format '{}', expected json, xml or csv",
                other
            ))),
        }
    }

    /// Value for the `Accept` header
    pub fn accept_header(&self) -> &'static str {
        match self {
            ResponseFormat::Json => "application/json",
            ResponseFormat::Xml => "application/xml",
        }
    }
}

/// Shape check applied to a successful upstream payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputValidator {
    /// A single object carrying the given identifier field
    Record { id_field: &'static str },
    /// An array whose elements are all objects
    RecordList,
}

impl OutputValidator {
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        match self {
            OutputValidator::Record { id_field } => {
                let object = value
                    .as_object()
                    .ok_or_else(|| format!("expected an object, got {}", type_name(value)))?;
                if object.contains_key(*id_field) {
                    Ok(())
                } else {
                    Err(format!("record is missing '{}'", id_field))
                }
            }
            OutputValidator::RecordList => {
                let items = value
                    .as_array()
                    .ok_or_else(|| format!("expected an array, got {}", type_name(value)))?;
                match items.iter().position(|item| !item.is_object()) {
                    Some(index) => Err(format!("list item {} is not an object", index)),
                    None => Ok(()),
                }
            }
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// One logical upstream call. Built once, never mutated after `execute`.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    method: HttpMethod,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
    validator: Option<OutputValidator>,
    format: ResponseFormat,
}

impl RequestDescriptor {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            validator: None,
            format: ResponseFormat::Json,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(HttpMethod::Post, path).with_body(body)
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self::new(HttpMethod::Patch, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_validator(mut self, validator: OutputValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn with_format(mut self, format: ResponseFormat) -> Self {
        self.format = format;
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn validator(&self) -> Option<OutputValidator> {
        self.validator
    }

    pub fn format(&self) -> ResponseFormat {
        self.format
    }
}

/// Caller-supplied list filters plus optional page overrides.
///
/// Passing both `page` and `per-page` asks for exactly that page; omitting
/// `page` asks for the whole collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(
        default,
        rename = "per-page",
        alias = "per_page",
        skip_serializing_if = "Option::is_none"
    )]
    pub per_page: Option<u32>,
    #[serde(flatten)]
    pub filters: Map<String, Value>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a server-side filter
    pub fn filter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    pub fn page(mut self, page: u32, per_page: u32) -> Self {
        self.page = Some(page);
        self.per_page = Some(per_page);
        self
    }

    /// True when the caller pinned one specific page
    pub fn is_single_page(&self) -> bool {
        self.page.is_some() && self.per_page.is_some()
    }

    /// Filters rendered as query pairs, in key order.
    ///
    /// Booleans become `1`/`0`, arrays are comma-joined and nulls are dropped.
    pub fn filter_pairs(&self) -> Vec<(String, String)> {
        self.filters
            .iter()
            .filter_map(|(key, value)| query_value(value).map(|v| (key.clone(), v)))
            .collect()
    }
}

fn query_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(query_value)
                .collect::<Vec<_>>()
                .join(","),
        ),
        Value::Object(_) => Some(value.to_string()),
    }
}

/// Outcome of one item inside a bulk run
#[derive(Debug, Clone, PartialEq)]
pub struct BulkItemResult<T> {
    /// Position of the item in the caller's input
    pub index: usize,
    pub result: Result<T, GatewayError>,
}

impl<T> BulkItemResult<T> {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

impl<T: Serialize> Serialize for BulkItemResult<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("BulkItemResult", 3)?;
        state.serialize_field("index", &self.index)?;
        state.serialize_field("success", &self.is_success())?;
        match &self.result {
            Ok(value) => state.serialize_field("value", value)?,
            Err(error) => state.serialize_field("error", error)?,
        }
        state.end()
    }
}

/// Aggregate counts of a bulk run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkSummary {
    pub total: usize,
    pub success_count: usize,
    pub failure_count: usize,
}

/// Per-item ledger of a bulk run, in input order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkOutcome<T> {
    pub results: Vec<BulkItemResult<T>>,
    pub summary: BulkSummary,
}

impl<T> BulkOutcome<T> {
    /// Build the outcome; counts are derived from the results.
    pub fn from_results(results: Vec<BulkItemResult<T>>) -> Self {
        let success_count = results.iter().filter(|r| r.is_success()).count();
        let summary = BulkSummary {
            total: results.len(),
            success_count,
            failure_count: results.len() - success_count,
        };
        Self { results, summary }
    }

    pub fn failures(&self) -> impl Iterator<Item = &BulkItemResult<T>> {
        self.results.iter().filter(|r| !r.is_success())
    }

    pub fn all_succeeded(&self) -> bool {
        self.summary.failure_count == 0
    }
}
