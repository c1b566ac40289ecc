//! In-memory upstream backend.
//!
//! Implements [`HttpTransport`] over seeded collections so the whole gateway
//! can run without a network. Behaves like the real API where the gateway
//! cares: `page`/`per-page` slicing, exact-match filters, id assignment on
//! create, PATCH merge, 404s and JSON or XML bodies chosen by `Accept`.
//! Failures can be injected per request with [`FailureRule`].

use crate::domain::resources::ResourceFamily;
use crate::domain::types::HttpMethod;
use crate::gateway::codec;
use crate::ports::outbound::{HttpTransport, TransportError, TransportRequest, TransportResponse};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};

const DEFAULT_PER_PAGE: usize = 50;

/// Range filters matched against record dates instead of by equality
const RANGE_START: &str = "start_date";
const RANGE_END: &str = "end_date";

struct Collection {
    id_field: &'static str,
    records: BTreeMap<u64, Value>,
    next_id: u64,
}

impl Collection {
    fn new(id_field: &'static str) -> Self {
        Self {
            id_field,
            records: BTreeMap::new(),
            next_id: 1,
        }
    }

    fn insert(&mut self, mut record: Map<String, Value>) -> Value {
        let id = match record.get(self.id_field).and_then(as_u64) {
            Some(id) => id,
            None => self.next_id,
        };
        self.next_id = self.next_id.max(id + 1);
        record.insert(self.id_field.to_string(), json!(id));
        let record = Value::Object(record);
        self.records.insert(id, record.clone());
        record
    }
}

/// What an injected failure produces
#[derive(Debug, Clone)]
enum Failure {
    Status {
        status: u16,
        body: Value,
        retry_after: Option<u64>,
    },
    Transport(TransportError),
}

/// Injected failure, matched against each incoming request
#[derive(Debug, Clone)]
pub struct FailureRule {
    method: Option<HttpMethod>,
    path_contains: Option<String>,
    body_field: Option<(String, Value)>,
    remaining: Option<usize>,
    failure: Failure,
}

impl FailureRule {
    /// Answer matching requests with `status` and a JSON error body
    pub fn status(status: u16, body: Value) -> Self {
        Self {
            method: None,
            path_contains: None,
            body_field: None,
            remaining: None,
            failure: Failure::Status {
                status,
                body,
                retry_after: None,
            },
        }
    }

    /// Fail matching requests before any status is produced
    pub fn transport(error: TransportError) -> Self {
        Self {
            failure: Failure::Transport(error),
            ..Self::status(0, Value::Null)
        }
    }

    pub fn on_method(mut self, method: HttpMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn on_path(mut self, fragment: impl Into<String>) -> Self {
        self.path_contains = Some(fragment.into());
        self
    }

    /// Only match requests whose JSON body has `field == value`
    pub fn on_body_field(mut self, field: impl Into<String>, value: Value) -> Self {
        self.body_field = Some((field.into(), value));
        self
    }

    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        if let Failure::Status { retry_after, .. } = &mut self.failure {
            *retry_after = Some(seconds);
        }
        self
    }

    /// Stop matching after `n` hits
    pub fn times(mut self, n: usize) -> Self {
        self.remaining = Some(n);
        self
    }

    fn matches(&self, request: &TransportRequest, path: &str, body: Option<&Value>) -> bool {
        if self.remaining == Some(0) {
            return false;
        }
        if self.method.is_some_and(|m| m != request.method) {
            return false;
        }
        if let Some(fragment) = &self.path_contains {
            if !path.contains(fragment.as_str()) {
                return false;
            }
        }
        if let Some((field, expected)) = &self.body_field {
            if body.and_then(|b| b.get(field)) != Some(expected) {
                return false;
            }
        }
        true
    }
}

#[derive(Default)]
struct State {
    collections: HashMap<String, Collection>,
    rules: Vec<FailureRule>,
    log: Vec<TransportRequest>,
}

/// Upstream API simulated in process memory
pub struct InMemoryBackend {
    state: Mutex<State>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    /// Backend with one empty collection per resource family
    pub fn new() -> Self {
        let mut state = State::default();
        for family in ResourceFamily::ALL {
            let spec = family.spec();
            state
                .collections
                .insert(spec.path.to_string(), Collection::new(spec.id_field));
        }
        Self {
            state: Mutex::new(state),
        }
    }

    /// Add records to a family's collection; records without an id get one
    pub fn seed(&self, family: ResourceFamily, records: impl IntoIterator<Item = Value>) -> &Self {
        let spec = family.spec();
        let mut state = self.state.lock();
        if let Some(collection) = state.collections.get_mut(spec.path) {
            for record in records {
                if let Value::Object(record) = record {
                    collection.insert(record);
                }
            }
        }
        self
    }

    pub fn add_failure(&self, rule: FailureRule) -> &Self {
        self.state.lock().rules.push(rule);
        self
    }

    pub fn clear_failures(&self) {
        self.state.lock().rules.clear();
    }

    /// Every request received, in arrival order
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.state.lock().log.clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().log.len()
    }

    /// Current contents of a family's collection, ordered by id
    pub fn records(&self, family: ResourceFamily) -> Vec<Value> {
        self.state
            .lock()
            .collections
            .get(family.spec().path)
            .map(|c| c.records.values().cloned().collect())
            .unwrap_or_default()
    }

    fn handle(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let path = url_path(&request.url).to_string();
        let wants_xml = request
            .header("accept")
            .is_some_and(|accept| accept.contains("xml"));
        let body: Option<Value> = request
            .body
            .as_deref()
            .and_then(|bytes| serde_json::from_slice(bytes).ok());

        let mut state = self.state.lock();
        state.log.push(request.clone());

        let hit = state
            .rules
            .iter_mut()
            .find(|rule| rule.matches(&request, &path, body.as_ref()));
        if let Some(rule) = hit {
            if let Some(remaining) = rule.remaining.as_mut() {
                *remaining -= 1;
            }
            return match rule.failure.clone() {
                Failure::Transport(error) => Err(error),
                Failure::Status {
                    status,
                    body,
                    retry_after,
                } => {
                    let response = render(status, &body, wants_xml, "error");
                    Ok(match retry_after {
                        Some(seconds) => response.with_header("Retry-After", seconds.to_string()),
                        None => response,
                    })
                }
            };
        }

        let Some((collection_path, id)) = locate(&state.collections, &path) else {
            return Ok(render(404, &json!({"message": "unknown endpoint"}), wants_xml, "error"));
        };
        let Some(collection) = state.collections.get_mut(&collection_path) else {
            return Ok(render(404, &json!({"message": "unknown endpoint"}), wants_xml, "error"));
        };

        let (status, payload) = match (request.method, id) {
            (HttpMethod::Get, None) => (200, list(collection, &request.query)),
            (HttpMethod::Get, Some(id)) => match collection.records.get(&id) {
                Some(record) => (200, record.clone()),
                None => not_found(&collection_path, id),
            },
            (HttpMethod::Post, None) => match body {
                Some(Value::Object(record)) => (201, collection.insert(record)),
                _ => (422, json!({"message": "request body must be a JSON object"})),
            },
            (HttpMethod::Patch, Some(id)) | (HttpMethod::Put, Some(id)) => {
                let id_field = collection.id_field;
                match (collection.records.get_mut(&id), body) {
                    (None, _) => not_found(&collection_path, id),
                    (Some(record), Some(Value::Object(changes))) => {
                        if request.method == HttpMethod::Put {
                            *record = json!({ id_field: id });
                        }
                        if let Value::Object(fields) = record {
                            for (key, value) in changes {
                                if key != id_field {
                                    fields.insert(key, value);
                                }
                            }
                        }
                        (200, record.clone())
                    }
                    (Some(_), _) => (422, json!({"message": "request body must be a JSON object"})),
                }
            }
            (HttpMethod::Delete, Some(id)) => match collection.records.remove(&id) {
                Some(_) => return Ok(TransportResponse::new(204, "")),
                None => not_found(&collection_path, id),
            },
            _ => (405, json!({"message": "method not allowed"})),
        };

        Ok(render(status, &payload, wants_xml, "response"))
    }
}

#[async_trait]
impl HttpTransport for InMemoryBackend {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        self.handle(request)
    }
}

fn not_found(path: &str, id: u64) -> (u16, Value) {
    (404, json!({"message": format!("{}/{} not found", path, id)}))
}

fn render(status: u16, payload: &Value, xml: bool, root: &str) -> TransportResponse {
    let body = if xml {
        codec::encode_xml(root, payload)
    } else {
        payload.to_string()
    };
    let content_type = if xml {
        "application/xml"
    } else {
        "application/json"
    };
    TransportResponse::new(status, body).with_header("Content-Type", content_type)
}

/// Path portion of an absolute URL
fn url_path(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    rest.find('/').map_or("/", |i| &rest[i..])
}

/// Resolve a URL path to a collection and optional record id.
///
/// Matches on trailing segments so any base path prefix is accepted.
fn locate(collections: &HashMap<String, Collection>, path: &str) -> Option<(String, Option<u64>)> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let (last, rest) = segments.split_last()?;

    if let Ok(id) = last.parse::<u64>() {
        let name = format!("/{}", rest.last()?);
        return collections.contains_key(&name).then_some((name, Some(id)));
    }
    let name = format!("/{}", last);
    collections.contains_key(&name).then_some((name, None))
}

fn list(collection: &Collection, query: &[(String, String)]) -> Value {
    let param = |name: &str| {
        query
            .iter()
            .find(|(k, _)| k == name)
            .and_then(|(_, v)| v.parse::<usize>().ok())
    };
    let page = param("page").unwrap_or(1).max(1);
    let per_page = param("per-page").unwrap_or(DEFAULT_PER_PAGE).max(1);

    let filters: Vec<&(String, String)> = query
        .iter()
        .filter(|(k, _)| k != "page" && k != "per-page")
        .collect();

    let matching: Vec<Value> = collection
        .records
        .values()
        .filter(|record| filters.iter().all(|(k, v)| matches_filter(record, k, v)))
        .skip((page - 1) * per_page)
        .take(per_page)
        .cloned()
        .collect();
    Value::Array(matching)
}

fn matches_filter(record: &Value, key: &str, expected: &str) -> bool {
    match key {
        RANGE_START => record_date(record, &["end_date", "date", "start_date"])
            .map_or(true, |date| date.as_str() >= expected),
        RANGE_END => record_date(record, &["start_date", "date"])
            .map_or(true, |date| date.as_str() <= expected),
        _ => record
            .get(key)
            .and_then(filter_text)
            .is_some_and(|actual| actual == expected),
    }
}

fn record_date(record: &Value, fields: &[&str]) -> Option<String> {
    fields
        .iter()
        .find_map(|field| record.get(*field).and_then(Value::as_str))
        .map(str::to_string)
}

/// Record field rendered the way query strings render values
fn filter_text(value: &Value) -> Option<String> {
    match value {
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
