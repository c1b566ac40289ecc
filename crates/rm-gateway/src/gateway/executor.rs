//! Request executor: one admitted upstream call per descriptor.

use crate::domain::config::ApiConfig;
use crate::domain::error::{GatewayError, GatewayResult};
use crate::domain::types::{OutputValidator, RequestDescriptor, ResponseFormat};
use crate::gateway::admission::AdmissionQueue;
use crate::gateway::codec;
use crate::gateway::metrics::GatewayMetrics;
use crate::ports::outbound::{HttpTransport, TransportRequest, TransportResponse};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Issues descriptors against the upstream API
pub struct RequestExecutor {
    transport: Arc<dyn HttpTransport>,
    admission: Arc<AdmissionQueue>,
    metrics: Arc<GatewayMetrics>,
    base_url: String,
    token: String,
    user_agent: String,
}

impl RequestExecutor {
    pub fn new(
        api: &ApiConfig,
        transport: Arc<dyn HttpTransport>,
        admission: Arc<AdmissionQueue>,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self {
            transport,
            admission,
            metrics,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            token: api.token.clone(),
            user_agent: api.user_agent.clone(),
        }
    }

    pub fn admission(&self) -> &Arc<AdmissionQueue> {
        &self.admission
    }

    /// Execute one request. Nothing is sent before admission is granted.
    pub async fn execute(&self, request: &RequestDescriptor) -> GatewayResult<Value> {
        let queued = Instant::now();
        if let Err(e) = self.admission.admit().await {
            self.metrics.record_request(Err(e.kind()), queued.elapsed());
            return Err(e);
        }

        let wire = self.build(request)?;
        let started = Instant::now();

        let result = match self.transport.send(wire).await {
            Ok(response) => self.interpret(request, response, started),
            Err(e) => {
                warn!(
                    method = %request.method(),
                    path = request.path(),
                    error = %e,
                    "Upstream transport failure"
                );
                Err(GatewayError::transport(e.to_string()))
            }
        };

        self.metrics.record_request(
            result.as_ref().map(|_| ()).map_err(GatewayError::kind),
            started.elapsed(),
        );
        result
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn build(&self, request: &RequestDescriptor) -> GatewayResult<TransportRequest> {
        let mut headers = vec![
            (
                "Accept".to_string(),
                request.format().accept_header().to_string(),
            ),
            ("User-Agent".to_string(), self.user_agent.clone()),
        ];
        if !self.token.is_empty() {
            headers.push(("Authorization".to_string(), format!("Bearer {}", self.token)));
        }

        let body = match request.body() {
            Some(body) => {
                headers.push(("Content-Type".to_string(), "application/json".to_string()));
                Some(serde_json::to_vec(body)?)
            }
            None => None,
        };

        Ok(TransportRequest {
            method: request.method(),
            url: self.url(request.path()),
            query: request.query().to_vec(),
            headers,
            body,
        })
    }

    fn interpret(
        &self,
        request: &RequestDescriptor,
        response: TransportResponse,
        started: Instant,
    ) -> GatewayResult<Value> {
        let path = request.path();
        let format = request.format();
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if !response.is_success() {
            let body = decode_error_body(format, &response.body);
            let retry_after = response.header("retry-after").and_then(parse_retry_after);
            warn!(
                method = %request.method(),
                path,
                status = response.status,
                elapsed_ms,
                "Upstream rejected request"
            );
            return Err(GatewayError::from_status(
                response.status,
                path,
                body,
                retry_after,
            ));
        }

        debug!(
            method = %request.method(),
            path,
            status = response.status,
            elapsed_ms,
            "Upstream request completed"
        );

        let mut value = codec::decode(format, &response.body)
            .map_err(|e| GatewayError::unexpected_payload(path, e))?;

        if format == ResponseFormat::Xml && request.validator() == Some(OutputValidator::RecordList)
        {
            value = codec::normalize_list(value)
                .map(Value::Array)
                .ok_or_else(|| GatewayError::unexpected_payload(path, "expected a list"))?;
        }

        if let Some(validator) = request.validator() {
            validator
                .validate(&value)
                .map_err(|e| GatewayError::unexpected_payload(path, e))?;
        }

        Ok(value)
    }
}

/// Error bodies may come back as JSON even when XML was requested.
fn decode_error_body(format: ResponseFormat, body: &[u8]) -> Value {
    let value = codec::decode_lenient(format, body);
    if value.as_object().is_some_and(|o| o.is_empty()) && format == ResponseFormat::Xml {
        return codec::decode_lenient(ResponseFormat::Json, body);
    }
    value
}

/// `Retry-After` in delta-seconds form
fn parse_retry_after(raw: &str) -> Option<Duration> {
    raw.trim().parse::<u64>().ok().map(Duration::from_secs)
}
