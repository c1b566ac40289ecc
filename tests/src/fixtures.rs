//! Shared harness: a gateway, router and tool set over one in-memory upstream.

use chrono::NaiveDate;
use rm_gateway::ports::FixedTimeSource;
use rm_gateway::{
    Gateway, GatewayConfig, GatewayResult, HttpTransport, InMemoryBackend, ResourceFamily, Router,
    ToolSet,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Default configuration with a custom admission window
pub fn config_with_limit(max_requests: usize, window: Duration) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.rate_limit.max_requests = max_requests;
    config.rate_limit.window = window;
    config.rate_limit.poll_interval = Duration::from_millis(10);
    config.rate_limit.sweep_interval = Duration::from_millis(50);
    config
}

pub struct Harness {
    pub backend: Arc<InMemoryBackend>,
    pub gateway: Arc<Gateway>,
    pub tools: ToolSet,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(GatewayConfig::default(), None)
    }

    pub fn with_config(config: GatewayConfig) -> Self {
        Self::build(config, None)
    }

    /// Harness whose clock is frozen at midnight UTC of `date`
    pub fn on_date(date: NaiveDate) -> Self {
        Self::build(GatewayConfig::default(), Some(date))
    }

    fn build(config: GatewayConfig, date: Option<NaiveDate>) -> Self {
        let backend = Arc::new(InMemoryBackend::new());
        let transport: Arc<dyn HttpTransport> = backend.clone();
        let mut gateway = Gateway::new(config, transport);
        if let Some(date) = date {
            gateway = gateway.with_clock(Arc::new(FixedTimeSource::on(date)));
        }
        let gateway = Arc::new(gateway);
        let tools = ToolSet::new(Router::new(Arc::clone(&gateway)));
        Self {
            backend,
            gateway,
            tools,
        }
    }

    pub fn seed(&self, family: ResourceFamily, records: Vec<Value>) -> &Self {
        self.backend.seed(family, records);
        self
    }

    pub fn router(&self) -> &Router {
        self.tools.router()
    }

    pub async fn route(
        &self,
        family: ResourceFamily,
        operation: &str,
        params: Value,
    ) -> GatewayResult<Value> {
        self.router().route(family, operation, params).await
    }

    /// Run a tool call and return its `{ok, data | error, meta}` value
    pub async fn call(&self, tool: &str, arguments: Value) -> Value {
        self.tools.call(tool, arguments).await.to_value()
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// `n` people with sequential names and alternating active flags
pub fn people(n: usize) -> Vec<Value> {
    (1..=n)
        .map(|i| {
            serde_json::json!({
                "name": format!("Person {}", i),
                "active": i % 2,
                "department_id": 1 + (i % 3),
            })
        })
        .collect()
}

pub fn date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("valid YYYY-MM-DD date")
}
