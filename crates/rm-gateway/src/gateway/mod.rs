//! Rate-limited gateway client.
//!
//! [`Gateway`] wires the admission queue, request executor, pagination
//! aggregator and bulk executor around one transport, and offers CRUD helpers
//! keyed by [`ResourceSpec`].

pub mod admission;
pub mod bulk;
pub mod codec;
pub mod executor;
pub mod metrics;
pub mod pagination;

pub use admission::AdmissionQueue;
pub use bulk::BulkExecutor;
pub use executor::RequestExecutor;
pub use metrics::GatewayMetrics;
pub use pagination::Paginator;

use crate::adapters::http::ReqwestTransport;
use crate::domain::config::GatewayConfig;
use crate::domain::error::GatewayResult;
use crate::domain::resources::ResourceSpec;
use crate::domain::types::{
    BulkOutcome, ListQuery, OutputValidator, RequestDescriptor, ResponseFormat,
};
use crate::ports::outbound::{HttpTransport, SystemTimeSource, TimeSource, TransportError};
use chrono::NaiveDate;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// Shared client every tool call goes through
pub struct Gateway {
    config: GatewayConfig,
    admission: Arc<AdmissionQueue>,
    executor: Arc<RequestExecutor>,
    paginator: Paginator,
    bulk: BulkExecutor,
    clock: Arc<dyn TimeSource>,
    metrics: Arc<GatewayMetrics>,
}

impl Gateway {
    /// Build a gateway over an arbitrary transport
    pub fn new(config: GatewayConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let metrics = Arc::new(GatewayMetrics::new());
        let admission = Arc::new(AdmissionQueue::with_metrics(
            config.rate_limit.clone(),
            Arc::clone(&metrics),
        ));
        let executor = Arc::new(RequestExecutor::new(
            &config.api,
            transport,
            Arc::clone(&admission),
            Arc::clone(&metrics),
        ));
        let paginator = Paginator::new(
            Arc::clone(&executor),
            config.pagination.clone(),
            Arc::clone(&metrics),
        );
        let bulk = BulkExecutor::new(config.bulk.clone(), Arc::clone(&metrics));

        Self {
            config,
            admission,
            executor,
            paginator,
            bulk,
            clock: Arc::new(SystemTimeSource),
            metrics,
        }
    }

    /// Build a gateway talking HTTP to the configured upstream
    pub fn connect(config: GatewayConfig) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(&config.api)?;
        Ok(Self::new(config, Arc::new(transport)))
    }

    /// Replace the clock used for derived date filters
    pub fn with_clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn admission(&self) -> &Arc<AdmissionQueue> {
        &self.admission
    }

    pub fn metrics(&self) -> &Arc<GatewayMetrics> {
        &self.metrics
    }

    pub fn paginator(&self) -> &Paginator {
        &self.paginator
    }

    /// Current date according to the gateway clock
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Stop background work owned by the gateway
    pub fn shutdown(&self) {
        self.admission.shutdown();
    }

    pub async fn execute(&self, request: &RequestDescriptor) -> GatewayResult<Value> {
        self.executor.execute(request).await
    }

    pub async fn fetch_all(
        &self,
        path: &str,
        query: &ListQuery,
        validator: Option<OutputValidator>,
        format: ResponseFormat,
    ) -> GatewayResult<Vec<Value>> {
        self.paginator
            .fetch_all(path, query, validator, format)
            .await
    }

    pub async fn run_bulk<I, T, F, Fut>(
        &self,
        items: Vec<I>,
        action: F,
    ) -> GatewayResult<BulkOutcome<T>>
    where
        F: FnMut(usize, I) -> Fut,
        Fut: Future<Output = GatewayResult<T>>,
    {
        self.bulk.run_bulk(items, action).await
    }

    // -------------------------------------------------------------------------
    // CRUD helpers
    // -------------------------------------------------------------------------

    pub async fn list(
        &self,
        spec: &ResourceSpec,
        query: &ListQuery,
        format: ResponseFormat,
    ) -> GatewayResult<Vec<Value>> {
        self.fetch_all(spec.path, query, Some(spec.list_validator()), format)
            .await
    }

    pub async fn get(
        &self,
        spec: &ResourceSpec,
        id: u64,
        format: ResponseFormat,
    ) -> GatewayResult<Value> {
        let request = RequestDescriptor::get(spec.item_path(id))
            .with_validator(spec.record_validator())
            .with_format(format);
        self.execute(&request).await
    }

    pub async fn create(
        &self,
        spec: &ResourceSpec,
        data: Value,
        format: ResponseFormat,
    ) -> GatewayResult<Value> {
        let request = RequestDescriptor::post(spec.path, data)
            .with_validator(spec.record_validator())
            .with_format(format);
        self.execute(&request).await
    }

    pub async fn update(
        &self,
        spec: &ResourceSpec,
        id: u64,
        data: Value,
        format: ResponseFormat,
    ) -> GatewayResult<Value> {
        let request = RequestDescriptor::patch(spec.item_path(id), data)
            .with_validator(spec.record_validator())
            .with_format(format);
        self.execute(&request).await
    }

    pub async fn delete(
        &self,
        spec: &ResourceSpec,
        id: u64,
        format: ResponseFormat,
    ) -> GatewayResult<Value> {
        let request = RequestDescriptor::delete(spec.item_path(id)).with_format(format);
        self.execute(&request).await
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        self.admission.shutdown();
    }
}
