//! Pagination aggregator.
//!
//! Walks `page`/`per-page` list endpoints until a terminal page (fewer items
//! than requested, or none) and concatenates the pages in backend order.

use crate::domain::config::PaginationConfig;
use crate::domain::error::{GatewayError, GatewayResult};
use crate::domain::types::{ListQuery, OutputValidator, RequestDescriptor, ResponseFormat};
use crate::gateway::codec;
use crate::gateway::executor::RequestExecutor;
use crate::gateway::metrics::GatewayMetrics;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

pub struct Paginator {
    executor: Arc<RequestExecutor>,
    config: PaginationConfig,
    metrics: Arc<GatewayMetrics>,
}

impl Paginator {
    pub fn new(
        executor: Arc<RequestExecutor>,
        config: PaginationConfig,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self {
            executor,
            config,
            metrics,
        }
    }

    /// Page size actually requested for a query
    pub fn effective_page_size(&self, query: &ListQuery) -> u32 {
        query
            .per_page
            .unwrap_or(self.config.default_page_size)
            .clamp(1, self.config.max_page_size)
    }

    /// Fetch every record of a list endpoint.
    ///
    /// When the query pins both `page` and `per-page`, exactly that page is
    /// fetched. Otherwise pages are requested from `page` (default 1) until a
    /// terminal page arrives or `max_pages` is exhausted.
    pub async fn fetch_all(
        &self,
        path: &str,
        query: &ListQuery,
        validator: Option<OutputValidator>,
        format: ResponseFormat,
    ) -> GatewayResult<Vec<Value>> {
        let per_page = self.effective_page_size(query);
        let mut page = query.page.unwrap_or(1).max(1);

        if query.is_single_page() {
            return self
                .fetch_page(path, query, page, per_page, validator, format)
                .await;
        }

        let mut records = Vec::new();
        let mut fetched = 0u32;

        loop {
            if fetched >= self.config.max_pages {
                return Err(GatewayError::Upstream {
                    status: None,
                    message: format!(
                        "{} did not reach a terminal page within {} pages",
                        path, self.config.max_pages
                    ),
                    body: Value::Null,
                });
            }

            let items = self
                .fetch_page(path, query, page, per_page, validator, format)
                .await?;
            fetched += 1;

            let count = items.len();
            records.extend(items);
            if count < per_page as usize {
                break;
            }
            page += 1;
        }

        debug!(path, pages = fetched, records = records.len(), "Fetched all pages");
        Ok(records)
    }

    async fn fetch_page(
        &self,
        path: &str,
        query: &ListQuery,
        page: u32,
        per_page: u32,
        validator: Option<OutputValidator>,
        format: ResponseFormat,
    ) -> GatewayResult<Vec<Value>> {
        let mut pairs = query.filter_pairs();
        pairs.push(("page".to_string(), page.to_string()));
        pairs.push(("per-page".to_string(), per_page.to_string()));

        let mut request = RequestDescriptor::get(path)
            .with_query(pairs)
            .with_format(format);
        if let Some(validator) = validator {
            request = request.with_validator(validator);
        }

        let value = self.executor.execute(&request).await?;
        self.metrics.record_page();

        codec::normalize_list(value)
            .ok_or_else(|| GatewayError::unexpected_payload(path, "expected a list"))
    }
}
