//! Sequential bulk executor with per-item failure capture.

use crate::domain::config::BulkConfig;
use crate::domain::error::{GatewayError, GatewayResult};
use crate::domain::types::{BulkItemResult, BulkOutcome};
use crate::gateway::metrics::GatewayMetrics;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct BulkExecutor {
    config: BulkConfig,
    metrics: Arc<GatewayMetrics>,
}

impl BulkExecutor {
    pub fn new(config: BulkConfig, metrics: Arc<GatewayMetrics>) -> Self {
        Self { config, metrics }
    }

    /// Reject empty or oversize batches before any item runs
    pub fn check_batch(&self, len: usize) -> GatewayResult<()> {
        if len == 0 {
            return Err(GatewayError::validation("bulk request contains no items"));
        }
        if len > self.config.max_items {
            return Err(GatewayError::validation(format!(
                "bulk request has {} items, limit is {}",
                len, self.config.max_items
            )));
        }
        Ok(())
    }

    /// Run `action` over every item in input order.
    ///
    /// Item failures are recorded against the item's index; the batch itself
    /// only fails when [`check_batch`](Self::check_batch) rejects it.
    pub async fn run_bulk<I, T, F, Fut>(
        &self,
        items: Vec<I>,
        mut action: F,
    ) -> GatewayResult<BulkOutcome<T>>
    where
        F: FnMut(usize, I) -> Fut,
        Fut: Future<Output = GatewayResult<T>>,
    {
        self.check_batch(items.len())?;

        let mut results = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let result = action(index, item).await;
            if let Err(e) = &result {
                warn!(index, kind = %e.kind(), error = %e, "Bulk item failed");
            }
            self.metrics.record_bulk_item(result.is_ok());
            results.push(BulkItemResult { index, result });
        }

        let outcome = BulkOutcome::from_results(results);
        debug!(
            total = outcome.summary.total,
            failed = outcome.summary.failure_count,
            "Bulk run finished"
        );
        Ok(outcome)
    }
}
