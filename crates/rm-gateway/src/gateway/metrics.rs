//! Gateway metrics.
//!
//! Plain atomic counters; exported as JSON and, with the `metrics` feature,
//! in Prometheus text format.

use crate::domain::error::ErrorKind;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters shared by every component of one gateway
#[derive(Debug, Default)]
pub struct GatewayMetrics {
    // Upstream requests
    pub requests_total: AtomicU64,
    pub requests_success: AtomicU64,
    pub errors_validation: AtomicU64,
    pub errors_not_found: AtomicU64,
    pub errors_auth: AtomicU64,
    pub errors_rate_limit: AtomicU64,
    pub errors_upstream: AtomicU64,

    // Admission
    pub admission_waits: AtomicU64,
    pub admission_wait_ms: AtomicU64,

    // Pagination
    pub pages_fetched: AtomicU64,

    // Bulk
    pub bulk_items_ok: AtomicU64,
    pub bulk_items_failed: AtomicU64,

    // Latency (sum and count)
    pub total_latency_ms: AtomicU64,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one finished request, including ones refused at admission
    pub fn record_request(&self, outcome: Result<(), ErrorKind>, latency: Duration) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ms
            .fetch_add(latency.as_millis() as u64, Ordering::Relaxed);
        match outcome {
            Ok(()) => self.requests_success.fetch_add(1, Ordering::Relaxed),
            Err(kind) => self.error_counter(kind).fetch_add(1, Ordering::Relaxed),
        };
    }

    /// Record a caller that had to wait for admission
    pub fn record_admission_wait(&self, waited: Duration) {
        self.admission_waits.fetch_add(1, Ordering::Relaxed);
        self.admission_wait_ms
            .fetch_add(waited.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_page(&self) {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bulk_item(&self, success: bool) {
        if success {
            self.bulk_items_ok.fetch_add(1, Ordering::Relaxed);
        } else {
            self.bulk_items_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn error_counter(&self, kind: ErrorKind) -> &AtomicU64 {
        match kind {
            ErrorKind::Validation => &self.errors_validation,
            ErrorKind::NotFound => &self.errors_not_found,
            ErrorKind::Auth => &self.errors_auth,
            ErrorKind::RateLimit => &self.errors_rate_limit,
            ErrorKind::Upstream => &self.errors_upstream,
        }
    }

    pub fn errors_total(&self) -> u64 {
        [
            ErrorKind::Validation,
            ErrorKind::NotFound,
            ErrorKind::Auth,
            ErrorKind::RateLimit,
            ErrorKind::Upstream,
        ]
        .into_iter()
        .map(|kind| self.error_counter(kind).load(Ordering::Relaxed))
        .sum()
    }

    /// Get average latency in ms
    pub fn average_latency_ms(&self) -> f64 {
        let total = self.total_latency_ms.load(Ordering::Relaxed);
        let count = self.requests_total.load(Ordering::Relaxed);
        if count == 0 {
            0.0
        } else {
            total as f64 / count as f64
        }
    }

    /// Export metrics as JSON
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "requests": {
                "total": self.requests_total.load(Ordering::Relaxed),
                "success": self.requests_success.load(Ordering::Relaxed),
                "errors": {
                    "validation": self.errors_validation.load(Ordering::Relaxed),
                    "not_found": self.errors_not_found.load(Ordering::Relaxed),
                    "auth": self.errors_auth.load(Ordering::Relaxed),
                    "rate_limit": self.errors_rate_limit.load(Ordering::Relaxed),
                    "upstream": self.errors_upstream.load(Ordering::Relaxed),
                },
            },
            "admission": {
                "waits": self.admission_waits.load(Ordering::Relaxed),
                "wait_ms": self.admission_wait_ms.load(Ordering::Relaxed),
            },
            "pagination": {
                "pages": self.pages_fetched.load(Ordering::Relaxed),
            },
            "bulk": {
                "ok": self.bulk_items_ok.load(Ordering::Relaxed),
                "failed": self.bulk_items_failed.load(Ordering::Relaxed),
            },
            "latency": {
                "average_ms": self.average_latency_ms(),
            }
        })
    }

    /// Export metrics in Prometheus format
    #[cfg(feature = "metrics")]
    pub fn to_prometheus(&self) -> String {
        let mut output = String::new();

        let counters = [
            (
                "rm_gateway_requests_total",
                "Upstream requests sent",
                self.requests_total.load(Ordering::Relaxed),
            ),
            (
                "rm_gateway_requests_success_total",
                "Upstream requests that returned 2xx",
                self.requests_success.load(Ordering::Relaxed),
            ),
            (
                "rm_gateway_admission_waits_total",
                "Requests that waited for admission",
                self.admission_waits.load(Ordering::Relaxed),
            ),
            (
                "rm_gateway_admission_wait_ms_total",
                "Milliseconds spent waiting for admission",
                self.admission_wait_ms.load(Ordering::Relaxed),
            ),
            (
                "rm_gateway_pages_fetched_total",
                "List pages fetched",
                self.pages_fetched.load(Ordering::Relaxed),
            ),
            (
                "rm_gateway_bulk_items_ok_total",
                "Bulk items that succeeded",
                self.bulk_items_ok.load(Ordering::Relaxed),
            ),
            (
                "rm_gateway_bulk_items_failed_total",
                "Bulk items that failed",
                self.bulk_items_failed.load(Ordering::Relaxed),
            ),
        ];

        for (name, help, value) in counters {
            output.push_str(&format!(
                "# HELP {name} {help}\n# TYPE {name} counter\n{name} {value}\n"
            ));
        }

        output.push_str(
            "# HELP rm_gateway_request_errors_total Failed upstream requests by kind\n\
             # TYPE rm_gateway_request_errors_total counter\n",
        );
        for kind in [
            ErrorKind::Validation,
            ErrorKind::NotFound,
            ErrorKind::Auth,
            ErrorKind::RateLimit,
            ErrorKind::Upstream,
        ] {
            output.push_str(&format!(
                "rm_gateway_request_errors_total{{kind=\"{}\"}} {}\n",
                kind,
                self.error_counter(kind).load(Ordering::Relaxed)
            ));
        }

        output.push_str(&format!(
            "# HELP rm_gateway_average_latency_ms Average request latency\n\
             # TYPE rm_gateway_average_latency_ms gauge\n\
             rm_gateway_average_latency_ms {:.2}\n",
            self.average_latency_ms()
        ));

        output
    }
}
