//! # Admission Flows
//!
//! Sliding-window rate limiting observed from the outside: through the
//! router, against a transport that timestamps every request it receives.

#[cfg(test)]
mod tests {
    use crate::fixtures::{config_with_limit, Harness};
    use async_trait::async_trait;
    use futures::future::join_all;
    use parking_lot::Mutex;
    use rm_gateway::ports::{TransportRequest, TransportResponse};
    use rm_gateway::{
        ErrorKind, Gateway, HttpTransport, InMemoryBackend, ResourceFamily, Router,
        TransportError,
    };
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::Instant;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    /// Records the virtual time of every request before delegating
    struct Timestamped {
        inner: InMemoryBackend,
        sent: Mutex<Vec<Instant>>,
    }

    #[async_trait]
    impl HttpTransport for Timestamped {
        async fn send(
            &self,
            request: TransportRequest,
        ) -> Result<TransportResponse, TransportError> {
            self.sent.lock().push(Instant::now());
            self.inner.send(request).await
        }
    }

    fn timestamped_router(max_requests: usize, window: Duration) -> (Arc<Timestamped>, Router) {
        let transport = Arc::new(Timestamped {
            inner: InMemoryBackend::new(),
            sent: Mutex::new(Vec::new()),
        });
        let gateway = Gateway::new(
            config_with_limit(max_requests, window),
            Arc::clone(&transport) as Arc<dyn HttpTransport>,
        );
        (transport, Router::new(Arc::new(gateway)))
    }

    // =============================================================================
    // WINDOW LIMITS
    // =============================================================================

    /// N requests pass immediately; request N+1 waits until the first expires
    #[tokio::test(start_paused = true)]
    async fn test_request_past_limit_waits_one_window() {
        let window = Duration::from_secs(1);
        let harness = Harness::with_config(config_with_limit(3, window));
        let started = Instant::now();

        for _ in 0..3 {
            harness
                .route(ResourceFamily::Roles, "list", json!({}))
                .await
                .unwrap();
        }
        assert!(started.elapsed() < window);

        harness
            .route(ResourceFamily::Roles, "list", json!({}))
            .await
            .unwrap();
        let elapsed = started.elapsed();
        assert!(elapsed >= window, "waited only {:?}", elapsed);
        assert!(elapsed < window + Duration::from_millis(100));

        let snapshot = harness.gateway.metrics().snapshot();
        assert_eq!(snapshot["admission"]["waits"], 1);
        assert_eq!(harness.backend.request_count(), 4);
    }

    /// Concurrent callers never push more than N requests into any window
    #[tokio::test(start_paused = true)]
    async fn test_concurrent_calls_respect_window() {
        let window = Duration::from_secs(1);
        let (transport, router) = timestamped_router(3, window);
        let started = Instant::now();

        let calls = (0..10).map(|_| router.route(ResourceFamily::Clients, "list", json!({})));
        let results = join_all(calls).await;
        assert!(results.iter().all(|r| r.is_ok()));

        let sent = transport.sent.lock().clone();
        assert_eq!(sent.len(), 10);
        for (i, first) in sent.iter().enumerate() {
            let in_window = sent[i..]
                .iter()
                .filter(|t| t.duration_since(*first) < window)
                .count();
            assert!(in_window <= 3, "{} requests inside one window", in_window);
        }
        // 10 requests at 3 per window need at least three full windows
        assert!(started.elapsed() >= window * 3);
    }

    // =============================================================================
    // BOUNDED WAIT AND SHUTDOWN
    // =============================================================================

    /// With max_wait set, an exhausted window fails fast as RateLimit
    #[tokio::test(start_paused = true)]
    async fn test_bounded_wait_fails_without_sending() {
        let mut config = config_with_limit(1, Duration::from_secs(60));
        config.rate_limit.max_wait = Some(Duration::from_millis(200));
        let harness = Harness::with_config(config);

        harness
            .route(ResourceFamily::Statuses, "list", json!({}))
            .await
            .unwrap();
        let err = harness
            .route(ResourceFamily::Statuses, "list", json!({}))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::RateLimit);
        assert_eq!(err.status(), None);
        assert_eq!(harness.backend.request_count(), 1);

        let snapshot = harness.gateway.metrics().snapshot();
        assert_eq!(snapshot["requests"]["total"], 2);
        assert_eq!(snapshot["requests"]["errors"]["rate_limit"], 1);
    }

    /// The sweep starts on first use and stops on shutdown
    #[tokio::test(start_paused = true)]
    async fn test_sweep_lifecycle() {
        let harness = Harness::with_config(config_with_limit(5, Duration::from_millis(500)));
        assert!(!harness.gateway.admission().is_sweeping());

        harness
            .route(ResourceFamily::Phases, "list", json!({}))
            .await
            .unwrap();
        assert!(harness.gateway.admission().is_sweeping());
        assert_eq!(harness.gateway.admission().tracked(), 1);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(harness.gateway.admission().tracked(), 0);

        harness.gateway.shutdown();
        harness.gateway.shutdown();
        assert!(!harness.gateway.admission().is_sweeping());
    }
}
