//! # Pagination Flows
//!
//! Multi-page aggregation through `list`: page counts, terminal pages,
//! explicit pages, XML list bodies and the runaway-pagination guard.

#[cfg(test)]
mod tests {
    use crate::fixtures::{people, Harness};
    use proptest::prelude::*;
    use rm_gateway::{ErrorKind, FailureRule, GatewayConfig, ResourceFamily};
    use serde_json::{json, Value};

    fn page_params(request: &rm_gateway::ports::TransportRequest) -> (String, String) {
        let find = |name: &str| {
            request
                .query
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
                .unwrap_or_default()
        };
        (find("page"), find("per-page"))
    }

    // =============================================================================
    // PAGE COUNTS
    // =============================================================================

    /// 7 records at 3 per page: pages 1..=3, the last one short
    #[tokio::test]
    async fn test_short_page_terminates() {
        let harness = Harness::new();
        harness.seed(ResourceFamily::People, people(7));

        let listed = harness
            .route(ResourceFamily::People, "list", json!({"per-page": 3}))
            .await
            .unwrap();

        assert_eq!(listed.as_array().unwrap().len(), 7);
        let pages: Vec<_> = harness.backend.requests().iter().map(page_params).collect();
        assert_eq!(
            pages,
            vec![
                ("1".to_string(), "3".to_string()),
                ("2".to_string(), "3".to_string()),
                ("3".to_string(), "3".to_string()),
            ]
        );
    }

    /// An exact multiple needs one extra, empty page to terminate
    #[tokio::test]
    async fn test_exact_multiple_fetches_empty_terminal_page() {
        let harness = Harness::new();
        harness.seed(ResourceFamily::People, people(6));

        let listed = harness
            .route(ResourceFamily::People, "list", json!({"per-page": 3}))
            .await
            .unwrap();

        assert_eq!(listed.as_array().unwrap().len(), 6);
        assert_eq!(harness.backend.request_count(), 3);
        assert_eq!(harness.gateway.metrics().snapshot()["pagination"]["pages"], 3);
    }

    /// An explicit page means exactly one request, whatever its size
    #[tokio::test]
    async fn test_explicit_page_is_single_request() {
        let harness = Harness::new();
        harness.seed(ResourceFamily::People, people(10));

        let listed = harness
            .route(ResourceFamily::People, "list", json!({"page": 2, "per-page": 4}))
            .await
            .unwrap();

        let names: Vec<&str> = listed
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|p| p["name"].as_str())
            .collect();
        assert_eq!(names, vec!["Person 5", "Person 6", "Person 7", "Person 8"]);
        assert_eq!(harness.backend.request_count(), 1);
    }

    /// Filters are repeated on every page request
    #[tokio::test]
    async fn test_filters_carry_across_pages() {
        let harness = Harness::new();
        harness.seed(ResourceFamily::People, people(9));

        let listed = harness
            .route(
                ResourceFamily::People,
                "list-by-department",
                json!({"department_id": 2, "per-page": 2}),
            )
            .await
            .unwrap();

        let listed = listed.as_array().unwrap();
        assert_eq!(listed.len(), 3);
        assert!(listed.iter().all(|p| p["department_id"] == 2));
        for request in harness.backend.requests() {
            assert!(request
                .query
                .contains(&("department_id".to_string(), "2".to_string())));
        }
    }

    // =============================================================================
    // FORMATS AND FAILURES
    // =============================================================================

    /// XML list bodies are unwrapped and concatenated like JSON ones
    #[tokio::test]
    async fn test_xml_pages_are_normalized() {
        let harness = Harness::new();
        harness.seed(ResourceFamily::Clients, vec![
            json!({"name": "Acme"}),
            json!({"name": "Globex"}),
            json!({"name": "Initech"}),
        ]);

        let listed = harness
            .route(
                ResourceFamily::Clients,
                "list",
                json!({"format": "xml", "per-page": 2}),
            )
            .await
            .unwrap();

        let names: Vec<&str> = listed
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|c| c["name"].as_str())
            .collect();
        assert_eq!(names, vec!["Acme", "Globex", "Initech"]);
        assert_eq!(
            harness.backend.requests()[0].header("accept"),
            Some("application/xml")
        );
    }

    /// A failed page fails the whole list; nothing partial is returned
    #[tokio::test]
    async fn test_page_failure_propagates() {
        let harness = Harness::new();
        harness.seed(ResourceFamily::Tasks, vec![json!({"name": "a"})]);
        harness
            .backend
            .add_failure(FailureRule::status(503, json!({"message": "maintenance"})).times(1));

        let err = harness
            .route(ResourceFamily::Tasks, "list", json!({}))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Upstream);
        assert_eq!(err.status(), Some(503));
        assert_eq!(err.body(), Some(&json!({"message": "maintenance"})));
    }

    /// A backend that never returns a short page is cut off
    #[tokio::test]
    async fn test_page_limit_stops_runaway_listing() {
        let mut config = GatewayConfig::default();
        config.pagination.max_pages = 2;
        let harness = Harness::with_config(config);
        harness.seed(ResourceFamily::People, people(10));

        let err = harness
            .route(ResourceFamily::People, "list", json!({"per-page": 2}))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Upstream);
        assert_eq!(err.status(), None);
        assert_eq!(harness.backend.request_count(), 2);
    }

    // =============================================================================
    // PROPERTIES
    // =============================================================================

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// m records at k per page: every record once, in order, in m/k + 1 calls
        #[test]
        fn prop_list_returns_everything_in_order(m in 0usize..40, k in 1u32..12) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async {
                let harness = Harness::new();
                harness.seed(ResourceFamily::People, people(m));

                let listed = harness
                    .route(ResourceFamily::People, "list", json!({"per-page": k}))
                    .await
                    .unwrap();

                let expected = Value::Array(harness.backend.records(ResourceFamily::People));
                prop_assert_eq!(listed, expected);
                prop_assert_eq!(harness.backend.request_count(), m / k as usize + 1);
                Ok(())
            })?;
        }
    }
}
