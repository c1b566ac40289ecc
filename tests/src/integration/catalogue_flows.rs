//! # Catalogue Flows
//!
//! Direct CRUD across families and the mapping of upstream failures onto
//! the error taxonomy.

#[cfg(test)]
mod tests {
    use crate::fixtures::{people, Harness};
    use rm_gateway::domain::types::HttpMethod;
    use rm_gateway::{ErrorKind, FailureRule, ResourceFamily, TransportError};
    use serde_json::{json, Value};

    // =============================================================================
    // CRUD
    // =============================================================================

    /// Records come back exactly as the upstream stored them
    #[tokio::test]
    async fn test_list_returns_records_unmodified() {
        let harness = Harness::new();
        harness.seed(
            ResourceFamily::People,
            vec![
                json!({"name": "Ada", "tags": [{"name": "rust"}], "extra": {"nested": [1, 2]}}),
                json!({"name": "Grace", "active": 0}),
            ],
        );

        let listed = harness
            .route(ResourceFamily::People, "list", json!({}))
            .await
            .unwrap();

        assert_eq!(listed, Value::Array(harness.backend.records(ResourceFamily::People)));
    }

    /// Created records can be fetched back by the id the upstream assigned
    #[tokio::test]
    async fn test_create_then_get_round_trip() {
        let harness = Harness::new();

        let created = harness
            .route(
                ResourceFamily::Projects,
                "create",
                json!({"data": {"name": "Apollo", "client_id": 4}}),
            )
            .await
            .unwrap();
        let id = created["project_id"].as_u64().unwrap();

        let fetched = harness
            .route(ResourceFamily::Projects, "get", json!({"id": id}))
            .await
            .unwrap();

        assert_eq!(fetched, created);
        assert_eq!(fetched["name"], "Apollo");
    }

    /// Repeated gets with no writes in between are identical
    #[tokio::test]
    async fn test_get_is_idempotent() {
        let harness = Harness::new();
        harness.seed(ResourceFamily::Departments, vec![json!({"name": "Ops"})]);

        let first = harness
            .route(ResourceFamily::Departments, "get", json!({"id": 1}))
            .await
            .unwrap();
        let second = harness
            .route(ResourceFamily::Departments, "get", json!({"id": 1}))
            .await
            .unwrap();

        assert_eq!(first, second);
    }

    /// Update is a PATCH merge; delete removes the record
    #[tokio::test]
    async fn test_update_then_delete() {
        let harness = Harness::new();
        harness.seed(
            ResourceFamily::Milestones,
            vec![json!({"name": "Beta", "date": "2026-03-01"})],
        );

        let updated = harness
            .route(
                ResourceFamily::Milestones,
                "update",
                json!({"id": 1, "data": {"date": "2026-04-01"}}),
            )
            .await
            .unwrap();
        assert_eq!(updated["name"], "Beta");
        assert_eq!(updated["date"], "2026-04-01");
        assert_eq!(harness.backend.requests()[0].method, HttpMethod::Patch);

        let deleted = harness
            .route(ResourceFamily::Milestones, "delete", json!({"id": 1}))
            .await
            .unwrap();
        assert_eq!(deleted, json!({"deleted": true, "milestone_id": 1}));
        assert!(harness.backend.records(ResourceFamily::Milestones).is_empty());
    }

    /// Filtered list operations send their filter upstream
    #[tokio::test]
    async fn test_list_active_filters_upstream() {
        let harness = Harness::new();
        harness.seed(ResourceFamily::People, people(5));

        let listed = harness
            .route(ResourceFamily::People, "list-active", json!({}))
            .await
            .unwrap();

        assert_eq!(listed.as_array().unwrap().len(), 3);
        assert!(harness.backend.requests()[0]
            .query
            .contains(&("active".to_string(), "1".to_string())));
    }

    // =============================================================================
    // ERROR CLASSIFICATION
    // =============================================================================

    /// Unknown operations name both the family and the operation
    #[tokio::test]
    async fn test_unknown_operation_is_validation() {
        let harness = Harness::new();

        let err = harness
            .route(ResourceFamily::People, "bogus-op", json!({}))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("people"));
        assert!(err.to_string().contains("bogus-op"));
        assert_eq!(harness.backend.request_count(), 0);

        let err = harness
            .route(ResourceFamily::Accounts, "create", json!({"data": {}}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    /// A missing record is NotFound carrying the upstream body
    #[tokio::test]
    async fn test_missing_record_is_not_found() {
        let harness = Harness::new();

        let err = harness
            .route(ResourceFamily::Tasks, "get", json!({"id": 99}))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.status(), Some(404));
        assert!(err.body().is_some_and(|b| b.get("message").is_some()));
    }

    /// 401 and 403 are Auth; 429 is RateLimit with Retry-After
    #[tokio::test]
    async fn test_auth_and_throttle_statuses() {
        let harness = Harness::new();
        harness
            .backend
            .add_failure(FailureRule::status(401, json!({"message": "bad token"})).times(1))
            .add_failure(
                FailureRule::status(429, json!({"message": "slow down"}))
                    .with_retry_after(7)
                    .times(1),
            );

        let auth = harness
            .route(ResourceFamily::Roles, "list", json!({}))
            .await
            .unwrap_err();
        assert_eq!(auth.kind(), ErrorKind::Auth);
        assert_eq!(auth.status(), Some(401));

        let throttled = harness
            .route(ResourceFamily::Roles, "list", json!({}))
            .await
            .unwrap_err();
        assert_eq!(throttled.kind(), ErrorKind::RateLimit);
        assert_eq!(throttled.to_value()["retry_after_ms"], 7000);

        harness
            .route(ResourceFamily::Roles, "list", json!({}))
            .await
            .unwrap();
    }

    /// Transport failures are Upstream without a status
    #[tokio::test]
    async fn test_transport_failure_is_upstream() {
        let harness = Harness::new();
        harness.backend.add_failure(FailureRule::transport(TransportError::Connect(
            "connection refused".to_string(),
        )));

        let err = harness
            .route(ResourceFamily::Clients, "get", json!({"id": 1}))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Upstream);
        assert_eq!(err.status(), None);
        assert!(err.to_string().contains("connection refused"));
    }

    /// Validation failures short-circuit before any upstream request
    #[tokio::test]
    async fn test_malformed_parameters_never_reach_upstream() {
        let harness = Harness::new();

        for params in [
            json!({"id": "seven"}),
            json!({}),
            json!({"id": 1, "format": "yaml"}),
        ] {
            let err = harness
                .route(ResourceFamily::TimeOffTypes, "get", params)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
        let err = harness
            .route(ResourceFamily::TimeOffTypes, "create", json!({"data": [1, 2]}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        assert_eq!(harness.backend.request_count(), 0);
        assert_eq!(harness.gateway.metrics().snapshot()["requests"]["total"], 0);
    }

    /// Upstream errors are counted by class
    #[tokio::test]
    async fn test_error_metrics_by_kind() {
        let harness = Harness::new();
        harness.seed(ResourceFamily::Roles, vec![json!({"name": "Lead"})]);

        harness
            .route(ResourceFamily::Roles, "get", json!({"id": 1}))
            .await
            .unwrap();
        let _ = harness
            .route(ResourceFamily::Roles, "get", json!({"id": 2}))
            .await;

        let snapshot = harness.gateway.metrics().snapshot();
        assert_eq!(snapshot["requests"]["total"], 2);
        assert_eq!(snapshot["requests"]["success"], 1);
        assert_eq!(snapshot["requests"]["errors"]["not_found"], 1);
    }
}
