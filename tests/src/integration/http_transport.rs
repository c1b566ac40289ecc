//! # HTTP Transport
//!
//! The production `reqwest` transport against a mock HTTP server: request
//! shape on the wire, status classification and format negotiation.

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server, ServerGuard};
    use rm_gateway::{ErrorKind, Gateway, GatewayConfig, ResourceFamily, Router};
    use serde_json::json;
    use std::sync::Arc;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const TOKEN: &str = "test-token";

    fn router_for(base_url: String) -> Router {
        let mut config = GatewayConfig::default();
        config.api.base_url = base_url;
        config.api.token = TOKEN.to_string();
        let gateway = Gateway::connect(config).unwrap();
        Router::new(Arc::new(gateway))
    }

    async fn server_and_router() -> (ServerGuard, Router) {
        let server = Server::new_async().await;
        let router = router_for(server.url());
        (server, router)
    }

    fn page_query(page: u32, per_page: u32) -> Matcher {
        Matcher::AllOf(vec![
            Matcher::UrlEncoded("page".into(), page.to_string()),
            Matcher::UrlEncoded("per-page".into(), per_page.to_string()),
        ])
    }

    // =============================================================================
    // REQUEST SHAPE
    // =============================================================================

    /// Every request carries the bearer token, Accept and User-Agent
    #[tokio::test]
    async fn test_get_sends_auth_and_negotiation_headers() {
        let (mut server, router) = server_and_router().await;
        let mock = server
            .mock("GET", "/people/7")
            .match_header("authorization", format!("Bearer {}", TOKEN).as_str())
            .match_header("accept", "application/json")
            .match_header("user-agent", Matcher::Regex("^rm-gateway/".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"people_id": 7, "name": "Ada"}"#)
            .create_async()
            .await;

        let person = router
            .route(ResourceFamily::People, "get", json!({"id": 7}))
            .await
            .unwrap();

        assert_eq!(person, json!({"people_id": 7, "name": "Ada"}));
        mock.assert_async().await;
    }

    /// Create sends the payload as a JSON body
    #[tokio::test]
    async fn test_create_posts_json_body() {
        let (mut server, router) = server_and_router().await;
        let mock = server
            .mock("POST", "/clients")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({"name": "Acme"})))
            .with_status(201)
            .with_body(r#"{"client_id": 3, "name": "Acme"}"#)
            .create_async()
            .await;

        let created = router
            .route(ResourceFamily::Clients, "create", json!({"data": {"name": "Acme"}}))
            .await
            .unwrap();

        assert_eq!(created["client_id"], 3);
        mock.assert_async().await;
    }

    /// Listing walks pages over the wire until a short one
    #[tokio::test]
    async fn test_list_paginates_over_http() {
        let (mut server, router) = server_and_router().await;
        let first = server
            .mock("GET", "/roles")
            .match_query(page_query(1, 2))
            .with_status(200)
            .with_body(r#"[{"role_id": 1}, {"role_id": 2}]"#)
            .expect(1)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/roles")
            .match_query(page_query(2, 2))
            .with_status(200)
            .with_body(r#"[{"role_id": 3}]"#)
            .expect(1)
            .create_async()
            .await;

        let roles = router
            .route(ResourceFamily::Roles, "list", json!({"per-page": 2}))
            .await
            .unwrap();

        assert_eq!(
            roles,
            json!([{"role_id": 1}, {"role_id": 2}, {"role_id": 3}])
        );
        first.assert_async().await;
        second.assert_async().await;
    }

    /// XML is requested via Accept and decoded into records
    #[tokio::test]
    async fn test_xml_list_is_decoded() {
        let (mut server, router) = server_and_router().await;
        let mock = server
            .mock("GET", "/status")
            .match_query(Matcher::Any)
            .match_header("accept", "application/xml")
            .with_status(200)
            .with_header("content-type", "application/xml")
            .with_body("<statuses><item><status_id>4</status_id><name>Tentative</name></item></statuses>")
            .create_async()
            .await;

        let statuses = router
            .route(ResourceFamily::Statuses, "list", json!({"format": "xml"}))
            .await
            .unwrap();

        assert_eq!(statuses, json!([{"status_id": "4", "name": "Tentative"}]));
        mock.assert_async().await;
    }

    // =============================================================================
    // STATUS CLASSIFICATION
    // =============================================================================

    /// 429 keeps the Retry-After hint
    #[tokio::test]
    async fn test_throttled_response_carries_retry_after() {
        let (mut server, router) = server_and_router().await;
        server
            .mock("GET", "/phases/1")
            .with_status(429)
            .with_header("retry-after", "3")
            .with_body(r#"{"message": "Too many requests"}"#)
            .create_async()
            .await;

        let err = router
            .route(ResourceFamily::Phases, "get", json!({"id": 1}))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::RateLimit);
        assert_eq!(err.status(), Some(429));
        assert_eq!(err.to_value()["retry_after_ms"], 3000);
    }

    /// 401 is Auth with the upstream body attached
    #[tokio::test]
    async fn test_unauthorized_is_auth() {
        let (mut server, router) = server_and_router().await;
        server
            .mock("GET", "/accounts")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(r#"{"message": "Unauthorized"}"#)
            .create_async()
            .await;

        let err = router
            .route(ResourceFamily::Accounts, "list", json!({}))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Auth);
        assert_eq!(err.body(), Some(&json!({"message": "Unauthorized"})));
    }

    /// A refused connection is Upstream without a status
    #[tokio::test]
    async fn test_connection_refused_is_upstream() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let router = router_for(format!("http://127.0.0.1:{}/v3", port));

        let err = router
            .route(ResourceFamily::Departments, "get", json!({"id": 1}))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Upstream);
        assert_eq!(err.status(), None);
        assert!(!err.to_string().contains("test-token"));
    }
}
