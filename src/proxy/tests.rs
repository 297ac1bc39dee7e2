//! Router-level tests that never reach an upstream

mod relay_service_tests {
    use crate::proxy::headers::{X_BINANCE_SIGNED, X_REQUEST_ID};
    use crate::proxy::service::DEFAULT_MAX_REQUEST_BYTES;
    use crate::proxy::types::{ApiKey, ApiSecret, Credentials, RequestSizeLimit, UpstreamOrigin};
    use crate::proxy::{RelayConfig, RelayService};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use serde_json::Value;
    use tower::ServiceExt;

    // Nothing listens here; tests in this module must fail before any call
    const UNREACHABLE_ORIGIN: &str = "http://127.0.0.1:9";

    fn credentials() -> Credentials {
        Credentials::new(
            ApiKey::try_new("test-api-key".to_string()).unwrap(),
            ApiSecret::try_new("test-api-secret".to_string()).unwrap(),
        )
    }

    fn router(credentials: Option<Credentials>) -> Router {
        let config = RelayConfig {
            upstream_origin: UpstreamOrigin::try_new(UNREACHABLE_ORIGIN.to_string()).unwrap(),
            credentials,
            ..RelayConfig::default()
        };
        RelayService::new(config).unwrap().into_router()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[test]
    fn test_relay_config_defaults() {
        let config = RelayConfig::default();

        assert_eq!(config.upstream_origin.as_ref(), "https://api.binance.com");
        assert_eq!(*config.max_request_size.as_ref(), DEFAULT_MAX_REQUEST_BYTES);
        assert!(config.credentials.is_none());
        assert!(config.request_timeout.is_none());
        assert!(config.permissive_cors);
    }

    #[test]
    fn test_service_reports_credentials() {
        let without = RelayService::new(RelayConfig::default()).unwrap();
        assert!(!without.state().relay().has_credentials());

        let with = RelayService::new(RelayConfig {
            credentials: Some(credentials()),
            ..RelayConfig::default()
        })
        .unwrap();
        assert!(with.state().relay().has_credentials());
    }

    #[tokio::test]
    async fn test_root_reports_api_key_state() {
        let response = router(None).oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["apiKeyLoaded"], false);

        let response = router(Some(credentials())).oneshot(get("/")).await.unwrap();
        let body = json_body(response).await;
        assert_eq!(body["apiKeyLoaded"], true);
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = router(None).oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(X_REQUEST_ID));

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"OK");
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let response = router(None).oneshot(get("/nope")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(response).await;
        assert_eq!(body["code"], "NOT_FOUND");
        assert!(body["request_id"].is_string());
    }

    #[tokio::test]
    async fn test_binance_without_target_path() {
        for uri in ["/binance", "/binance/"] {
            let response = router(None).oneshot(get(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
            let body = json_body(response).await;
            assert_eq!(body["code"], "INVALID_REQUEST");
            assert_eq!(body["error"], "Missing target path");
        }
    }

    #[tokio::test]
    async fn test_proxy_without_url() {
        let response = router(None).oneshot(get("/proxy")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Missing url param");
    }

    #[tokio::test]
    async fn test_error_bodies_carry_request_id() {
        let response = router(None).oneshot(get("/proxy")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let header = response
            .headers()
            .get(X_REQUEST_ID)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();

        let body = json_body(response).await;
        assert_eq!(body["code"], "INVALID_REQUEST");
        assert_eq!(body["request_id"], header.as_str());
    }

    #[tokio::test]
    async fn test_error_bodies_keep_caller_request_id() {
        let caller_id = "0191c3a8-7e5f-7b3a-9c1d-2e4f6a8b0c1d";
        let request = Request::builder()
            .uri("/account")
            .header(X_REQUEST_ID, caller_id)
            .body(Body::empty())
            .unwrap();

        let response = router(None).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["code"], "CONFIGURATION_ERROR");
        assert_eq!(body["request_id"], caller_id);
    }

    #[tokio::test]
    async fn test_proxy_rejects_relative_url() {
        let response = router(None)
            .oneshot(get("/proxy?url=api/v3/ping"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_signed_routes_need_credentials() {
        let signed_wildcard = Request::builder()
            .uri("/binance/api/v3/account")
            .header(X_BINANCE_SIGNED, "true")
            .body(Body::empty())
            .unwrap();
        let signed_call = Request::builder()
            .method("POST")
            .uri("/signed")
            .body(Body::from(r#"{"endpoint":"/api/v3/openOrders"}"#))
            .unwrap();

        for request in [
            signed_wildcard,
            get("/account"),
            get("/balance"),
            signed_call,
        ] {
            let uri = request.uri().clone();
            let response = router(None).oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
            let body = json_body(response).await;
            assert_eq!(body["code"], "CONFIGURATION_ERROR", "{uri}");
        }
    }

    #[tokio::test]
    async fn test_signed_call_without_endpoint() {
        let request = Request::builder()
            .method("POST")
            .uri("/signed")
            .body(Body::from(r#"{"params":{"symbol":"BTCUSDT"}}"#))
            .unwrap();

        let response = router(Some(credentials())).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Missing endpoint");
    }

    #[tokio::test]
    async fn test_unsupported_method_is_rejected() {
        let request = Request::builder()
            .method("TRACE")
            .uri("/binance/api/v3/ping")
            .body(Body::empty())
            .unwrap();

        let response = router(None).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["code"], "INVALID_REQUEST");
        assert!(body["request_id"].is_string());
    }

    #[tokio::test]
    async fn test_options_is_answered_by_cors() {
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/binance/api/v3/ping")
            .body(Body::empty())
            .unwrap();

        let response = router(None).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let config = RelayConfig {
            upstream_origin: UpstreamOrigin::try_new(UNREACHABLE_ORIGIN.to_string()).unwrap(),
            max_request_size: RequestSizeLimit::try_new(64).unwrap(),
            permissive_cors: false,
            ..RelayConfig::default()
        };
        let app = RelayService::new(config).unwrap().into_router();

        let body = format!(r#"{{"data":"{}"}}"#, "x".repeat(128));
        let request = Request::builder()
            .method("POST")
            .uri("/binance/api/v3/order")
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body = json_body(response).await;
        assert_eq!(body["code"], "REQUEST_TOO_LARGE");
    }

    #[tokio::test]
    async fn test_malformed_write_body_is_rejected() {
        let request = Request::builder()
            .method("POST")
            .uri("/binance/api/v3/order")
            .body(Body::from("{not json"))
            .unwrap();

        let response = router(None).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
