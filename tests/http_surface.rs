//! Drives a running relay over real sockets
//!
//! The in-crate tests cover routing through `oneshot`; these make sure the
//! bound application behaves the same through a real listener.

use binance_relay::config::{ApplicationSettings, BinanceSettings, LoggingSettings, Settings};
use binance_relay::Application;
use mockito::{Matcher, Server};
use std::net::SocketAddr;

fn settings(base_url: &str, signed: bool) -> Settings {
    Settings {
        application: ApplicationSettings {
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: "test".to_string(),
        },
        binance: BinanceSettings {
            base_url: base_url.to_string(),
            api_key: signed.then(|| "surface-key".to_string()),
            api_secret: signed.then(|| "surface-secret".to_string()),
            request_timeout_ms: Some(5_000),
            max_body_bytes: 64 * 1024,
        },
        logging: LoggingSettings {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
    }
}

async fn spawn_relay(settings: Settings) -> SocketAddr {
    let app = Application::build(settings)
        .await
        .expect("Failed to build relay");
    let addr = app.local_addr().unwrap();

    tokio::spawn(async move {
        app.run().await.expect("Relay server failed");
    });

    addr
}

#[tokio::test]
async fn test_status_and_health_over_tcp() {
    let addr = spawn_relay(settings("https://api.binance.com", false)).await;
    let client = reqwest::Client::new();

    let body = client
        .get(format!("http://{addr}/"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    let status: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(status["apiKeyLoaded"], false);

    let health = client
        .get(format!("http://{addr}/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(health.status(), reqwest::StatusCode::OK);
    assert!(health.headers().contains_key("x-request-id"));
    assert_eq!(health.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_signed_relay_over_tcp() {
    let mut upstream = Server::new_async().await;
    let mock = upstream
        .mock("GET", "/api/v3/myTrades")
        .match_query(Matcher::Regex(
            "^symbol=ETHUSDT&timestamp=[0-9]+&signature=[0-9a-f]{64}$".to_string(),
        ))
        .match_header("x-mbx-apikey", "surface-key")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("[]")
        .expect(1)
        .create_async()
        .await;

    let addr = spawn_relay(settings(&upstream.url(), true)).await;
    let response = reqwest::Client::new()
        .get(format!("http://{addr}/binance/api/v3/myTrades?symbol=ETHUSDT"))
        .header("x-binance-signed", "true")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "[]");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_cors_preflight_over_tcp() {
    let addr = spawn_relay(settings("https://api.binance.com", false)).await;

    let response = reqwest::Client::new()
        .request(
            reqwest::Method::OPTIONS,
            format!("http://{addr}/binance/api/v3/ping"),
        )
        .header("origin", "https://dashboard.example")
        .header("access-control-request-method", "GET")
        .send()
        .await
        .unwrap();

    assert!(response.status().is_success());
    assert!(response
        .headers()
        .contains_key("access-control-allow-origin"));
}
