//! End-to-end tests: a real server receives webhooks and fans them out to
//! mocked channel endpoints.

mod helpers;

use helpers::mock_publisher::MockPublisher;
use helpers::{alert, config_for_mock, start_server, webhook_body};
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_ok(server: &MockServer, route: &str, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_single_alert_reaches_every_channel() {
    // Arrange
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/slack"))
        .and(body_partial_json(json!({
            "attachments": [{"title": "🚨 HighCPU", "color": "danger"}]
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock)
        .await;
    Mock::given(method("POST"))
        .and(path("/discord"))
        .and(body_partial_json(json!({"embeds": [{"color": 15158332}]})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock)
        .await;
    Mock::given(method("POST"))
        .and(path("/teams"))
        .and(body_partial_json(json!({"themeColor": "d63031"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/enqueue"))
        .and(body_partial_json(json!({
            "routing_key": "test-routing-key",
            "event_action": "trigger",
            "dedup_key": "HighCPU_host1"
        })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&mock)
        .await;

    let publisher = MockPublisher::default();
    let server = start_server(&config_for_mock(&mock.uri()), Some(Arc::new(publisher.clone()))).await;
    let body = webhook_body(vec![alert("HighCPU", "critical", "firing", "host1")]);

    // Act
    let response = reqwest::Client::new()
        .post(server.url("/webhook"))
        .json(&body)
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert_eq!(response.headers()["content-type"], "application/json");
    let json: Value = response.json().await.unwrap();
    assert_eq!(
        json,
        json!({
            "message": "Successfully processed 1 alerts",
            "processed_alerts": 1,
            "notifications_sent": ["email", "slack", "discord", "teams", "pagerduty"]
        })
    );

    let published = publisher.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].0, "🚨 Prometheus Alert: HighCPU (CRITICAL)");

    server.stop().await;
}

#[tokio::test]
async fn test_batch_uses_summary_and_one_pagerduty_event_per_alert() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/slack"))
        .and(body_partial_json(json!({
            "icon_emoji": ":rotating_light:",
            "attachments": [{"text": "*3 alerts* (1 critical, 1 warning, 2 firing)"}]
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock)
        .await;
    mount_ok(&mock, "/discord", 1).await;
    mount_ok(&mock, "/teams", 1).await;
    Mock::given(method("POST"))
        .and(path("/v2/enqueue"))
        .and(body_partial_json(json!({"event_action": "resolve"})))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&mock)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/enqueue"))
        .and(body_partial_json(json!({"event_action": "trigger"})))
        .respond_with(ResponseTemplate::new(202))
        .expect(2)
        .mount(&mock)
        .await;

    let publisher = MockPublisher::default();
    let server = start_server(&config_for_mock(&mock.uri()), Some(Arc::new(publisher.clone()))).await;
    let body = webhook_body(vec![
        alert("HighCPU", "critical", "firing", "host1"),
        alert("DiskFull", "warning", "firing", "host2"),
        alert("HighLatency", "info", "resolved", "host3"),
    ]);

    let response = reqwest::Client::new()
        .post(server.url("/"))
        .json(&body)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["processed_alerts"], 3);
    assert_eq!(json["notifications_sent"].as_array().unwrap().len(), 5);

    let published = publisher.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].0, "🚨 Prometheus Alert Summary: 3 alerts (1 critical, 1 warning)");

    server.stop().await;
}

#[tokio::test]
async fn test_failing_channel_does_not_affect_others() {
    let mock = MockServer::start().await;
    mount_ok(&mock, "/slack", 1).await;
    mount_ok(&mock, "/teams", 1).await;
    mount_ok(&mock, "/v2/enqueue", 1).await;

    let mut config = config_for_mock(&mock.uri());
    // Nothing listens here, so the Discord request fails to connect.
    config.discord.webhook_url = "http://127.0.0.1:9/discord".to_string();

    let server = start_server(&config, Some(Arc::new(MockPublisher::failing()))).await;
    let body = webhook_body(vec![alert("HighCPU", "critical", "firing", "host1")]);

    let response = reqwest::Client::new()
        .post(server.url("/webhook"))
        .json(&body)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["processed_alerts"], 1);
    assert_eq!(
        json["notifications_sent"],
        json!(["slack", "teams", "pagerduty"])
    );

    server.stop().await;
}

#[tokio::test]
async fn test_disabled_channels_are_never_called() {
    let mock = MockServer::start().await;
    mount_ok(&mock, "/slack", 1).await;
    mount_ok(&mock, "/discord", 0).await;
    mount_ok(&mock, "/teams", 0).await;
    mount_ok(&mock, "/v2/enqueue", 0).await;

    let mut config = config_for_mock(&mock.uri());
    config.email.enabled = false;
    config.discord.enabled = false;
    config.teams.webhook_url = String::new();
    config.pagerduty.integration_key = String::new();

    let publisher = MockPublisher::default();
    let server = start_server(&config, Some(Arc::new(publisher.clone()))).await;
    let body = webhook_body(vec![alert("HighCPU", "warning", "firing", "host1")]);

    let response = reqwest::Client::new()
        .post(server.url("/webhook"))
        .json(&body)
        .send()
        .await
        .unwrap();

    let json: Value = response.json().await.unwrap();
    assert_eq!(json["notifications_sent"], json!(["slack"]));
    assert!(publisher.published().is_empty());

    server.stop().await;
}

#[tokio::test]
async fn test_empty_batch_makes_no_outbound_calls() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock)
        .await;

    let publisher = MockPublisher::default();
    let server = start_server(&config_for_mock(&mock.uri()), Some(Arc::new(publisher.clone()))).await;

    let response = reqwest::Client::new()
        .post(server.url("/webhook"))
        .json(&webhook_body(Vec::new()))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["message"], "Successfully processed 0 alerts");
    assert_eq!(json["processed_alerts"], 0);
    assert!(publisher.published().is_empty());

    server.stop().await;
}

#[tokio::test]
async fn test_malformed_body_returns_500_without_dispatch() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock)
        .await;

    let server = start_server(&config_for_mock(&mock.uri()), Some(Arc::new(MockPublisher::default()))).await;

    let response = reqwest::Client::new()
        .post(server.url("/webhook"))
        .header("content-type", "application/json")
        .body("{this is not json")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["message"], "Failed to process webhook");
    assert!(json["error"].as_str().unwrap().contains("invalid JSON"));

    server.stop().await;
}

#[tokio::test]
async fn test_body_envelope_is_unwrapped() {
    let mock = MockServer::start().await;
    mount_ok(&mock, "/slack", 1).await;

    let mut config = config_for_mock(&mock.uri());
    config.email.enabled = false;
    config.discord.enabled = false;
    config.teams.enabled = false;
    config.pagerduty.enabled = false;

    let server = start_server(&config, None).await;
    let inner = webhook_body(vec![alert("HighCPU", "critical", "firing", "host1")]);
    let envelope = json!({"body": inner.to_string()});

    let response = reqwest::Client::new()
        .post(server.url("/webhook"))
        .json(&envelope)
        .send()
        .await
        .unwrap();

    let json: Value = response.json().await.unwrap();
    assert_eq!(json["processed_alerts"], 1);
    assert_eq!(json["notifications_sent"], json!(["slack"]));

    server.stop().await;
}

#[tokio::test]
async fn test_health_and_disabled_metrics_routes() {
    let mock = MockServer::start().await;
    let server = start_server(&config_for_mock(&mock.uri()), None).await;
    let client = reqwest::Client::new();

    let health = client.get(server.url("/health")).send().await.unwrap();
    assert_eq!(health.status(), 200);
    assert_eq!(health.text().await.unwrap(), "ok");

    let metrics = client.get(server.url("/metrics")).send().await.unwrap();
    assert_eq!(metrics.status(), 404);

    server.stop().await;
}
