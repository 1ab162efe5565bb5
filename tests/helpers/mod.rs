//! Shared fixtures for the integration tests.

#![allow(dead_code)]

pub mod mock_publisher;

use alertrelay::config::{Config, HttpConfig};
use alertrelay::notification::manager::NotificationManager;
use alertrelay::notification::sns::TopicPublisher;
use alertrelay::notification::transport::WebhookClient;
use alertrelay::server::{AppState, WebhookServer};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// A webhook server bound to an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Signals shutdown and waits for the server task to finish.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        self.handle.await.unwrap();
    }
}

/// Builds a manager from `config` with the real HTTP transport and the given
/// publisher, then serves it.
pub async fn start_server(config: &Config, publisher: Option<Arc<dyn TopicPublisher>>) -> TestServer {
    let sender = Arc::new(WebhookClient::new(&config.http).unwrap());
    let manager = NotificationManager::from_config_with(config, sender, publisher);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let state = AppState {
        manager: Arc::new(manager),
        prom_handle: None,
    };
    let server = WebhookServer::new(listener, state, shutdown_rx);
    let addr = server.local_addr().unwrap();
    let handle = tokio::spawn(server.run());

    TestServer {
        addr,
        shutdown_tx,
        handle,
    }
}

/// A config with every channel pointed at `base_url` and enabled.
pub fn config_for_mock(base_url: &str) -> Config {
    let mut config = Config::default();
    config.http = HttpConfig {
        timeout_seconds: 2,
        fail_on_error_status: false,
    };
    config.email.enabled = true;
    config.email.topic_arn = "arn:aws:sns:us-east-1:123456789012:alerts".to_string();
    config.slack.enabled = true;
    config.slack.webhook_url = format!("{}/slack", base_url);
    config.discord.enabled = true;
    config.discord.webhook_url = format!("{}/discord", base_url);
    config.teams.enabled = true;
    config.teams.webhook_url = format!("{}/teams", base_url);
    config.pagerduty.enabled = true;
    config.pagerduty.integration_key = "test-routing-key".to_string();
    config.pagerduty.events_url = format!("{}/v2/enqueue", base_url);
    config
}

/// An Alertmanager alert object.
pub fn alert(name: &str, severity: &str, status: &str, instance: &str) -> Value {
    json!({
        "status": status,
        "labels": {
            "alertname": name,
            "severity": severity,
            "instance": instance,
            "job": "node"
        },
        "annotations": {
            "summary": format!("{} on {}", name, instance)
        },
        "startsAt": "2024-03-01T07:55:00Z",
        "endsAt": "0001-01-01T00:00:00Z",
        "generatorURL": "http://prometheus:9090/graph"
    })
}

/// An Alertmanager webhook body wrapping `alerts`.
pub fn webhook_body(alerts: Vec<Value>) -> Value {
    json!({
        "version": "4",
        "status": "firing",
        "receiver": "relay",
        "groupLabels": {},
        "commonLabels": {},
        "commonAnnotations": {},
        "externalURL": "http://alertmanager:9093",
        "alerts": alerts
    })
}
