//! The HTTP transport shared by the chat webhooks and PagerDuty.

use crate::config::HttpConfig;
use crate::notification::NotifyError;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Only this many characters of a target URL are logged. Webhook URLs carry
/// their credentials in the path.
const LOGGED_URL_CHARS: usize = 50;

/// A trait for clients that can POST a JSON payload.
#[async_trait]
pub trait WebhookSender: Send + Sync {
    /// Sends `payload` to `url` as `application/json`.
    async fn post_json(&self, url: &str, payload: &Value) -> Result<(), NotifyError>;
}

/// A `reqwest`-backed [`WebhookSender`].
pub struct WebhookClient {
    client: reqwest::Client,
    fail_on_error_status: bool,
}

impl WebhookClient {
    /// Creates a new `WebhookClient` with the configured request timeout.
    pub fn new(config: &HttpConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            fail_on_error_status: config.fail_on_error_status,
        })
    }
}

fn redact_url(url: &str) -> String {
    let mut shown: String = url.chars().take(LOGGED_URL_CHARS).collect();
    if url.chars().count() > LOGGED_URL_CHARS {
        shown.push_str("...");
    }
    shown
}

#[async_trait]
impl WebhookSender for WebhookClient {
    async fn post_json(&self, url: &str, payload: &Value) -> Result<(), NotifyError> {
        let response = self.client.post(url).json(payload).send().await;

        match response {
            Ok(res) => {
                let status = res.status();
                if status.is_success() {
                    debug!(url = %redact_url(url), status = %status, "HTTP request sent");
                    return Ok(());
                }

                let body = res.text().await.unwrap_or_default();
                if self.fail_on_error_status {
                    error!(
                        url = %redact_url(url),
                        status = %status,
                        body = %body,
                        "Endpoint rejected notification"
                    );
                    return Err(NotifyError::Status {
                        status: status.as_u16(),
                        body,
                    });
                }

                // The request itself completed, so the channel still counts as sent.
                warn!(
                    url = %redact_url(url),
                    status = %status,
                    body = %body,
                    "Endpoint returned a non-success status"
                );
                Ok(())
            }
            Err(e) => {
                error!(url = %redact_url(url), error = %e, "HTTP request failed");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn http_config(fail_on_error_status: bool) -> HttpConfig {
        HttpConfig {
            timeout_seconds: 5,
            fail_on_error_status,
        }
    }

    #[tokio::test]
    async fn test_post_json_success() {
        // Arrange
        let server = MockServer::start().await;
        let payload = json!({ "text": "hello" });

        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(header("content-type", "application/json"))
            .and(body_json(&payload))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = WebhookClient::new(&http_config(false)).unwrap();

        // Act
        let result = client
            .post_json(&format!("{}/hook", server.uri()), &payload)
            .await;

        // Assert
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_error_status_still_counts_as_sent_by_default() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = WebhookClient::new(&http_config(false)).unwrap();
        let result = client.post_json(&server.uri(), &json!({})).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_error_status_fails_when_configured() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_payload"))
            .mount(&server)
            .await;

        let client = WebhookClient::new(&http_config(true)).unwrap();
        let result = client.post_json(&server.uri(), &json!({})).await;

        match result {
            Err(NotifyError::Status { status, body }) => {
                assert_eq!(status, 400);
                assert_eq!(body, "invalid_payload");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_handles_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let client = WebhookClient::new(&HttpConfig {
            timeout_seconds: 1,
            fail_on_error_status: false,
        })
        .unwrap();
        let result = client.post_json(&server.uri(), &json!({})).await;

        match result {
            Err(NotifyError::Http(e)) => assert!(e.is_timeout(), "expected timeout, got {}", e),
            other => panic!("expected HTTP error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_an_error() {
        let client = WebhookClient::new(&http_config(false)).unwrap();
        // Port 9 (discard) on localhost is not listening in test environments.
        let result = client.post_json("http://127.0.0.1:9/hook", &json!({})).await;
        assert!(matches!(result, Err(NotifyError::Http(_))));
    }

    #[test]
    fn test_redact_url() {
        assert_eq!(redact_url("http://short"), "http://short");
        let long = format!("https://hooks.slack.com/services/{}", "X".repeat(40));
        let shown = redact_url(&long);
        assert!(shown.ends_with("..."));
        assert_eq!(shown.chars().count(), 53);
    }
}
