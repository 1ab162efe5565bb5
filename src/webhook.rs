//! The webhook entry point: parse the inbound body, dispatch, build the
//! response envelope.

use crate::core::{AlertBatch, Channel};
use crate::notification::manager::NotificationManager;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info};

/// Errors that reject the whole invocation before any channel runs.
#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Parses a raw request body.
pub fn parse_payload(raw: &[u8]) -> Result<AlertBatch, PayloadError> {
    let value: Value = serde_json::from_slice(raw)?;
    parse_value(value)
}

/// Unwraps an optional `body` envelope, given either as a JSON string or as
/// an object, then reads the batch.
pub fn parse_value(value: Value) -> Result<AlertBatch, PayloadError> {
    let payload = match value {
        Value::Object(mut envelope) if envelope.contains_key("body") => {
            match envelope.remove("body") {
                Some(Value::String(text)) => serde_json::from_str(&text)?,
                Some(inner) => inner,
                None => Value::Object(envelope),
            }
        }
        other => other,
    };

    if !payload.is_object() {
        return Err(PayloadError::NotAnObject(json_type_name(&payload)));
    }
    Ok(serde_json::from_value(payload)?)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// The JSON body returned to the caller.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum WebhookResponse {
    Success {
        message: String,
        processed_alerts: usize,
        notifications_sent: Vec<Channel>,
    },
    Failure {
        error: String,
        message: String,
    },
}

impl WebhookResponse {
    pub fn success(processed_alerts: usize, notifications_sent: Vec<Channel>) -> Self {
        WebhookResponse::Success {
            message: format!("Successfully processed {} alerts", processed_alerts),
            processed_alerts,
            notifications_sent,
        }
    }

    pub fn failure(error: impl ToString) -> Self {
        WebhookResponse::Failure {
            error: error.to_string(),
            message: "Failed to process webhook".to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookResponse::Success { .. } => StatusCode::OK,
            WebhookResponse::Failure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebhookResponse {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut response = (status, Json(self)).into_response();
        response.headers_mut().insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
        response
    }
}

/// Handles one webhook invocation end to end. Never fails: a bad body
/// becomes a `Failure` response and channel errors only shrink
/// `notifications_sent`.
pub async fn process_webhook(raw: &[u8], manager: &NotificationManager) -> WebhookResponse {
    metrics::counter!("webhooks_received_total").increment(1);

    let batch = match parse_payload(raw) {
        Ok(batch) => batch,
        Err(e) => {
            error!(error = %e, "Error processing webhook");
            metrics::counter!("webhooks_rejected_total").increment(1);
            return WebhookResponse::failure(e);
        }
    };

    info!("Processing {} alerts across enabled channels", batch.len());
    metrics::counter!("alerts_processed_total").increment(batch.len() as u64);

    let result = manager.dispatch(&batch).await;
    WebhookResponse::success(batch.len(), result.sent)
}
