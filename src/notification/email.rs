//! Plain-text email rendering, delivered through an SNS topic.

use crate::config::EmailConfig;
use crate::core::{AlertBatch, AlertRecord, BatchCounts, Channel, Notifier};
use crate::formatting::{alert_emoji, format_key_values, format_timestamp, TIMESTAMP_FORMAT};
use crate::notification::sns::TopicPublisher;
use crate::notification::{NotifyError, RenderPath};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, instrument};

/// A rendered email, ready to publish.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub subject: String,
    pub body: String,
}

/// Renders the detailed email for a single alert.
pub fn render_single(alert: &AlertRecord, external_url: &str, now: DateTime<Utc>) -> EmailMessage {
    let name = alert.alert_name();
    let severity = alert.severity();
    let status = alert.status_str();
    let emoji = alert_emoji(severity, status);

    let subject = format!(
        "{} Prometheus Alert: {} ({})",
        emoji,
        name,
        severity.to_uppercase()
    );

    let started = format_timestamp(alert.starts_at());
    let ended = match alert.ends_at() {
        Some(ends_at) => format_timestamp(Some(ends_at)),
        None => "Ongoing".to_string(),
    };

    let body = format!(
        r#"
{emoji} PROMETHEUS ALERT {emoji}

Alert: {name}
Status: {status}
Severity: {severity}
Instance: {instance}
Job: {job}

Summary: {summary}
Description: {description}

Timeline:
Started: {started}
Ended: {ended}

Labels:
{labels}

Annotations:
{annotations}

Generator URL: {generator_url}
External URL: {external_url}

---
This alert was relayed from Prometheus Alertmanager
Timestamp: {generated}
"#,
        status = status.to_uppercase(),
        severity = severity.to_uppercase(),
        instance = alert.instance(),
        job = alert.job(),
        summary = alert.summary(),
        description = alert.description(),
        labels = format_key_values(&alert.labels),
        annotations = format_key_values(&alert.annotations),
        generator_url = alert.generator_url().unwrap_or("N/A"),
        generated = now.format(TIMESTAMP_FORMAT),
    );

    EmailMessage { subject, body }
}

/// Renders one email summarizing every alert in the batch.
pub fn render_summary(
    alerts: &[AlertRecord],
    external_url: &str,
    now: DateTime<Utc>,
) -> EmailMessage {
    let counts = BatchCounts::from_alerts(alerts);

    let subject = format!(
        "🚨 Prometheus Alert Summary: {} alerts ({} critical, {} warning)",
        counts.total, counts.critical, counts.warning
    );

    let mut body = format!(
        r#"
🚨 PROMETHEUS ALERT SUMMARY 🚨

Total Alerts: {}
├── Critical: {}
├── Warning: {}
├── Firing: {}
└── Resolved: {}

Individual Alerts:
"#,
        counts.total, counts.critical, counts.warning, counts.firing, counts.resolved
    );

    for (i, alert) in alerts.iter().enumerate() {
        body.push_str(&format!(
            "\n{}. {} {}\n   Status: {} | Severity: {}\n   Instance: {}\n   Summary: {}\n",
            i + 1,
            alert_emoji(alert.severity(), alert.status_str()),
            alert.alert_name(),
            alert.status_str().to_uppercase(),
            alert.severity().to_uppercase(),
            alert.instance(),
            alert.summary(),
        ));
    }

    body.push_str(&format!(
        "\n---\nExternal URL: {}\nGenerated: {}\n",
        external_url,
        now.format(TIMESTAMP_FORMAT)
    ));

    EmailMessage { subject, body }
}

/// Publishes rendered emails to the configured SNS topic.
pub struct EmailNotifier {
    topic_arn: String,
    publisher: Arc<dyn TopicPublisher>,
}

impl EmailNotifier {
    pub fn new(config: &EmailConfig, publisher: Arc<dyn TopicPublisher>) -> Self {
        Self {
            topic_arn: config.topic_arn.clone(),
            publisher,
        }
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    #[instrument(skip_all, fields(channel = "email", alerts = batch.len()))]
    async fn notify(&self, batch: &AlertBatch) -> Result<(), NotifyError> {
        let message = match RenderPath::for_batch(batch) {
            RenderPath::Skip => return Ok(()),
            RenderPath::Single(alert) => render_single(alert, &batch.external_url, Utc::now()),
            RenderPath::Summary(alerts) => render_summary(alerts, &batch.external_url, Utc::now()),
        };

        self.publisher
            .publish(&self.topic_arn, &message.subject, &message.body)
            .await?;
        info!(subject = %message.subject, "Email notification published");
        Ok(())
    }
}
