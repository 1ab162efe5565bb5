//! A notifier for sending alerts to a Slack incoming webhook.

use crate::config::SlackConfig;
use crate::core::{AlertBatch, AlertRecord, BatchCounts, Channel, Notifier};
use crate::formatting::{alert_emoji, slack_color, summary_lines};
use crate::notification::transport::WebhookSender;
use crate::notification::{NotifyError, RenderPath, FOOTER_TEXT, SUMMARY_TITLE};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument};

/// Renders the attachment message for a single alert.
pub fn render_single(alert: &AlertRecord, config: &SlackConfig, now: DateTime<Utc>) -> Value {
    let severity = alert.severity();
    let status = alert.status_str();

    json!({
        "channel": config.channel,
        "username": config.username,
        "icon_emoji": ":warning:",
        "attachments": [
            {
                "color": slack_color(severity, status),
                "title": format!("{} {}", alert_emoji(severity, status), alert.alert_name()),
                "text": alert.summary(),
                "fields": [
                    {"title": "Status", "value": status.to_uppercase(), "short": true},
                    {"title": "Severity", "value": severity.to_uppercase(), "short": true},
                    {"title": "Instance", "value": alert.instance(), "short": true},
                    {"title": "Job", "value": alert.job(), "short": true}
                ],
                "footer": FOOTER_TEXT,
                "ts": now.timestamp()
            }
        ]
    })
}

/// Renders the summary attachment for several alerts.
pub fn render_summary(alerts: &[AlertRecord], config: &SlackConfig, now: DateTime<Utc>) -> Value {
    let counts = BatchCounts::from_alerts(alerts);
    let color = if counts.critical > 0 { "danger" } else { "warning" };

    json!({
        "channel": config.channel,
        "username": config.username,
        "icon_emoji": ":rotating_light:",
        "attachments": [
            {
                "color": color,
                "title": SUMMARY_TITLE,
                "text": format!(
                    "*{} alerts* ({} critical, {} warning, {} firing)",
                    counts.total, counts.critical, counts.warning, counts.firing
                ),
                "fields": [
                    {
                        "title": "Active Alerts",
                        "value": summary_lines(alerts).join("\n"),
                        "short": false
                    }
                ],
                "footer": FOOTER_TEXT,
                "ts": now.timestamp()
            }
        ]
    })
}

/// Posts rendered attachments to the configured Slack webhook.
pub struct SlackNotifier {
    config: SlackConfig,
    client: Arc<dyn WebhookSender>,
}

impl SlackNotifier {
    /// Creates a new `SlackNotifier`.
    pub fn new(config: SlackConfig, client: Arc<dyn WebhookSender>) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    fn channel(&self) -> Channel {
        Channel::Slack
    }

    /// Formats the batch and sends it to the configured Slack webhook.
    #[instrument(skip_all, fields(channel = "slack", alerts = batch.len()))]
    async fn notify(&self, batch: &AlertBatch) -> Result<(), NotifyError> {
        let payload = match RenderPath::for_batch(batch) {
            RenderPath::Skip => return Ok(()),
            RenderPath::Single(alert) => render_single(alert, &self.config, Utc::now()),
            RenderPath::Summary(alerts) => render_summary(alerts, &self.config, Utc::now()),
        };

        self.client.post_json(&self.config.webhook_url, &payload).await?;
        info!("Sent notification to Slack.");
        Ok(())
    }
}
