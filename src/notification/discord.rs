//! Discord webhook embeds.

use crate::config::DiscordConfig;
use crate::core::{AlertBatch, AlertRecord, BatchCounts, Channel, Notifier};
use crate::formatting::{alert_emoji, discord_color, summary_lines};
use crate::notification::transport::WebhookSender;
use crate::notification::{NotifyError, RenderPath, FOOTER_TEXT, SUMMARY_TITLE};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument};

pub fn render_single(alert: &AlertRecord, config: &DiscordConfig, now: DateTime<Utc>) -> Value {
    let severity = alert.severity();
    let status = alert.status_str();

    json!({
        "username": config.username,
        "embeds": [
            {
                "title": format!("{} {}", alert_emoji(severity, status), alert.alert_name()),
                "description": alert.summary(),
                "color": discord_color(severity, status),
                "fields": [
                    {"name": "Status", "value": status.to_uppercase(), "inline": true},
                    {"name": "Severity", "value": severity.to_uppercase(), "inline": true},
                    {"name": "Instance", "value": alert.instance(), "inline": true},
                    {"name": "Job", "value": alert.job(), "inline": true}
                ],
                "footer": {"text": FOOTER_TEXT},
                "timestamp": now.to_rfc3339_opts(SecondsFormat::Secs, true)
            }
        ]
    })
}

/// Summary embeds carry the alert list in the description instead of fields.
pub fn render_summary(alerts: &[AlertRecord], config: &DiscordConfig, now: DateTime<Utc>) -> Value {
    let counts = BatchCounts::from_alerts(alerts);
    let headline_severity = if counts.critical > 0 { "critical" } else { "warning" };

    let description = format!(
        "**{} alerts active**\n🚨 {} critical\n⚠️ {} warning\n\n{}",
        counts.total,
        counts.critical,
        counts.warning,
        summary_lines(alerts).join("\n")
    );

    json!({
        "username": config.username,
        "embeds": [
            {
                "title": SUMMARY_TITLE,
                "description": description,
                "color": discord_color(headline_severity, "firing"),
                "footer": {"text": FOOTER_TEXT},
                "timestamp": now.to_rfc3339_opts(SecondsFormat::Secs, true)
            }
        ]
    })
}

pub struct DiscordNotifier {
    config: DiscordConfig,
    client: Arc<dyn WebhookSender>,
}

impl DiscordNotifier {
    pub fn new(config: DiscordConfig, client: Arc<dyn WebhookSender>) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    fn channel(&self) -> Channel {
        Channel::Discord
    }

    #[instrument(skip_all, fields(channel = "discord", alerts = batch.len()))]
    async fn notify(&self, batch: &AlertBatch) -> Result<(), NotifyError> {
        let payload = match RenderPath::for_batch(batch) {
            RenderPath::Skip => return Ok(()),
            RenderPath::Single(alert) => render_single(alert, &self.config, Utc::now()),
            RenderPath::Summary(alerts) => render_summary(alerts, &self.config, Utc::now()),
        };

        self.client.post_json(&self.config.webhook_url, &payload).await?;
        info!("Sent notification to Discord.");
        Ok(())
    }
}
