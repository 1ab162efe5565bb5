//! Microsoft Teams connector cards.

use crate::config::TeamsConfig;
use crate::core::{AlertBatch, AlertRecord, BatchCounts, Channel, Notifier};
use crate::formatting::{alert_emoji, teams_color};
use crate::notification::transport::WebhookSender;
use crate::notification::{NotifyError, RenderPath, SUMMARY_TITLE};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument};

const CARD_TYPE: &str = "MessageCard";
const CARD_CONTEXT: &str = "http://schema.org/extensions";

pub fn render_single(alert: &AlertRecord) -> Value {
    let severity = alert.severity();
    let status = alert.status_str();

    json!({
        "@type": CARD_TYPE,
        "@context": CARD_CONTEXT,
        "themeColor": teams_color(severity, status),
        "title": format!("{} Prometheus Alert", alert_emoji(severity, status)),
        "summary": format!("{} - {}", alert.alert_name(), severity),
        "sections": [
            {
                "activityTitle": alert.alert_name(),
                "activitySubtitle": alert.summary(),
                "facts": [
                    {"name": "Status", "value": status.to_uppercase()},
                    {"name": "Severity", "value": severity.to_uppercase()},
                    {"name": "Instance", "value": alert.instance()},
                    {"name": "Job", "value": alert.job()}
                ]
            }
        ]
    })
}

/// The summary card only carries counts, never per-alert lines.
pub fn render_summary(alerts: &[AlertRecord]) -> Value {
    let counts = BatchCounts::from_alerts(alerts);
    let headline_severity = if counts.critical > 0 { "critical" } else { "warning" };

    json!({
        "@type": CARD_TYPE,
        "@context": CARD_CONTEXT,
        "themeColor": teams_color(headline_severity, "firing"),
        "title": SUMMARY_TITLE,
        "summary": format!("{} alerts active", counts.total),
        "sections": [
            {
                "activityTitle": format!("{} Alerts Active", counts.total),
                "activitySubtitle": format!(
                    "{} critical, {} warning",
                    counts.critical, counts.warning
                ),
                "facts": [
                    {"name": "Total Alerts", "value": counts.total.to_string()},
                    {"name": "Critical", "value": counts.critical.to_string()},
                    {"name": "Warning", "value": counts.warning.to_string()}
                ]
            }
        ]
    })
}

pub struct TeamsNotifier {
    config: TeamsConfig,
    client: Arc<dyn WebhookSender>,
}

impl TeamsNotifier {
    pub fn new(config: TeamsConfig, client: Arc<dyn WebhookSender>) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl Notifier for TeamsNotifier {
    fn channel(&self) -> Channel {
        Channel::Teams
    }

    #[instrument(skip_all, fields(channel = "teams", alerts = batch.len()))]
    async fn notify(&self, batch: &AlertBatch) -> Result<(), NotifyError> {
        let payload = match RenderPath::for_batch(batch) {
            RenderPath::Skip => return Ok(()),
            RenderPath::Single(alert) => render_single(alert),
            RenderPath::Summary(alerts) => render_summary(alerts),
        };

        self.client.post_json(&self.config.webhook_url, &payload).await?;
        info!("Sent notification to Teams.");
        Ok(())
    }
}
