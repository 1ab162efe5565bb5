//! PagerDuty Events API v2.
//!
//! Unlike the chat channels, PagerDuty never summarizes. Every alert becomes
//! its own event, sent in input order, and resolved alerts close the incident
//! opened under the same dedup key.

use crate::config::PagerDutyConfig;
use crate::core::{AlertBatch, AlertRecord, Channel, LabelSet, Notifier};
use crate::notification::transport::WebhookSender;
use crate::notification::NotifyError;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

const DEFAULT_COMPONENT: &str = "prometheus";
const EVENT_CLASS: &str = "prometheus-alert";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventAction {
    Trigger,
    Resolve,
}

/// An Events v2 enqueue request.
#[derive(Debug, Serialize)]
pub struct PagerDutyEvent<'a> {
    pub routing_key: &'a str,
    pub event_action: EventAction,
    pub dedup_key: String,
    pub payload: EventPayload<'a>,
}

#[derive(Debug, Serialize)]
pub struct EventPayload<'a> {
    pub summary: String,
    pub severity: &'a str,
    pub source: &'a str,
    pub component: &'a str,
    pub group: &'a str,
    pub class: &'static str,
    pub custom_details: CustomDetails<'a>,
}

#[derive(Debug, Serialize)]
pub struct CustomDetails<'a> {
    pub labels: &'a LabelSet,
    pub annotations: &'a LabelSet,
    pub generator_url: &'a str,
    pub external_url: &'a str,
}

/// The correlation key shared by an alert's trigger and resolve events.
pub fn dedup_key(alert: &AlertRecord) -> String {
    format!("{}_{}", alert.alert_name(), alert.instance())
}

pub fn render_event<'a>(
    alert: &'a AlertRecord,
    external_url: &'a str,
    config: &'a PagerDutyConfig,
) -> PagerDutyEvent<'a> {
    let event_action = if alert.is_resolved() {
        EventAction::Resolve
    } else {
        EventAction::Trigger
    };

    PagerDutyEvent {
        routing_key: &config.integration_key,
        event_action,
        dedup_key: dedup_key(alert),
        payload: EventPayload {
            summary: format!("{}: {}", alert.alert_name(), alert.summary()),
            severity: config.map_severity(alert.severity()),
            source: alert.instance(),
            component: alert.label_or("job", DEFAULT_COMPONENT),
            group: alert.label_or("alertname", DEFAULT_COMPONENT),
            class: EVENT_CLASS,
            custom_details: CustomDetails {
                labels: &alert.labels,
                annotations: &alert.annotations,
                generator_url: alert.generator_url().unwrap_or_default(),
                external_url,
            },
        },
    }
}

pub struct PagerDutyNotifier {
    config: PagerDutyConfig,
    client: Arc<dyn WebhookSender>,
}

impl PagerDutyNotifier {
    pub fn new(config: PagerDutyConfig, client: Arc<dyn WebhookSender>) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl Notifier for PagerDutyNotifier {
    fn channel(&self) -> Channel {
        Channel::PagerDuty
    }

    /// Sends one event per alert. A failed event is logged and the remaining
    /// alerts are still attempted.
    #[instrument(skip_all, fields(channel = "pagerduty", alerts = batch.len()))]
    async fn notify(&self, batch: &AlertBatch) -> Result<(), NotifyError> {
        let mut failed = 0;

        for alert in &batch.alerts {
            let event = render_event(alert, &batch.external_url, &self.config);
            let payload = serde_json::to_value(&event)?;

            match self.client.post_json(&self.config.events_url, &payload).await {
                Ok(()) => debug!(
                    dedup_key = %event.dedup_key,
                    action = ?event.event_action,
                    "Sent PagerDuty event"
                ),
                Err(e) => {
                    error!(dedup_key = %event.dedup_key, error = %e, "Failed to send PagerDuty event");
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            return Err(NotifyError::Partial {
                failed,
                total: batch.len(),
            });
        }

        info!("Sent {} event(s) to PagerDuty.", batch.len());
        Ok(())
    }
}
