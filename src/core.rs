//! Core domain types and service traits for alertrelay
//!
//! This module defines the alert model received from Alertmanager and the
//! trait contract every notification channel implements.

use crate::notification::NotifyError;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Labels and annotations, kept sorted by key so rendered output is stable.
pub type LabelSet = BTreeMap<String, String>;

pub const UNKNOWN: &str = "unknown";
pub const UNKNOWN_ALERT: &str = "Unknown Alert";
pub const NO_SUMMARY: &str = "No summary available";
pub const NO_DESCRIPTION: &str = "No description available";

/// Alertmanager reports this for alerts that have not ended yet.
const ZERO_TIME: &str = "0001-01-01T00:00:00Z";

/// Lifecycle state of an alert as reported upstream.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AlertStatus {
    Firing,
    Resolved,
    #[default]
    Unknown,
    /// Any other value, kept verbatim.
    Other(String),
}

impl AlertStatus {
    pub fn as_str(&self) -> &str {
        match self {
            AlertStatus::Firing => "firing",
            AlertStatus::Resolved => "resolved",
            AlertStatus::Unknown => UNKNOWN,
            AlertStatus::Other(value) => value,
        }
    }
}

impl From<&str> for AlertStatus {
    fn from(value: &str) -> Self {
        match value {
            "firing" => AlertStatus::Firing,
            "resolved" => AlertStatus::Resolved,
            "" | UNKNOWN => AlertStatus::Unknown,
            other => AlertStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AlertStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AlertStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value
            .as_deref()
            .map(AlertStatus::from)
            .unwrap_or_default())
    }
}

/// Treats an explicit JSON `null` the same as an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A single alert from an Alertmanager webhook.
///
/// Missing fields never fail deserialization. The accessors below apply the
/// placeholder for each absent label or annotation, so renderers never have
/// to pick their own defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub labels: LabelSet,
    #[serde(default, deserialize_with = "null_as_default")]
    pub annotations: LabelSet,
    #[serde(default)]
    pub status: AlertStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<String>,
    #[serde(
        rename = "generatorURL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub generator_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

impl AlertRecord {
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// Returns the label value, or `default` when the label is absent.
    pub fn label_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.label(key).unwrap_or(default)
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }

    pub fn alert_name(&self) -> &str {
        self.label_or("alertname", UNKNOWN_ALERT)
    }

    pub fn severity(&self) -> &str {
        self.label_or("severity", UNKNOWN)
    }

    pub fn instance(&self) -> &str {
        self.label_or("instance", UNKNOWN)
    }

    pub fn job(&self) -> &str {
        self.label_or("job", UNKNOWN)
    }

    pub fn summary(&self) -> &str {
        self.annotation("summary").unwrap_or(NO_SUMMARY)
    }

    pub fn description(&self) -> &str {
        self.annotation("description").unwrap_or(NO_DESCRIPTION)
    }

    pub fn status_str(&self) -> &str {
        self.status.as_str()
    }

    pub fn is_firing(&self) -> bool {
        self.status == AlertStatus::Firing
    }

    pub fn is_resolved(&self) -> bool {
        self.status == AlertStatus::Resolved
    }

    pub fn starts_at(&self) -> Option<&str> {
        self.starts_at.as_deref().filter(|ts| !ts.is_empty())
    }

    /// The end time, or `None` while the alert is still ongoing.
    pub fn ends_at(&self) -> Option<&str> {
        self.ends_at
            .as_deref()
            .filter(|ts| !ts.is_empty() && *ts != ZERO_TIME)
    }

    pub fn generator_url(&self) -> Option<&str> {
        self.generator_url.as_deref().filter(|url| !url.is_empty())
    }
}

/// The unit of work for one webhook invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AlertBatch {
    #[serde(default, deserialize_with = "null_as_default")]
    pub alerts: Vec<AlertRecord>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub group_labels: LabelSet,
    #[serde(default, deserialize_with = "null_as_default")]
    pub common_labels: LabelSet,
    #[serde(default, deserialize_with = "null_as_default")]
    pub common_annotations: LabelSet,
    #[serde(rename = "externalURL", default, deserialize_with = "null_as_default")]
    pub external_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl AlertBatch {
    pub fn new(alerts: Vec<AlertRecord>, external_url: impl Into<String>) -> Self {
        Self {
            alerts,
            external_url: external_url.into(),
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn counts(&self) -> BatchCounts {
        BatchCounts::from_alerts(&self.alerts)
    }
}

/// Aggregate counts used by the summary renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchCounts {
    pub total: usize,
    pub critical: usize,
    pub warning: usize,
    pub firing: usize,
    pub resolved: usize,
}

impl BatchCounts {
    pub fn from_alerts(alerts: &[AlertRecord]) -> Self {
        alerts.iter().fold(
            BatchCounts {
                total: alerts.len(),
                ..Default::default()
            },
            |mut counts, alert| {
                match alert.label("severity") {
                    Some("critical") => counts.critical += 1,
                    Some("warning") => counts.warning += 1,
                    _ => {}
                }
                match alert.status {
                    AlertStatus::Firing => counts.firing += 1,
                    AlertStatus::Resolved => counts.resolved += 1,
                    _ => {}
                }
                counts
            },
        )
    }
}

/// The downstream integrations, in dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Slack,
    Discord,
    Teams,
    PagerDuty,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::Email,
        Channel::Slack,
        Channel::Discord,
        Channel::Teams,
        Channel::PagerDuty,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Slack => "slack",
            Channel::Discord => "discord",
            Channel::Teams => "teams",
            Channel::PagerDuty => "pagerduty",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Service Traits
// =============================================================================

/// Delivers an alert batch to one downstream channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// The channel this notifier serves. Used for ordering, logging and
    /// metrics.
    fn channel(&self) -> Channel;

    /// Renders and sends the batch.
    ///
    /// # Returns
    /// * `Ok(())` once every outbound call for this batch returned
    /// * `Err` if rendering or any transport call failed
    async fn notify(&self, batch: &AlertBatch) -> Result<(), NotifyError>;
}
