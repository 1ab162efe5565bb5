//! Handles the dispatching of alerts to various notification channels.
//!
//! Each channel lives in its own module and pairs a pure renderer with a
//! [`Notifier`](crate::core::Notifier) implementation that sends the rendered
//! payload. Transports sit behind traits ([`transport::WebhookSender`] and
//! [`sns::TopicPublisher`]) so the channels can be exercised without the
//! network. The [`manager::NotificationManager`] runs every enabled channel
//! for a batch and isolates their failures from each other.
pub mod discord;
pub mod email;
pub mod manager;
pub mod pagerduty;
pub mod slack;
pub mod sns;
pub mod teams;
pub mod transport;

use crate::core::{AlertBatch, AlertRecord};
use thiserror::Error;

/// Footer shown on every chat message.
pub const FOOTER_TEXT: &str = "Prometheus Alert Manager";

/// Title used by every summary message.
pub const SUMMARY_TITLE: &str = "🚨 Prometheus Alert Summary";

/// Errors local to a single channel. They never abort other channels.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to publish to topic: {0}")]
    Publish(String),

    #[error("{failed} of {total} events failed to send")]
    Partial { failed: usize, total: usize },
}

/// Which rendering a mail or chat channel produces for a batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderPath<'a> {
    /// Empty batch: nothing is sent.
    Skip,
    /// Exactly one alert: the detailed view.
    Single(&'a AlertRecord),
    /// More than one alert: the aggregated view.
    Summary(&'a [AlertRecord]),
}

impl<'a> RenderPath<'a> {
    pub fn for_batch(batch: &'a AlertBatch) -> Self {
        match batch.alerts.as_slice() {
            [] => RenderPath::Skip,
            [alert] => RenderPath::Single(alert),
            alerts => RenderPath::Summary(alerts),
        }
    }
}
