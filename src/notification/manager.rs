//! The notification manager runs every enabled channel for a batch, one
//! after another in a fixed order, and folds the outcomes into a
//! [`DispatchResult`].

use crate::config::Config;
use crate::core::{AlertBatch, Channel, Notifier};
use crate::notification::discord::DiscordNotifier;
use crate::notification::email::EmailNotifier;
use crate::notification::pagerduty::PagerDutyNotifier;
use crate::notification::slack::SlackNotifier;
use crate::notification::sns::{SnsPublisher, TopicPublisher};
use crate::notification::teams::TeamsNotifier;
use crate::notification::transport::{WebhookClient, WebhookSender};
use crate::notification::NotifyError;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// The outcome of one dispatch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchResult {
    /// Channels whose send completed, in dispatch order.
    pub sent: Vec<Channel>,
    /// Channels that failed, with the error text.
    pub failed: Vec<(Channel, String)>,
}

/// Holds the constructed notifiers. Disabled channels are never built.
pub struct NotificationManager {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl NotificationManager {
    /// Creates a manager over the given notifiers, ordered by channel.
    pub fn new(mut notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        notifiers.sort_by_key(|notifier| notifier.channel());
        Self { notifiers }
    }

    /// Builds the active channels from `config` over the given transports.
    ///
    /// # Arguments
    /// * `sender` - Shared by the chat webhooks and PagerDuty.
    /// * `publisher` - Required by the email channel. Email is skipped when
    ///   it is `None`.
    pub fn from_config_with(
        config: &Config,
        sender: Arc<dyn WebhookSender>,
        publisher: Option<Arc<dyn TopicPublisher>>,
    ) -> Self {
        let mut notifiers: Vec<Arc<dyn Notifier>> = Vec::new();

        if config.email.is_active() {
            match publisher {
                Some(publisher) => {
                    notifiers.push(Arc::new(EmailNotifier::new(&config.email, publisher)))
                }
                None => warn!("Email is enabled but no topic publisher is available, skipping."),
            }
        } else {
            log_inactive(Channel::Email, config.email.enabled, "SNS topic ARN");
        }

        if config.slack.is_active() {
            notifiers.push(Arc::new(SlackNotifier::new(
                config.slack.clone(),
                sender.clone(),
            )));
        } else {
            log_inactive(Channel::Slack, config.slack.enabled, "webhook URL");
        }

        if config.discord.is_active() {
            notifiers.push(Arc::new(DiscordNotifier::new(
                config.discord.clone(),
                sender.clone(),
            )));
        } else {
            log_inactive(Channel::Discord, config.discord.enabled, "webhook URL");
        }

        if config.teams.is_active() {
            notifiers.push(Arc::new(TeamsNotifier::new(
                config.teams.clone(),
                sender.clone(),
            )));
        } else {
            log_inactive(Channel::Teams, config.teams.enabled, "webhook URL");
        }

        if config.pagerduty.is_active() {
            notifiers.push(Arc::new(PagerDutyNotifier::new(
                config.pagerduty.clone(),
                sender,
            )));
        } else {
            log_inactive(Channel::PagerDuty, config.pagerduty.enabled, "integration key");
        }

        Self::new(notifiers)
    }

    /// Builds the production transports and the active channels. The SNS
    /// client is only created when email is active.
    pub async fn from_config(config: &Config) -> Result<Self, NotifyError> {
        let sender: Arc<dyn WebhookSender> = Arc::new(WebhookClient::new(&config.http)?);
        let publisher: Option<Arc<dyn TopicPublisher>> = if config.email.is_active() {
            Some(Arc::new(SnsPublisher::new(config.email.region.clone()).await))
        } else {
            None
        };

        Ok(Self::from_config_with(config, sender, publisher))
    }

    /// The constructed channels, in dispatch order.
    pub fn channels(&self) -> Vec<Channel> {
        self.notifiers.iter().map(|n| n.channel()).collect()
    }

    /// Sends the batch to every channel. A failing channel is logged and
    /// never stops the channels after it.
    pub async fn dispatch(&self, batch: &AlertBatch) -> DispatchResult {
        let start = Instant::now();
        let mut result = DispatchResult::default();

        for notifier in &self.notifiers {
            let channel = notifier.channel();
            match notifier.notify(batch).await {
                Ok(()) => {
                    metrics::counter!("notifications_sent_total", "channel" => channel.as_str())
                        .increment(1);
                    result.sent.push(channel);
                }
                Err(e) => {
                    error!(channel = %channel, error = %e, "Error sending notification");
                    metrics::counter!("notifications_failed_total", "channel" => channel.as_str())
                        .increment(1);
                    result.failed.push((channel, e.to_string()));
                }
            }
        }

        metrics::histogram!("dispatch_duration_seconds").record(start.elapsed().as_secs_f64());
        debug!(
            sent = result.sent.len(),
            failed = result.failed.len(),
            "Dispatch finished"
        );
        result
    }
}

fn log_inactive(channel: Channel, enabled: bool, requirement: &str) {
    if enabled {
        warn!(channel = %channel, "Channel is enabled but has no {}, disabling.", requirement);
    } else {
        info!(channel = %channel, "Channel disabled.");
    }
}
