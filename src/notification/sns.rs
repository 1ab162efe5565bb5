//! Amazon SNS publisher used by the email channel.

use crate::notification::NotifyError;
use async_trait::async_trait;
use aws_sdk_sns as sns;
use tracing::{error, info};

/// A trait for publishing a subject/message pair to a pub/sub topic.
#[async_trait]
pub trait TopicPublisher: Send + Sync {
    async fn publish(&self, topic_arn: &str, subject: &str, message: &str)
        -> Result<(), NotifyError>;
}

/// SNS-backed [`TopicPublisher`].
pub struct SnsPublisher {
    client: sns::Client,
}

impl SnsPublisher {
    /// Builds a client from the default AWS credential and region chain.
    ///
    /// # Arguments
    /// * `region` - Overrides the region from the environment when set.
    pub async fn new(region: Option<String>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(sns::config::Region::new(region));
        }
        let aws_config = loader.load().await;

        Self {
            client: sns::Client::new(&aws_config),
        }
    }
}

#[async_trait]
impl TopicPublisher for SnsPublisher {
    async fn publish(
        &self,
        topic_arn: &str,
        subject: &str,
        message: &str,
    ) -> Result<(), NotifyError> {
        let output = self
            .client
            .publish()
            .topic_arn(topic_arn)
            .subject(subject)
            .message(message)
            .send()
            .await
            .map_err(|e| {
                let detail = sns::error::DisplayErrorContext(&e).to_string();
                error!(error = %detail, "Error sending SNS message");
                NotifyError::Publish(detail)
            })?;

        info!(
            message_id = output.message_id().unwrap_or_default(),
            "SNS message sent successfully"
        );
        Ok(())
    }
}
