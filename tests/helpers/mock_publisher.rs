//! A mock topic publisher standing in for SNS.

use alertrelay::notification::sns::TopicPublisher;
use alertrelay::notification::NotifyError;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// A published `(subject, message)` pair.
pub type Published = (String, String);

#[derive(Clone, Debug, Default)]
pub struct MockPublisher {
    pub published: Arc<Mutex<Vec<Published>>>,
    pub fail: bool,
}

impl MockPublisher {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn published(&self) -> Vec<Published> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl TopicPublisher for MockPublisher {
    async fn publish(
        &self,
        _topic_arn: &str,
        subject: &str,
        message: &str,
    ) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::Publish("AuthorizationError".to_string()));
        }
        self.published
            .lock()
            .unwrap()
            .push((subject.to_string(), message.to_string()));
        Ok(())
    }
}
