use async_trait::async_trait;
use gcloud_pubsub::client::{Client, ClientConfig};
use gcloud_pubsub::publisher::PublisherConfig;
use gcloud_pubsub::subscription::SubscriptionConfig;
use std::collections::HashMap;
use std::time::Duration;
use udp_model::ObjectStoreNotification;

use crate::traits::{CloudError, NotificationQueue};

/// A [`NotificationQueue`] where each namespace gets its own topic and
/// pull subscription, registered lazily on first use.
pub struct PubsubNotificationQueue {
    client: Client,
    topic_prefix: String,
}

impl PubsubNotificationQueue {
    pub async fn new(topic_prefix: impl Into<String>) -> Result<Self, CloudError> {
        let config = ClientConfig::default()
            .with_auth()
            .await
            .map_err(|err| CloudError::Other(anyhow::anyhow!(err)))?;
        Ok(Self {
            client: Client::new(config)
                .await
                .map_err(|err| CloudError::Other(anyhow::anyhow!(err)))?,
            topic_prefix: topic_prefix.into(),
        })
    }

    fn topic_id(&self, namespace: &str) -> String {
        format!("{}-{namespace}", self.topic_prefix)
    }

    fn subscription_id(&self, namespace: &str) -> String {
        format!("{}-{namespace}-archive", self.topic_prefix)
    }
}

#[async_trait]
impl NotificationQueue for PubsubNotificationQueue {
    async fn ensure_registered(&self, namespace: &str) -> Result<(), CloudError> {
        let topic = self.client.topic(&self.topic_id(namespace));
        if !topic
            .exists(None)
            .await
            .map_err(|err| CloudError::Other(anyhow::anyhow!(err)))?
        {
            topic
                .create(None, None)
                .await
                .map_err(|err| CloudError::Other(anyhow::anyhow!(err)))?;
        }

        let subscription = self.client.subscription(&self.subscription_id(namespace));
        if !subscription
            .exists(None)
            .await
            .map_err(|err| CloudError::Other(anyhow::anyhow!(err)))?
        {
            subscription
                .create(topic.fully_qualified_name(), SubscriptionConfig::default(), None)
                .await
                .map_err(|err| CloudError::Other(anyhow::anyhow!(err)))?;
        }
        Ok(())
    }

    async fn publish(&self, namespace: &str, notification: &ObjectStoreNotification) -> Result<(), CloudError> {
        let topic = self.client.topic(&self.topic_id(namespace));
        let publisher = topic.new_publisher(Some(PublisherConfig::default()));
        let payload = serde_json::to_vec(notification).map_err(|err| CloudError::Other(err.into()))?;
        let mut message = gcloud_pubsub::publisher::PubsubMessage {
            data: payload,
            ..Default::default()
        };
        message.attributes = HashMap::new();
        let awaiter = publisher.publish(message).await;
        awaiter
            .get(None)
            .await
            .map_err(|err| CloudError::Other(anyhow::anyhow!(err)))?;
        Ok(())
    }

    async fn pull(&self, namespace: &str, max_messages: usize) -> Result<Vec<ObjectStoreNotification>, CloudError> {
        let subscription = self.client.subscription(&self.subscription_id(namespace));
        let received = subscription
            .pull(max_messages as i32, Some(Duration::from_secs(10)))
            .await
            .map_err(|err| CloudError::Other(anyhow::anyhow!(err)))?;
        let mut notifications = Vec::with_capacity(received.len());
        for message in received {
            let notification: ObjectStoreNotification =
                serde_json::from_slice(&message.message.data).map_err(|err| CloudError::Other(err.into()))?;
            notifications.push(notification);
        }
        Ok(notifications)
    }

    async fn ack(&self, namespace: &str, message_id: &str) -> Result<(), CloudError> {
        let subscription = self.client.subscription(&self.subscription_id(namespace));
        subscription
            .ack(vec![message_id.to_string()])
            .await
            .map_err(|err| CloudError::Other(anyhow::anyhow!(err)))?;
        Ok(())
    }
}
