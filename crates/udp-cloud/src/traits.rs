use async_trait::async_trait;
use bytes::Bytes;
use udp_model::ObjectStoreNotification;

#[derive(Debug, thiserror::Error)]
pub enum CloudError {
    #[error("object {0} not found")]
    NotFound(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// The bucket-shaped collaborator the capture engine writes bundles to and
/// the archive relay moves them out of. Implementations must make `put`
/// atomic from a reader's perspective: a key never observably holds a
/// partial object.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, body: Bytes) -> Result<(), CloudError>;
    async fn get(&self, key: &str) -> Result<Bytes, CloudError>;
    async fn delete(&self, key: &str) -> Result<(), CloudError>;
    async fn list(&self, prefix: &str) -> Result<Vec<String>, CloudError>;

    /// Moves `key` from `self` into `destination` under the same key,
    /// verifying the destination write before removing the source.
    async fn relocate(&self, key: &str, destination: &dyn ObjectStore) -> Result<(), CloudError> {
        let body = self.get(key).await?;
        destination.put(key, body).await?;
        self.delete(key).await
    }
}

/// The notification channel the capture engine signals on after each
/// successful bundle upload, and the archive relay drains in order to
/// discover work. One subscription is registered per namespace so that a
/// namespace's notifications are delivered independently of every other
/// namespace's backlog.
#[async_trait]
pub trait NotificationQueue: Send + Sync {
    async fn ensure_registered(&self, namespace: &str) -> Result<(), CloudError>;
    async fn publish(&self, namespace: &str, notification: &ObjectStoreNotification) -> Result<(), CloudError>;

    /// Pulls up to `max_messages` pending notifications for `namespace`
    /// without acknowledging them.
    async fn pull(&self, namespace: &str, max_messages: usize) -> Result<Vec<ObjectStoreNotification>, CloudError>;

    /// Acknowledges delivery so the notification is not redelivered. Callers
    /// must only ack after the corresponding effect (archive copy + catalog
    /// insert) has durably landed.
    async fn ack(&self, namespace: &str, message_id: &str) -> Result<(), CloudError>;
}
