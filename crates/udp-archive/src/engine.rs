use std::sync::Arc;

use udp_cloud::{NotificationQueue, ObjectStore};
use udp_warehouse_db::WarehouseDb;

use crate::relay::{self, ArchiveError};

/// Drains one namespace's notification queue and relays every bundle it
/// names, matching `archive.py`'s daemon loop. A relay failure leaves the
/// notification unacknowledged for redelivery rather than failing the tick.
pub struct ArchiveEngine {
    namespace: String,
    capture_store: Arc<dyn ObjectStore>,
    archive_store: Arc<dyn ObjectStore>,
    notification_queue: Arc<dyn NotificationQueue>,
    warehouse: Arc<dyn WarehouseDb>,
}

impl ArchiveEngine {
    pub fn new(
        namespace: impl Into<String>,
        capture_store: Arc<dyn ObjectStore>,
        archive_store: Arc<dyn ObjectStore>,
        notification_queue: Arc<dyn NotificationQueue>,
        warehouse: Arc<dyn WarehouseDb>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            capture_store,
            archive_store,
            notification_queue,
            warehouse,
        }
    }

    pub async fn drain_once(&self, max_messages: usize) -> Result<usize, ArchiveError> {
        let notifications = self.notification_queue.pull(&self.namespace, max_messages).await?;
        let mut relayed = 0;
        for notification in notifications {
            match relay::relay_notification(
                &notification,
                self.capture_store.as_ref(),
                self.archive_store.as_ref(),
                self.warehouse.as_ref(),
            )
            .await
            {
                Ok(outcome) => {
                    self.notification_queue.ack(&self.namespace, &notification.message_id).await?;
                    relayed += 1;
                    tracing::info!(namespace = %self.namespace, message_id = %notification.message_id, ?outcome, "relayed notification");
                }
                Err(err) => {
                    tracing::error!(
                        namespace = %self.namespace,
                        message_id = %notification.message_id,
                        error = %err,
                        "failed to relay notification, leaving unacked for redelivery"
                    );
                }
            }
        }
        Ok(relayed)
    }
}
