/// A decoded object-store-change notification as delivered by a queue message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectStoreNotification {
    pub objectstore_name: String,
    pub object_key: String,
    pub message_id: String,
}

impl ObjectStoreNotification {
    pub fn basename(&self) -> &str {
        self.object_key.rsplit('/').next().unwrap_or(&self.object_key)
    }

    pub fn is_capture_state(&self) -> bool {
        self.basename() == "capture_state.zip"
    }
}
