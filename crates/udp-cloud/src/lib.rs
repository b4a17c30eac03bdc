mod gcs;
mod pubsub;
mod traits;

pub use gcs::GcsObjectStore;
pub use pubsub::PubsubNotificationQueue;
pub use traits::{CloudError, NotificationQueue, ObjectStore};
