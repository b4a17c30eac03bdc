mod bundle;
mod history;
mod job;
mod namespace;
mod notification;
mod schema;
mod stage_queue;
mod stats;
mod table;

pub use bundle::{batch_file_name, table_file_stem, TableManifest, JOB_LOG_FILE, LAST_JOB_LOG_FILE};
pub use history::{JobHistory, TableHistory};
pub use job::{bundle_name, capture_state_key, parse_bundle_name, JobId};
pub use namespace::Namespace;
pub use notification::ObjectStoreNotification;
pub use schema::{Column, TableSchema};
pub use stage_queue::{StageArrivalRow, StagePendingRow};
pub use stats::{Stat, StatRow, Stats};
pub use table::{Cdc, TableSpec};
