mod convert;
mod ddl;
mod tiberius_store;
mod types;

use async_trait::async_trait;
use serde_json::Value;
use udp_model::{StageArrivalRow, StatRow, TableSchema};

pub use convert::convert_row;
pub use ddl::{render_create_table, target_column_names, EXTENDED_COLUMNS};
pub use tiberius_store::TiberiusWarehouseDb;
pub use types::{is_nvarchar, translate_type};

#[derive(Debug, thiserror::Error)]
pub enum WarehouseError {
    #[error("warehouse connection failed: {0}")]
    Connect(#[source] std::io::Error),
    #[error(transparent)]
    Tiberius(#[from] tiberius::error::Error),
    #[error(transparent)]
    InvalidIdent(#[from] udp_cdc::InvalidIdent),
    #[error(transparent)]
    Render(#[from] udp_cdc::RenderError),
    #[error("warehouse query returned no rows")]
    NoResult,
}

/// The target-warehouse collaborator the stage loader applies archived
/// bundles against: schema/table DDL, bulk insert, CDC merge execution, and
/// the `stage_arrival_queue`/`stage_pending_queue`/`stat_log` catalog tables.
#[async_trait]
pub trait WarehouseDb: Send + Sync {
    async fn ensure_schema(&self, schema: &str) -> Result<(), WarehouseError>;
    async fn table_exists(&self, schema: &str, table: &str) -> Result<bool, WarehouseError>;
    async fn create_table(&self, schema: &str, table: &str, source_schema: &TableSchema) -> Result<(), WarehouseError>;
    async fn drop_table(&self, schema: &str, table: &str) -> Result<(), WarehouseError>;
    async fn bulk_insert(&self, schema: &str, table: &str, columns: &[String], rows: &[Vec<Value>]) -> Result<(), WarehouseError>;
    async fn execute_merge(&self, sql: &str) -> Result<(), WarehouseError>;
    async fn insert_stat_rows(&self, rows: &[StatRow]) -> Result<(), WarehouseError>;

    /// Inserts an arrival row. A conflicting insert (the bundle name already
    /// present, e.g. after redelivery following a successful prior copy) is
    /// treated as success, not an error.
    async fn insert_stage_arrival(&self, namespace: &str, row: &StageArrivalRow) -> Result<(), WarehouseError>;

    /// The next bundle Stage is allowed to apply: the oldest arrival whose
    /// name matches its namespace's pending entry, or whose `job_id` is `1`
    /// when no pending entry exists yet.
    async fn next_ready_bundle(&self) -> Result<Option<(String, StageArrivalRow)>, WarehouseError>;

    /// Clears the completed bundle from both queues and registers the next
    /// expected bundle name for `namespace`.
    async fn advance_stage_queue(&self, namespace: &str, completed_archive_file_name: &str, next_archive_file_name: &str) -> Result<(), WarehouseError>;
}
