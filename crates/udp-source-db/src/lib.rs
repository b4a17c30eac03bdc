mod postgres;
mod row;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde_json::Map;
use udp_model::TableSchema;

pub use postgres::PostgresSourceDb;

#[derive(Debug, thiserror::Error)]
pub enum SourceDbError {
    #[error("table {schema}.{table} was not found in the source database")]
    TableNotFound { schema: String, table: String },
    #[error(transparent)]
    Query(#[from] sqlx::Error),
}

pub type RowStream<'a> = BoxStream<'a, Result<Map<String, serde_json::Value>, SourceDbError>>;

/// The source-side collaborator the capture engine reads against: a single
/// transactional view of `current_timestamp`, catalog discovery for a
/// table's columns and primary key, and streamed execution of a rendered
/// CDC select.
#[async_trait]
pub trait SourceDb: Send + Sync {
    async fn current_timestamp(&self) -> Result<DateTime<Utc>, SourceDbError>;
    async fn discover_schema(&self, schema: &str, table: &str) -> Result<TableSchema, SourceDbError>;
    async fn discover_primary_key(&self, schema: &str, table: &str) -> Result<Vec<String>, SourceDbError>;
    fn stream_rows<'a>(&'a self, sql: &'a str) -> RowStream<'a>;
}
