use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use sqlx::{PgPool, Row};
use udp_model::{Column, TableSchema};

use crate::row::row_to_json;
use crate::{RowStream, SourceDb, SourceDbError};

pub struct PostgresSourceDb {
    pool: PgPool,
}

impl PostgresSourceDb {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SourceDb for PostgresSourceDb {
    async fn current_timestamp(&self) -> Result<DateTime<Utc>, SourceDbError> {
        let row = sqlx::query("select current_timestamp as \"now\"").fetch_one(&self.pool).await?;
        Ok(row.try_get::<DateTime<Utc>, _>("now")?)
    }

    async fn discover_schema(&self, schema: &str, table: &str) -> Result<TableSchema, SourceDbError> {
        let rows = sqlx::query(
            r#"
            select
                column_name,
                data_type,
                is_nullable = 'YES' as is_nullable,
                character_maximum_length,
                numeric_precision,
                numeric_scale,
                datetime_precision
            from information_schema.columns
            where table_schema = $1 and table_name = $2
            order by ordinal_position
            "#,
        )
        .bind(schema)
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Err(SourceDbError::TableNotFound {
                schema: schema.to_string(),
                table: table.to_string(),
            });
        }

        let mut table_schema = TableSchema::default();
        for row in rows {
            let column_name: String = row.try_get("column_name")?;
            let mut column = Column::new(&column_name, row.try_get("data_type")?);
            column.is_nullable = row.try_get("is_nullable")?;
            column.character_maximum_length = row.try_get("character_maximum_length")?;
            column.numeric_precision = row.try_get("numeric_precision")?;
            column.numeric_scale = row.try_get("numeric_scale")?;
            column.datetime_precision = row.try_get("datetime_precision")?;
            table_schema.columns.insert(column_name, column);
        }
        Ok(table_schema)
    }

    async fn discover_primary_key(&self, schema: &str, table: &str) -> Result<Vec<String>, SourceDbError> {
        let rows = sqlx::query(
            r#"
            select a.attname as column_name
            from pg_index i
            join pg_attribute a on a.attrelid = i.indrelid and a.attnum = any(i.indkey)
            where i.indrelid = format('%I.%I', $1::text, $2::text)::regclass
              and i.indisprimary
            order by array_position(i.indkey, a.attnum)
            "#,
        )
        .bind(schema)
        .bind(table)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|row| row.try_get::<String, _>("column_name").map_err(SourceDbError::from))
            .collect()
    }

    fn stream_rows<'a>(&'a self, sql: &'a str) -> RowStream<'a> {
        sqlx::query(sql)
            .fetch(&self.pool)
            .map(|result| result.map(|row| row_to_json(&row).as_object().cloned().unwrap_or_default()).map_err(SourceDbError::from))
            .boxed()
    }
}
