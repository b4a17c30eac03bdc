use async_trait::async_trait;
use futures::lock::Mutex;
use futures::TryStreamExt;
use serde_json::Value;
use tiberius::{AuthMethod, Client, Config};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use udp_cdc::Ident;
use udp_model::{StageArrivalRow, StatRow};

use crate::ddl::render_create_table;
use crate::{WarehouseDb, WarehouseError};
use udp_model::TableSchema;

type TiberiusClient = Client<Compat<TcpStream>>;

/// A [`WarehouseDb`] backed by a single SQL Server connection, reconnected
/// lazily and held for the lifetime of one capture/stage job (see §5's
/// connection-lifecycle rule).
pub struct TiberiusWarehouseDb {
    client: Mutex<TiberiusClient>,
    catalog_schema: String,
}

impl TiberiusWarehouseDb {
    pub async fn connect(host: &str, port: u16, database: &str, user: &str, password: &str, catalog_schema: impl Into<String>) -> Result<Self, WarehouseError> {
        let mut config = Config::new();
        config.host(host);
        config.port(port);
        config.database(database);
        config.authentication(AuthMethod::sql_server(user, password));
        config.trust_cert();

        let tcp = TcpStream::connect(config.get_addr()).await.map_err(WarehouseError::Connect)?;
        tcp.set_nodelay(true).map_err(WarehouseError::Connect)?;
        let client = Client::connect(config, tcp.compat_write()).await?;

        Ok(Self {
            client: Mutex::new(client),
            catalog_schema: catalog_schema.into(),
        })
    }

    fn catalog_table(&self, name: &str) -> String {
        format!("{}.{name}", Ident::new(&self.catalog_schema).expect("catalog schema is a valid identifier"))
    }
}

fn sql_literal(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => {
            if *b {
                "1".to_string()
            } else {
                "0".to_string()
            }
        }
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        other => format!("'{}'", other.to_string().replace('\'', "''")),
    }
}

#[async_trait]
impl WarehouseDb for TiberiusWarehouseDb {
    async fn ensure_schema(&self, schema: &str) -> Result<(), WarehouseError> {
        let ident = Ident::new(schema).map_err(WarehouseError::InvalidIdent)?;
        let sql = format!(
            "if not exists (select 1 from sys.schemas where name = '{}') exec('create schema {ident}')",
            schema.replace('\'', "''"),
        );
        self.client.lock().await.execute(sql, &[]).await?;
        Ok(())
    }

    async fn table_exists(&self, schema: &str, table: &str) -> Result<bool, WarehouseError> {
        let schema_ident = Ident::new(schema).map_err(WarehouseError::InvalidIdent)?;
        let table_ident = Ident::new(table).map_err(WarehouseError::InvalidIdent)?;
        let sql = format!(
            "select case when object_id('{schema_ident}.{table_ident}', 'U') is not null then 1 else 0 end as \"exists\""
        );
        let mut stream = self.client.lock().await.query(sql, &[]).await?;
        let row = stream.try_next().await?.ok_or(WarehouseError::NoResult)?;
        let flag: i32 = row.get("exists").unwrap_or(0);
        Ok(flag == 1)
    }

    async fn create_table(&self, schema: &str, table: &str, source_schema: &TableSchema) -> Result<(), WarehouseError> {
        let sql = render_create_table(schema, table, source_schema)?;
        self.client.lock().await.execute(sql, &[]).await?;
        Ok(())
    }

    async fn drop_table(&self, schema: &str, table: &str) -> Result<(), WarehouseError> {
        let schema_ident = Ident::new(schema).map_err(WarehouseError::InvalidIdent)?;
        let table_ident = Ident::new(table).map_err(WarehouseError::InvalidIdent)?;
        let sql = format!("if object_id('{schema_ident}.{table_ident}', 'U') is not null drop table {schema_ident}.{table_ident}");
        self.client.lock().await.execute(sql, &[]).await?;
        Ok(())
    }

    async fn bulk_insert(&self, schema: &str, table: &str, columns: &[String], rows: &[Vec<Value>]) -> Result<(), WarehouseError> {
        if rows.is_empty() {
            return Ok(());
        }
        let schema_ident = Ident::new(schema).map_err(WarehouseError::InvalidIdent)?;
        let table_ident = Ident::new(table).map_err(WarehouseError::InvalidIdent)?;
        let column_idents: Vec<String> = columns
            .iter()
            .map(|c| Ident::new(c).map(|i| i.to_string()).map_err(WarehouseError::InvalidIdent))
            .collect::<Result<_, _>>()?;

        // SQL Server limits a single statement to 1,000 VALUES rows.
        const CHUNK_ROWS: usize = 1_000;
        let mut client = self.client.lock().await;
        for chunk in rows.chunks(CHUNK_ROWS) {
            let values = chunk
                .iter()
                .map(|row| format!("({})", row.iter().map(sql_literal).collect::<Vec<_>>().join(", ")))
                .collect::<Vec<_>>()
                .join(",\n  ");
            let sql = format!(
                "insert into {schema_ident}.{table_ident} ({})\nvalues\n  {values};",
                column_idents.join(", ")
            );
            client.execute(sql, &[]).await?;
        }
        Ok(())
    }

    async fn execute_merge(&self, sql: &str) -> Result<(), WarehouseError> {
        self.client.lock().await.execute(sql, &[]).await?;
        Ok(())
    }

    async fn insert_stat_rows(&self, rows: &[StatRow]) -> Result<(), WarehouseError> {
        if rows.is_empty() {
            return Ok(());
        }
        let table = self.catalog_table("stat_log");
        let mut client = self.client.lock().await;
        for row in rows {
            let script_instance = match &row.script_instance {
                Some(s) => format!("'{}'", s.replace('\'', "''")),
                None => "null".to_string(),
            };
            let sql = format!(
                "insert into {table} (script_name, script_version, script_instance, server_name, account_name, namespace, job_id, stat_name, stat_type, start_time, end_time, run_time, row_count, data_size)\nvalues ('{}', '{}', {}, '{}', '{}', '{}', {}, '{}', '{}', '{}', '{}', {}, {}, {});",
                row.script_name.replace('\'', "''"),
                row.script_version.replace('\'', "''"),
                script_instance,
                row.server_name.replace('\'', "''"),
                row.account_name.replace('\'', "''"),
                row.namespace.replace('\'', "''"),
                row.job_id,
                row.stat_name.replace('\'', "''"),
                row.stat_type.replace('\'', "''"),
                row.start_time.format("%Y-%m-%d %H:%M:%S%.f"),
                row.end_time.format("%Y-%m-%d %H:%M:%S%.f"),
                row.run_time,
                row.row_count,
                row.data_size,
            );
            client.execute(sql, &[]).await?;
        }
        Ok(())
    }

    async fn insert_stage_arrival(&self, namespace: &str, row: &StageArrivalRow) -> Result<(), WarehouseError> {
        let table = self.catalog_table("stage_arrival_queue");
        let file_name = row.archive_file_name.replace('\'', "''");
        let sql = format!(
            "if not exists (select 1 from {table} where archive_file_name = '{file_name}')\n  insert into {table} (archive_file_name, namespace, job_id) values ('{file_name}', '{}', {});",
            namespace.replace('\'', "''"),
            row.job_id,
        );
        self.client.lock().await.execute(sql, &[]).await?;
        Ok(())
    }

    async fn next_ready_bundle(&self) -> Result<Option<(String, StageArrivalRow)>, WarehouseError> {
        let arrival = self.catalog_table("stage_arrival_queue");
        let pending = self.catalog_table("stage_pending_queue");
        let sql = format!(
            "select top 1 a.archive_file_name, a.namespace, a.job_id\n             from {arrival} a\n             left join {pending} p on p.namespace = a.namespace\n             where (p.archive_file_name is null and a.job_id = 1)\n                or (p.archive_file_name = a.archive_file_name)\n             order by a.job_id asc"
        );
        let mut stream = self.client.lock().await.query(sql, &[]).await?;
        let Some(row) = stream.try_next().await? else {
            return Ok(None);
        };
        let archive_file_name: &str = row.get("archive_file_name").ok_or(WarehouseError::NoResult)?;
        let namespace: &str = row.get("namespace").ok_or(WarehouseError::NoResult)?;
        let job_id: i64 = row.get("job_id").ok_or(WarehouseError::NoResult)?;
        Ok(Some((
            namespace.to_string(),
            StageArrivalRow {
                archive_file_name: archive_file_name.to_string(),
                job_id,
            },
        )))
    }

    async fn advance_stage_queue(&self, namespace: &str, completed_archive_file_name: &str, next_archive_file_name: &str) -> Result<(), WarehouseError> {
        let arrival = self.catalog_table("stage_arrival_queue");
        let pending = self.catalog_table("stage_pending_queue");
        let mut client = self.client.lock().await;

        let completed = completed_archive_file_name.replace('\'', "''");
        client
            .execute(format!("delete from {arrival} where archive_file_name = '{completed}';"), &[])
            .await?;
        client
            .execute(format!("delete from {pending} where namespace = '{}';", namespace.replace('\'', "''")), &[])
            .await?;
        client
            .execute(
                format!(
                    "insert into {pending} (namespace, archive_file_name) values ('{}', '{}');",
                    namespace.replace('\'', "''"),
                    next_archive_file_name.replace('\'', "''"),
                ),
                &[],
            )
            .await?;
        Ok(())
    }
}
