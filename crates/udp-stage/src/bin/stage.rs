use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use udp_cloud::GcsObjectStore;
use udp_config::{ConfigStore, Options, Schedule};
use udp_daemon::{init_logging, Args, Lifecycle};
use udp_stage::StageEngine;
use udp_warehouse_db::TiberiusWarehouseDb;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging("stage");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    let result = runtime.block_on(run(args));
    runtime.shutdown_background();
    result
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config_dir = PathBuf::from("config");

    let mut config = ConfigStore::new();
    let _ = config.load(&config_dir.join("project.ini"));
    config
        .load(&config_dir.join(format!("{}.ini", args.project)))
        .with_context(|| format!("loading config for project {}", args.project))?;

    let options = Options::new("stage").with_project_options(config.get("project", "options").unwrap_or(""));
    let poll_frequency: u64 = options.get("poll_frequency", "30").parse().unwrap_or(30);

    let archive_bucket = config
        .get("cloud", "archive_bucket")
        .context("project config is missing [cloud] archive_bucket")?;
    let archive_store = Arc::new(GcsObjectStore::new(archive_bucket).await?);

    let host = config.get("warehouse", "host").context("project config is missing [warehouse] host")?;
    let port: u16 = config.get("warehouse", "port").unwrap_or("1433").parse().unwrap_or(1433);
    let database = config
        .get("warehouse", "database")
        .context("project config is missing [warehouse] database")?;
    let user = config.get("warehouse", "user").context("project config is missing [warehouse] user")?;
    let password = config.get("warehouse", "password").context("project config is missing [warehouse] password")?;
    let catalog_schema = config.get("warehouse", "catalog_schema").unwrap_or("udp_catalog");

    let warehouse = Arc::new(TiberiusWarehouseDb::connect(host, port, database, user, password, catalog_schema).await?);

    let engine = StageEngine::new(archive_store, warehouse);

    let schedule = Schedule {
        poll_frequency: Some(std::time::Duration::from_secs(poll_frequency)),
        ..Schedule::new()
    };

    let mut lifecycle = Lifecycle::new(&args.state_dir, "stage");
    lifecycle
        .run(&args, &schedule, || async { engine.drain_ready().await.map(|_| ()).map_err(anyhow::Error::from) })
        .await
}
