use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use udp_capture::{load_table_specs, CaptureEngine};
use udp_cloud::GcsObjectStore;
use udp_config::{ConfigStore, Options, Schedule};
use udp_daemon::{init_logging, Args, Lifecycle};
use udp_model::Namespace;
use udp_source_db::PostgresSourceDb;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging("capture");

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

    let mut tables_config = ConfigStore::new();
    tables_config
        .load(&config_dir.join(format!("{}.tables", args.project)))
        .with_context(|| format!("loading table config for project {}", args.project))?;
    let tables = load_table_specs(&tables_config);

    let options = Options::new("capture").with_project_options(config.get("project", "options").unwrap_or(""));
    let batch_size: usize = options.get("batch_size", "1000000").parse().unwrap_or(1_000_000);
    let fast_forward_increment = options
        .get("fast_forward_increment", "")
        .parse::<i64>()
        .ok()
        .map(chrono::Duration::seconds);
    let poll_frequency: u64 = options.get("poll_frequency", "60").parse().unwrap_or(60);

    let namespace = Namespace::new(args.project.clone());

    let dsn = config
        .get("database", "dsn")
        .context("project config is missing [database] dsn")?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(dsn)
        .await
        .context("connecting to source database")?;
    let source_db = Arc::new(PostgresSourceDb::new(pool));

    let bucket = config
        .get("cloud", "capture_bucket")
        .context("project config is missing [cloud] capture_bucket")?;
    let object_store = Arc::new(GcsObjectStore::new(bucket).await?);

    let engine = CaptureEngine::new(
        "capture",
        namespace,
        source_db,
        object_store,
        args.state_dir.clone(),
        batch_size,
        args.notransfer,
        fast_forward_increment,
    );

    let schedule = Schedule {
        poll_frequency: Some(std::time::Duration::from_secs(poll_frequency)),
        ..Schedule::new()
    };

    let mut lifecycle = Lifecycle::new(&args.state_dir, "capture");
    lifecycle
        .run(&args, &schedule, || async { engine.run_job(&tables).await.map_err(anyhow::Error::from) })
        .await
}
