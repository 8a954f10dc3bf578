use anyhow::{Context, Result};
use axum::Router;
use lambda_runtime::{LambdaEvent, run, service_fn};
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use std::{fs, io::ErrorKind, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::{
    config::AppConfig,
    handlers::{LocalState, lambda_handler},
    services::{
        disk_store::DiskObjectStore, dynamodb_store::DynamoStore, object_source::S3ObjectSource,
        pipeline::IngestPipeline, sqlite_store::SqliteStore,
    },
};

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Parse config ---
    let cfg = AppConfig::from_env_and_args()?;

    // --- Logging setup ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if cfg.local {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    } else {
        // CloudWatch adds its own timestamps and does not render ANSI.
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .without_time()
            .init();
    }

    tracing::info!("Starting flashcard-ingest with config: {:?}", cfg);

    if cfg.local {
        serve_local(cfg).await
    } else {
        serve_lambda(cfg).await
    }
}

/// Lambda mode: S3 objects in, DynamoDB tables out.
async fn serve_lambda(cfg: AppConfig) -> Result<()> {
    let region = cfg.region.clone().context("AWS_REGION is not set")?;
    let aws = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(region))
        .load()
        .await;

    let objects = S3ObjectSource::new(aws_sdk_s3::Client::new(&aws));
    let tables = Arc::new(DynamoStore::new(
        aws_sdk_dynamodb::Client::new(&aws),
        cfg.metadata_table,
        cfg.detail_table,
    ));
    let pipeline = IngestPipeline::new(Arc::new(objects), tables.clone(), tables);
    tracing::debug!("initialized aws clients");

    let func = service_fn(move |event: LambdaEvent<Value>| {
        let pipeline = pipeline.clone();
        async move { lambda_handler::handler(pipeline, event).await }
    });

    run(func)
        .await
        .map_err(|err| anyhow::anyhow!("lambda runtime failed: {err}"))
}

/// Local mode: disk objects, SQLite tables, HTTP surface.
async fn serve_local(cfg: AppConfig) -> Result<()> {
    // --- Ensure storage directory exists ---
    if !Path::new(&cfg.storage_dir).exists() {
        fs::create_dir_all(&cfg.storage_dir)?;
        tracing::info!("Created storage directory at {}", cfg.storage_dir);
    }

    // --- Initialize SQLite connection ---
    let db_url = &cfg.database_url;
    let db_path = db_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("file:");
    tracing::debug!("Interpreted SQLite path => {}", db_path);

    let db_path_obj = Path::new(db_path);
    if let Some(parent) = db_path_obj.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
            tracing::info!("Created missing directory {:?}", parent);
        }
    }

    // SQLx refuses to open a missing file unless asked to create it.
    if !db_path_obj.exists() {
        match fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(db_path)
        {
            Ok(_) => tracing::debug!("Created database file {}", db_path),
            Err(e) => tracing::warn!("Failed to create database file manually: {}", e),
        }
    }

    let db = Arc::new(
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
            .with_context(|| format!("connecting to {db_url}"))?,
    );

    let store = SqliteStore::new(db, cfg.metadata_table.clone(), cfg.detail_table.clone());
    store.ensure_schema().await?;

    // --- Initialize pipeline ---
    let objects = DiskObjectStore::new(&cfg.storage_dir);
    let pipeline = IngestPipeline::new(
        Arc::new(objects.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
    );
    let state = LocalState {
        pipeline,
        objects,
        store,
    };

    // --- Build router ---
    let app: Router = routes::routes::routes().with_state(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
