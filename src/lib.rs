//! Workflow Catalog API
//!
//! A CRUD REST service storing versioned workflow documents (XML payloads
//! plus extracted metadata) organized into buckets:
//! - immutable revisions with per-workflow sequence numbers
//! - listing with query expressions, multi-field sort and pagination
//! - single-document and ZIP archive import/export

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use tracing::info;

use api::state::AppState;
use infrastructure::bucket::PostgresBucketRepository;
use infrastructure::services::{BucketService, WorkflowService};
use infrastructure::storage::{PostgresConfig, PostgresMigrator, StorageType};
use infrastructure::workflow::PostgresWorkflowRepository;

/// Create the application state with all services initialized
pub async fn create_app_state() -> anyhow::Result<AppState> {
    create_app_state_with_config(&AppConfig::default()).await
}

/// Create the application state with custom configuration
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let storage_backend =
        StorageType::from_str(&config.storage.backend).unwrap_or(StorageType::InMemory);

    info!("Storage backend: {:?}", storage_backend);

    match storage_backend {
        StorageType::Postgres => {
            let database_url = std::env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

            info!("Connecting to PostgreSQL...");
            let pool = PostgresConfig::new(database_url)
                .with_max_connections(config.storage.max_connections)
                .with_min_connections(config.storage.min_connections)
                .with_connect_timeout(config.storage.connect_timeout_secs)
                .with_idle_timeout(config.storage.idle_timeout_secs)
                .connect()
                .await?;
            info!("PostgreSQL connection established");

            PostgresMigrator::new(pool.clone()).run_all().await?;

            let bucket_repository = Arc::new(PostgresBucketRepository::new(pool.clone()));
            let workflow_repository = Arc::new(PostgresWorkflowRepository::new(pool));

            Ok(AppState {
                bucket_service: Arc::new(BucketService::new(bucket_repository)),
                workflow_service: Arc::new(WorkflowService::new(workflow_repository)),
            })
        }
        StorageType::InMemory => {
            info!("Using in-memory storage");
            Ok(AppState::in_memory())
        }
    }
}
