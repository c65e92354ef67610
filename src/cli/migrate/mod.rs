//! Migrate command - applies pending schema migrations and exits

use tracing::info;

use crate::config::AppConfig;
use crate::infrastructure::logging;
use crate::infrastructure::storage::{PostgresConfig, PostgresMigrator};

/// Apply all pending migrations against `DATABASE_URL`
pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().unwrap_or_default();
    logging::init_logging(&config.logging);

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

    let pool = PostgresConfig::new(database_url)
        .with_max_connections(config.storage.max_connections)
        .with_min_connections(config.storage.min_connections)
        .with_connect_timeout(config.storage.connect_timeout_secs)
        .with_idle_timeout(config.storage.idle_timeout_secs)
        .connect()
        .await?;

    let migrator = PostgresMigrator::new(pool);
    migrator.run_all().await?;

    let version = migrator.version().await?;
    info!(version = ?version, "Migrations applied");

    Ok(())
}
