//! Database migrations infrastructure

use sqlx::postgres::PgPool;

use crate::domain::DomainError;

/// One versioned schema migration
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub up: &'static str,
    pub down: &'static str,
}

/// The catalog schema, in application order
pub fn catalog_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "catalog tables: buckets, workflows, revisions, owned entries",
        up: r#"
            CREATE TABLE IF NOT EXISTS buckets (
                id BIGSERIAL PRIMARY KEY,
                name VARCHAR(100) NOT NULL UNIQUE,
                owner VARCHAR(255) NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );

            CREATE TABLE IF NOT EXISTS workflows (
                id BIGSERIAL PRIMARY KEY,
                bucket_id BIGINT NOT NULL REFERENCES buckets(id) ON DELETE CASCADE,
                last_revision_number BIGINT NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_workflows_bucket ON workflows(bucket_id);

            CREATE TABLE IF NOT EXISTS workflow_revisions (
                id BIGSERIAL PRIMARY KEY,
                workflow_id BIGINT NOT NULL REFERENCES workflows(id) ON DELETE CASCADE,
                revision_number BIGINT NOT NULL,
                bucket_id BIGINT NOT NULL,
                name VARCHAR(255) NOT NULL,
                project_name VARCHAR(255) NOT NULL,
                layout TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                xml_payload BYTEA NOT NULL,
                UNIQUE (workflow_id, revision_number)
            );

            CREATE INDEX IF NOT EXISTS idx_revisions_name ON workflow_revisions(name);
            CREATE INDEX IF NOT EXISTS idx_revisions_project_name
                ON workflow_revisions(project_name);
            CREATE INDEX IF NOT EXISTS idx_revisions_workflow
                ON workflow_revisions(workflow_id);

            CREATE TABLE IF NOT EXISTS generic_information (
                id BIGSERIAL PRIMARY KEY,
                revision_id BIGINT NOT NULL
                    REFERENCES workflow_revisions(id) ON DELETE CASCADE,
                position INT NOT NULL,
                name VARCHAR(255) NOT NULL,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_generic_information_revision
                ON generic_information(revision_id);

            CREATE TABLE IF NOT EXISTS variables (
                id BIGSERIAL PRIMARY KEY,
                revision_id BIGINT NOT NULL
                    REFERENCES workflow_revisions(id) ON DELETE CASCADE,
                position INT NOT NULL,
                name VARCHAR(255) NOT NULL,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_variables_revision ON variables(revision_id);
        "#,
        down: r#"
            DROP TABLE IF EXISTS variables;
            DROP TABLE IF EXISTS generic_information;
            DROP TABLE IF EXISTS workflow_revisions;
            DROP TABLE IF EXISTS workflows;
            DROP TABLE IF EXISTS buckets;
        "#,
    }]
}

/// PostgreSQL migrator tracking applied versions in a `_migrations` table
#[derive(Debug)]
pub struct PostgresMigrator {
    pool: PgPool,
}

impl PostgresMigrator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the migrations table if it doesn't exist
    async fn ensure_migrations_table(&self) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version BIGINT PRIMARY KEY,
                description TEXT NOT NULL,
                installed_on TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to create migrations table: {}", e)))?;

        Ok(())
    }

    async fn is_applied(&self, version: i64) -> Result<bool, DomainError> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM _migrations WHERE version = $1)")
            .bind(version)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to check migration status: {}", e)))
    }

    /// Runs a single migration if it has not been applied yet
    pub async fn run_migration(&self, migration: &Migration) -> Result<(), DomainError> {
        self.ensure_migrations_table().await?;

        if self.is_applied(migration.version).await? {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            DomainError::storage(format!("Failed to start migration transaction: {}", e))
        })?;

        sqlx::raw_sql(migration.up)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to run migration {}: {}",
                    migration.version, e
                ))
            })?;

        sqlx::query("INSERT INTO _migrations (version, description) VALUES ($1, $2)")
            .bind(migration.version)
            .bind(migration.description)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to record migration {}: {}",
                    migration.version, e
                ))
            })?;

        tx.commit().await.map_err(|e| {
            DomainError::storage(format!(
                "Failed to commit migration {}: {}",
                migration.version, e
            ))
        })?;

        Ok(())
    }

    /// Reverts a single migration if it is currently applied
    pub async fn revert_migration(&self, migration: &Migration) -> Result<(), DomainError> {
        self.ensure_migrations_table().await?;

        if !self.is_applied(migration.version).await? {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            DomainError::storage(format!("Failed to start migration transaction: {}", e))
        })?;

        sqlx::raw_sql(migration.down)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to revert migration {}: {}",
                    migration.version, e
                ))
            })?;

        sqlx::query("DELETE FROM _migrations WHERE version = $1")
            .bind(migration.version)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to unrecord migration {}: {}",
                    migration.version, e
                ))
            })?;

        tx.commit().await.map_err(|e| {
            DomainError::storage(format!(
                "Failed to commit revert of migration {}: {}",
                migration.version, e
            ))
        })?;

        Ok(())
    }

    /// Runs every pending catalog migration in version order
    pub async fn run_all(&self) -> Result<(), DomainError> {
        for migration in catalog_migrations() {
            self.run_migration(&migration).await?;
        }

        Ok(())
    }

    /// Returns the latest applied migration version
    pub async fn version(&self) -> Result<Option<i64>, DomainError> {
        self.ensure_migrations_table().await?;

        sqlx::query_scalar("SELECT MAX(version) FROM _migrations")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to read migration version: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_migrations_are_ordered_and_unique() {
        let migrations = catalog_migrations();

        assert!(!migrations.is_empty());

        for window in migrations.windows(2) {
            assert!(window[0].version < window[1].version);
        }
    }

    #[test]
    fn test_catalog_schema_covers_all_tables() {
        let up = catalog_migrations()[0].up;

        for table in [
            "buckets",
            "workflows",
            "workflow_revisions",
            "generic_information",
            "variables",
        ] {
            assert!(up.contains(table), "schema missing table {}", table);
        }
    }
}
