//! PostgreSQL bucket repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::domain::bucket::{Bucket, BucketId, BucketRepository, NewBucket};
use crate::domain::DomainError;

/// PostgreSQL implementation of BucketRepository
#[derive(Debug, Clone)]
pub struct PostgresBucketRepository {
    pool: PgPool,
}

impl PostgresBucketRepository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_bucket(row: &sqlx::postgres::PgRow) -> Result<Bucket, DomainError> {
    let id: i64 = row
        .try_get("id")
        .map_err(|e| DomainError::storage(format!("Failed to read bucket row: {}", e)))?;
    let name: String = row
        .try_get("name")
        .map_err(|e| DomainError::storage(format!("Failed to read bucket row: {}", e)))?;
    let owner: String = row
        .try_get("owner")
        .map_err(|e| DomainError::storage(format!("Failed to read bucket row: {}", e)))?;
    let created_at: DateTime<Utc> = row
        .try_get("created_at")
        .map_err(|e| DomainError::storage(format!("Failed to read bucket row: {}", e)))?;

    Ok(Bucket::new(BucketId::new(id), name, owner, created_at))
}

#[async_trait]
impl BucketRepository for PostgresBucketRepository {
    async fn create(&self, bucket: NewBucket) -> Result<Bucket, DomainError> {
        let row = sqlx::query(
            r#"
            INSERT INTO buckets (name, owner)
            VALUES ($1, $2)
            RETURNING id, name, owner, created_at
            "#,
        )
        .bind(bucket.name())
        .bind(bucket.owner())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            let msg = e.to_string();

            if msg.contains("duplicate key") || msg.contains("unique constraint") {
                DomainError::conflict(format!("Bucket '{}' already exists", bucket.name()))
            } else {
                DomainError::storage(format!("Failed to create bucket: {}", e))
            }
        })?;

        row_to_bucket(&row)
    }

    async fn get(&self, id: BucketId) -> Result<Option<Bucket>, DomainError> {
        let row = sqlx::query("SELECT id, name, owner, created_at FROM buckets WHERE id = $1")
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get bucket: {}", e)))?;

        match row {
            Some(row) => Ok(Some(row_to_bucket(&row)?)),
            None => Ok(None),
        }
    }

    async fn list(&self, owner: Option<&str>) -> Result<Vec<Bucket>, DomainError> {
        let rows = match owner {
            Some(owner) => {
                sqlx::query(
                    r#"
                    SELECT id, name, owner, created_at
                    FROM buckets
                    WHERE owner = $1
                    ORDER BY id
                    "#,
                )
                .bind(owner)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query("SELECT id, name, owner, created_at FROM buckets ORDER BY id")
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(|e| DomainError::storage(format!("Failed to list buckets: {}", e)))?;

        rows.iter().map(row_to_bucket).collect()
    }

    async fn exists(&self, id: BucketId) -> Result<bool, DomainError> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM buckets WHERE id = $1)")
            .bind(id.value())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to check bucket existence: {}", e)))
    }

    async fn ping(&self) -> Result<(), DomainError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Storage ping failed: {}", e)))?;

        Ok(())
    }
}
