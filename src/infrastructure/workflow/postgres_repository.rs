//! PostgreSQL workflow repository implementation
//!
//! Every operation runs as one transaction. Revision sequence numbers are
//! assigned by an `UPDATE … RETURNING` on the workflow row, whose row lock
//! serializes concurrent creators of the same workflow.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Row, Transaction};

use crate::domain::bucket::BucketId;
use crate::domain::page::{Page, Pagination, SortDirection, SortField, SortKey, SortSpec};
use crate::domain::query::{self, Attribute, CompareOp, PairKind, QueryExpression};
use crate::domain::workflow::{
    KeyValue, NewRevision, RevisionMetadata, WorkflowId, WorkflowRepository, WorkflowRevision,
};
use crate::domain::DomainError;

const METADATA_COLUMNS: &str = "r.id, r.workflow_id, r.revision_number, r.bucket_id, r.name, \
                                r.project_name, r.layout, r.created_at";

/// PostgreSQL implementation of WorkflowRepository
#[derive(Debug, Clone)]
pub struct PostgresWorkflowRepository {
    pool: PgPool,
}

impl PostgresWorkflowRepository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn ensure_bucket(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        bucket_id: BucketId,
    ) -> Result<(), DomainError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM buckets WHERE id = $1)")
                .bind(bucket_id.value())
                .fetch_one(&mut **tx)
                .await
                .map_err(|e| {
                    DomainError::storage(format!("Failed to check bucket existence: {}", e))
                })?;

        if !exists {
            return Err(DomainError::not_found(format!(
                "Bucket {} not found",
                bucket_id
            )));
        }

        Ok(())
    }

    /// Assign the next sequence number and insert the revision row plus its
    /// owned entries
    async fn insert_revision(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        bucket_id: BucketId,
        workflow_id: WorkflowId,
        content: NewRevision,
    ) -> Result<WorkflowRevision, DomainError> {
        // Row lock on the workflow serializes concurrent sequence assignment
        let revision_number: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE workflows
            SET last_revision_number = last_revision_number + 1
            WHERE id = $1 AND bucket_id = $2
            RETURNING last_revision_number
            "#,
        )
        .bind(workflow_id.value())
        .bind(bucket_id.value())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to assign revision number: {}", e)))?;

        let revision_number = revision_number.ok_or_else(|| {
            DomainError::not_found(format!(
                "Workflow {} not found in bucket {}",
                workflow_id, bucket_id
            ))
        })?;

        let row = sqlx::query(
            r#"
            INSERT INTO workflow_revisions
                (workflow_id, revision_number, bucket_id, name, project_name, layout, xml_payload)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, created_at
            "#,
        )
        .bind(workflow_id.value())
        .bind(revision_number)
        .bind(bucket_id.value())
        .bind(content.name())
        .bind(content.project_name())
        .bind(content.layout())
        .bind(content.xml_payload().as_ref())
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to insert revision: {}", e)))?;

        let id: i64 = row
            .try_get("id")
            .map_err(|e| DomainError::storage(format!("Failed to read revision row: {}", e)))?;
        let created_at: DateTime<Utc> = row
            .try_get("created_at")
            .map_err(|e| DomainError::storage(format!("Failed to read revision row: {}", e)))?;

        self.insert_entries(tx, id, "generic_information", content.generic_information())
            .await?;
        self.insert_entries(tx, id, "variables", content.variables())
            .await?;

        Ok(WorkflowRevision::new(
            id,
            workflow_id,
            revision_number,
            bucket_id,
            created_at,
            content,
        ))
    }

    async fn insert_entries(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        revision_id: i64,
        table: &str,
        entries: &[KeyValue],
    ) -> Result<(), DomainError> {
        for (position, entry) in entries.iter().enumerate() {
            let statement = format!(
                "INSERT INTO {} (revision_id, position, name, value) VALUES ($1, $2, $3, $4)",
                table
            );

            sqlx::query(&statement)
                .bind(revision_id)
                .bind(position as i32)
                .bind(&entry.name)
                .bind(&entry.value)
                .execute(&mut **tx)
                .await
                .map_err(|e| {
                    DomainError::storage(format!("Failed to insert {} entry: {}", table, e))
                })?;
        }

        Ok(())
    }

    /// Fetch the most recent full revision of a workflow inside a transaction
    async fn fetch_latest(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        bucket_id: BucketId,
        workflow_id: WorkflowId,
    ) -> Result<WorkflowRevision, DomainError> {
        let statement = format!(
            r#"
            SELECT {}, r.xml_payload
            FROM workflow_revisions r
            JOIN workflows w ON w.id = r.workflow_id
            WHERE w.id = $1 AND w.bucket_id = $2
            ORDER BY r.created_at DESC, r.revision_number DESC
            LIMIT 1
            "#,
            METADATA_COLUMNS
        );

        let row = sqlx::query(&statement)
            .bind(workflow_id.value())
            .bind(bucket_id.value())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get latest revision: {}", e)))?;

        let row = row.ok_or_else(|| {
            DomainError::not_found(format!(
                "Workflow {} not found in bucket {}",
                workflow_id, bucket_id
            ))
        })?;

        let mut metadata = row_to_metadata(&row)?;
        let payload: Vec<u8> = row
            .try_get("xml_payload")
            .map_err(|e| DomainError::storage(format!("Failed to read revision row: {}", e)))?;

        let mut entries = self.fetch_entries(tx, &[metadata.id]).await?;
        if let Some((generic_information, variables)) = entries.remove(&metadata.id) {
            metadata.generic_information = generic_information;
            metadata.variables = variables;
        }

        Ok(WorkflowRevision::from_metadata(metadata, Bytes::from(payload)))
    }

    /// Load owned entries for a set of revisions, keyed by revision id
    #[allow(clippy::type_complexity)]
    async fn fetch_entries(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        revision_ids: &[i64],
    ) -> Result<HashMap<i64, (Vec<KeyValue>, Vec<KeyValue>)>, DomainError> {
        let mut map: HashMap<i64, (Vec<KeyValue>, Vec<KeyValue>)> = HashMap::new();

        if revision_ids.is_empty() {
            return Ok(map);
        }

        for (table, pick_variables) in [("generic_information", false), ("variables", true)] {
            let statement = format!(
                "SELECT revision_id, name, value FROM {} WHERE revision_id = ANY($1) \
                 ORDER BY revision_id, position",
                table
            );

            let rows = sqlx::query(&statement)
                .bind(revision_ids)
                .fetch_all(&mut **tx)
                .await
                .map_err(|e| {
                    DomainError::storage(format!("Failed to load {} entries: {}", table, e))
                })?;

            for row in rows {
                let revision_id: i64 = row.try_get("revision_id").map_err(|e| {
                    DomainError::storage(format!("Failed to read {} row: {}", table, e))
                })?;
                let name: String = row.try_get("name").map_err(|e| {
                    DomainError::storage(format!("Failed to read {} row: {}", table, e))
                })?;
                let value: String = row.try_get("value").map_err(|e| {
                    DomainError::storage(format!("Failed to read {} row: {}", table, e))
                })?;

                let slot = map.entry(revision_id).or_default();
                if pick_variables {
                    slot.1.push(KeyValue::new(name, value));
                } else {
                    slot.0.push(KeyValue::new(name, value));
                }
            }
        }

        Ok(map)
    }

    async fn begin(&self) -> Result<Transaction<'_, Postgres>, DomainError> {
        self.pool
            .begin()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to start transaction: {}", e)))
    }

    async fn commit(&self, tx: Transaction<'_, Postgres>) -> Result<(), DomainError> {
        tx.commit()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to commit transaction: {}", e)))
    }
}

fn row_to_metadata(row: &sqlx::postgres::PgRow) -> Result<RevisionMetadata, DomainError> {
    let read_err = |e: sqlx::Error| DomainError::storage(format!("Failed to read revision row: {}", e));

    Ok(RevisionMetadata {
        id: row.try_get("id").map_err(read_err)?,
        workflow_id: WorkflowId::new(row.try_get("workflow_id").map_err(read_err)?),
        revision_number: row.try_get("revision_number").map_err(read_err)?,
        bucket_id: BucketId::new(row.try_get("bucket_id").map_err(read_err)?),
        name: row.try_get("name").map_err(read_err)?,
        project_name: row.try_get("project_name").map_err(read_err)?,
        layout: row.try_get("layout").map_err(read_err)?,
        created_at: row.try_get("created_at").map_err(read_err)?,
        generic_information: Vec::new(),
        variables: Vec::new(),
    })
}

/// Escape `\` and `_` so only `%` acts as a wildcard in LIKE patterns
fn escape_like(pattern: &str) -> String {
    pattern.replace('\\', "\\\\").replace('_', "\\_")
}

/// Append the SQL translation of a query expression to the builder
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, expr: &QueryExpression) {
    match expr {
        QueryExpression::Attribute {
            attribute,
            op,
            value,
        } => {
            let column = match attribute {
                Attribute::Name => "r.name",
                Attribute::ProjectName => "r.project_name",
            };

            builder.push(column);

            if query::is_pattern(value) {
                builder.push(match op {
                    CompareOp::Eq => " LIKE ",
                    CompareOp::Ne => " NOT LIKE ",
                });
                builder.push_bind(escape_like(value));
            } else {
                builder.push(match op {
                    CompareOp::Eq => " = ",
                    CompareOp::Ne => " <> ",
                });
                builder.push_bind(value.clone());
            }
        }
        QueryExpression::Pair { kind, name, value } => {
            let table = match kind {
                PairKind::Variable => "variables",
                PairKind::GenericInformation => "generic_information",
            };

            builder.push("EXISTS (SELECT 1 FROM ");
            builder.push(table);
            builder.push(" e WHERE e.revision_id = r.id AND e.name = ");
            builder.push_bind(name.clone());

            if query::is_pattern(value) {
                builder.push(" AND e.value LIKE ");
                builder.push_bind(escape_like(value));
            } else {
                builder.push(" AND e.value = ");
                builder.push_bind(value.clone());
            }

            builder.push(")");
        }
        QueryExpression::And(left, right) => {
            builder.push("(");
            push_filter(builder, left);
            builder.push(" AND ");
            push_filter(builder, right);
            builder.push(")");
        }
        QueryExpression::Or(left, right) => {
            builder.push("(");
            push_filter(builder, left);
            builder.push(" OR ");
            push_filter(builder, right);
            builder.push(")");
        }
    }
}

fn sort_column(key: SortKey) -> &'static str {
    match key {
        SortKey::Name => "r.name",
        SortKey::ProjectName => "r.project_name",
        SortKey::CreatedAt => "r.created_at",
        SortKey::RevisionNumber => "r.revision_number",
        SortKey::Id => "r.id",
    }
}

/// Append an ORDER BY clause: the requested fields (or descending creation
/// time by default) with a final `r.id` key so the order is total
fn push_order_by(builder: &mut QueryBuilder<'_, Postgres>, sort: &SortSpec) {
    builder.push(" ORDER BY ");

    if sort.is_empty() {
        builder.push("r.created_at DESC");
    } else {
        for (i, SortField { key, direction }) in sort.fields().iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            builder.push(sort_column(*key));
            builder.push(match direction {
                SortDirection::Ascending => " ASC",
                SortDirection::Descending => " DESC",
            });
        }
    }

    builder.push(", r.id ASC");
}

#[async_trait]
impl WorkflowRepository for PostgresWorkflowRepository {
    async fn create_workflow(
        &self,
        bucket_id: BucketId,
        content: NewRevision,
    ) -> Result<WorkflowRevision, DomainError> {
        let mut tx = self.begin().await?;

        self.ensure_bucket(&mut tx, bucket_id).await?;

        let workflow_id: i64 =
            sqlx::query_scalar("INSERT INTO workflows (bucket_id) VALUES ($1) RETURNING id")
                .bind(bucket_id.value())
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| DomainError::storage(format!("Failed to create workflow: {}", e)))?;

        let revision = self
            .insert_revision(&mut tx, bucket_id, WorkflowId::new(workflow_id), content)
            .await?;

        self.commit(tx).await?;

        Ok(revision)
    }

    async fn create_revision(
        &self,
        bucket_id: BucketId,
        workflow_id: WorkflowId,
        content: NewRevision,
    ) -> Result<WorkflowRevision, DomainError> {
        let mut tx = self.begin().await?;

        self.ensure_bucket(&mut tx, bucket_id).await?;

        let revision = self
            .insert_revision(&mut tx, bucket_id, workflow_id, content)
            .await?;

        self.commit(tx).await?;

        Ok(revision)
    }

    async fn get_latest(
        &self,
        bucket_id: BucketId,
        workflow_id: WorkflowId,
    ) -> Result<WorkflowRevision, DomainError> {
        let mut tx = self.begin().await?;

        self.ensure_bucket(&mut tx, bucket_id).await?;
        let revision = self.fetch_latest(&mut tx, bucket_id, workflow_id).await?;

        self.commit(tx).await?;

        Ok(revision)
    }

    async fn get_revision(
        &self,
        bucket_id: BucketId,
        workflow_id: WorkflowId,
        revision_number: i64,
    ) -> Result<WorkflowRevision, DomainError> {
        let mut tx = self.begin().await?;

        self.ensure_bucket(&mut tx, bucket_id).await?;

        let statement = format!(
            r#"
            SELECT {}, r.xml_payload
            FROM workflow_revisions r
            JOIN workflows w ON w.id = r.workflow_id
            WHERE w.id = $1 AND w.bucket_id = $2 AND r.revision_number = $3
            "#,
            METADATA_COLUMNS
        );

        let row = sqlx::query(&statement)
            .bind(workflow_id.value())
            .bind(bucket_id.value())
            .bind(revision_number)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get revision: {}", e)))?;

        let row = row.ok_or_else(|| {
            DomainError::not_found(format!(
                "Revision {} of workflow {} not found in bucket {}",
                revision_number, workflow_id, bucket_id
            ))
        })?;

        let mut metadata = row_to_metadata(&row)?;
        let payload: Vec<u8> = row
            .try_get("xml_payload")
            .map_err(|e| DomainError::storage(format!("Failed to read revision row: {}", e)))?;

        let mut entries = self.fetch_entries(&mut tx, &[metadata.id]).await?;
        if let Some((generic_information, variables)) = entries.remove(&metadata.id) {
            metadata.generic_information = generic_information;
            metadata.variables = variables;
        }

        self.commit(tx).await?;

        Ok(WorkflowRevision::from_metadata(metadata, Bytes::from(payload)))
    }

    async fn list_latest(
        &self,
        bucket_id: BucketId,
        filter: Option<&QueryExpression>,
        pagination: &Pagination,
        sort: &SortSpec,
    ) -> Result<Page<RevisionMetadata>, DomainError> {
        let mut tx = self.begin().await?;

        self.ensure_bucket(&mut tx, bucket_id).await?;

        // The latest revision is the one carrying the workflow's current
        // sequence number
        let from_clause = "FROM workflow_revisions r \
                           JOIN workflows w ON w.id = r.workflow_id \
                           AND w.last_revision_number = r.revision_number \
                           WHERE r.bucket_id = ";

        let mut count_builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT COUNT(*) {}", from_clause));
        count_builder.push_bind(bucket_id.value());

        if let Some(expr) = filter {
            count_builder.push(" AND (");
            push_filter(&mut count_builder, expr);
            count_builder.push(")");
        }

        let total_elements: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to count workflows: {}", e)))?;

        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT {} {}", METADATA_COLUMNS, from_clause));
        builder.push_bind(bucket_id.value());

        if let Some(expr) = filter {
            builder.push(" AND (");
            push_filter(&mut builder, expr);
            builder.push(")");
        }

        push_order_by(&mut builder, sort);

        builder.push(" LIMIT ");
        builder.push_bind(i64::from(pagination.size()));
        builder.push(" OFFSET ");
        builder.push_bind(pagination.offset() as i64);

        let rows = builder
            .build()
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to list workflows: {}", e)))?;

        let mut content = rows
            .iter()
            .map(row_to_metadata)
            .collect::<Result<Vec<_>, _>>()?;

        let revision_ids: Vec<i64> = content.iter().map(|m| m.id).collect();
        let mut entries = self.fetch_entries(&mut tx, &revision_ids).await?;

        for metadata in &mut content {
            if let Some((generic_information, variables)) = entries.remove(&metadata.id) {
                metadata.generic_information = generic_information;
                metadata.variables = variables;
            }
        }

        self.commit(tx).await?;

        Ok(Page::new(content, pagination, total_elements as u64))
    }

    async fn list_revisions(
        &self,
        bucket_id: BucketId,
        workflow_id: WorkflowId,
        pagination: &Pagination,
    ) -> Result<Page<RevisionMetadata>, DomainError> {
        let mut tx = self.begin().await?;

        self.ensure_bucket(&mut tx, bucket_id).await?;

        let workflow_exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM workflows WHERE id = $1 AND bucket_id = $2)",
        )
        .bind(workflow_id.value())
        .bind(bucket_id.value())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to check workflow existence: {}", e)))?;

        if !workflow_exists {
            return Err(DomainError::not_found(format!(
                "Workflow {} not found in bucket {}",
                workflow_id, bucket_id
            )));
        }

        let total_elements: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM workflow_revisions WHERE workflow_id = $1")
                .bind(workflow_id.value())
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| DomainError::storage(format!("Failed to count revisions: {}", e)))?;

        let statement = format!(
            r#"
            SELECT {}
            FROM workflow_revisions r
            WHERE r.workflow_id = $1
            ORDER BY r.created_at DESC, r.revision_number DESC
            LIMIT $2 OFFSET $3
            "#,
            METADATA_COLUMNS
        );

        let rows = sqlx::query(&statement)
            .bind(workflow_id.value())
            .bind(i64::from(pagination.size()))
            .bind(pagination.offset() as i64)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to list revisions: {}", e)))?;

        let mut content = rows
            .iter()
            .map(row_to_metadata)
            .collect::<Result<Vec<_>, _>>()?;

        let revision_ids: Vec<i64> = content.iter().map(|m| m.id).collect();
        let mut entries = self.fetch_entries(&mut tx, &revision_ids).await?;

        for metadata in &mut content {
            if let Some((generic_information, variables)) = entries.remove(&metadata.id) {
                metadata.generic_information = generic_information;
                metadata.variables = variables;
            }
        }

        self.commit(tx).await?;

        Ok(Page::new(content, pagination, total_elements as u64))
    }

    async fn delete_workflow(
        &self,
        bucket_id: BucketId,
        workflow_id: WorkflowId,
    ) -> Result<WorkflowRevision, DomainError> {
        let mut tx = self.begin().await?;

        self.ensure_bucket(&mut tx, bucket_id).await?;

        // Captured before the delete so the response can report it
        let latest = self.fetch_latest(&mut tx, bucket_id, workflow_id).await?;

        // Revisions and owned entries go with the workflow row (ON DELETE
        // CASCADE)
        let result = sqlx::query("DELETE FROM workflows WHERE id = $1 AND bucket_id = $2")
            .bind(workflow_id.value())
            .bind(bucket_id.value())
            .execute(&mut *tx)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to delete workflow: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!(
                "Workflow {} not found in bucket {}",
                workflow_id, bucket_id
            )));
        }

        self.commit(tx).await?;

        Ok(latest)
    }
}
