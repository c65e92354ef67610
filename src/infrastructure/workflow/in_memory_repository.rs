//! In-memory workflow repository implementation
//!
//! Backs tests and local development. A single write lock spans each
//! creation, so revision sequence numbers are race-free by construction.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::domain::bucket::{BucketId, BucketRepository};
use crate::domain::page::{Page, Pagination, SortDirection, SortKey, SortSpec};
use crate::domain::query::QueryExpression;
use crate::domain::workflow::{
    NewRevision, RevisionMetadata, Workflow, WorkflowId, WorkflowRepository, WorkflowRevision,
};
use crate::domain::DomainError;
use crate::infrastructure::bucket::InMemoryBucketRepository;

#[derive(Debug, Clone)]
struct WorkflowRecord {
    workflow: Workflow,
    revisions: Vec<WorkflowRevision>,
}

#[derive(Debug, Default)]
struct WorkflowStore {
    workflows: BTreeMap<i64, WorkflowRecord>,
    next_workflow_id: i64,
    next_revision_id: i64,
}

/// In-memory implementation of WorkflowRepository
#[derive(Debug)]
pub struct InMemoryWorkflowRepository {
    buckets: Arc<InMemoryBucketRepository>,
    store: Arc<RwLock<WorkflowStore>>,
}

impl InMemoryWorkflowRepository {
    /// Create a repository validating bucket references against the given
    /// bucket store
    pub fn new(buckets: Arc<InMemoryBucketRepository>) -> Self {
        Self {
            buckets,
            store: Arc::new(RwLock::new(WorkflowStore::default())),
        }
    }

    async fn ensure_bucket(&self, bucket_id: BucketId) -> Result<(), DomainError> {
        if self.buckets.exists(bucket_id).await? {
            Ok(())
        } else {
            Err(DomainError::not_found(format!(
                "Bucket {} not found",
                bucket_id
            )))
        }
    }
}

/// Most recent revision of a record: greatest creation time, ties broken by
/// the greater sequence number
fn latest_of(record: &WorkflowRecord) -> Option<&WorkflowRevision> {
    record.revisions.iter().max_by(|a, b| {
        a.created_at()
            .cmp(&b.created_at())
            .then(a.revision_number().cmp(&b.revision_number()))
    })
}

fn compare_metadata(a: &RevisionMetadata, b: &RevisionMetadata, sort: &SortSpec) -> Ordering {
    if sort.is_empty() {
        // Default listing order: most recently created first
        return b
            .created_at
            .cmp(&a.created_at)
            .then(a.id.cmp(&b.id));
    }

    for field in sort.fields() {
        let ordering = match field.key {
            SortKey::Name => a.name.cmp(&b.name),
            SortKey::ProjectName => a.project_name.cmp(&b.project_name),
            SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            SortKey::RevisionNumber => a.revision_number.cmp(&b.revision_number),
            SortKey::Id => a.id.cmp(&b.id),
        };

        let ordering = match field.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        };

        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    // Final key keeps the order total across page boundaries
    a.id.cmp(&b.id)
}

fn slice_page(metadata: Vec<RevisionMetadata>, pagination: &Pagination) -> Page<RevisionMetadata> {
    let total_elements = metadata.len() as u64;

    let content = metadata
        .into_iter()
        .skip(pagination.offset() as usize)
        .take(pagination.size() as usize)
        .collect();

    Page::new(content, pagination, total_elements)
}

#[async_trait]
impl WorkflowRepository for InMemoryWorkflowRepository {
    async fn create_workflow(
        &self,
        bucket_id: BucketId,
        content: NewRevision,
    ) -> Result<WorkflowRevision, DomainError> {
        self.ensure_bucket(bucket_id).await?;

        let mut store = self.store.write().await;

        store.next_workflow_id += 1;
        let workflow_id = store.next_workflow_id;
        store.next_revision_id += 1;
        let revision_id = store.next_revision_id;

        let revision = WorkflowRevision::new(
            revision_id,
            WorkflowId::new(workflow_id),
            1,
            bucket_id,
            Utc::now(),
            content,
        );

        store.workflows.insert(
            workflow_id,
            WorkflowRecord {
                workflow: Workflow::new(WorkflowId::new(workflow_id), bucket_id, 1),
                revisions: vec![revision.clone()],
            },
        );

        Ok(revision)
    }

    async fn create_revision(
        &self,
        bucket_id: BucketId,
        workflow_id: WorkflowId,
        content: NewRevision,
    ) -> Result<WorkflowRevision, DomainError> {
        self.ensure_bucket(bucket_id).await?;

        let mut store = self.store.write().await;

        store.next_revision_id += 1;
        let revision_id = store.next_revision_id;

        let record = store
            .workflows
            .get_mut(&workflow_id.value())
            .filter(|record| record.workflow.bucket_id() == bucket_id)
            .ok_or_else(|| {
                DomainError::not_found(format!(
                    "Workflow {} not found in bucket {}",
                    workflow_id, bucket_id
                ))
            })?;

        let revision_number = record.workflow.advance_revision();

        let revision = WorkflowRevision::new(
            revision_id,
            workflow_id,
            revision_number,
            bucket_id,
            Utc::now(),
            content,
        );

        record.revisions.push(revision.clone());

        Ok(revision)
    }

    async fn get_latest(
        &self,
        bucket_id: BucketId,
        workflow_id: WorkflowId,
    ) -> Result<WorkflowRevision, DomainError> {
        self.ensure_bucket(bucket_id).await?;

        let store = self.store.read().await;

        store
            .workflows
            .get(&workflow_id.value())
            .filter(|record| record.workflow.bucket_id() == bucket_id)
            .and_then(latest_of)
            .cloned()
            .ok_or_else(|| {
                DomainError::not_found(format!(
                    "Workflow {} not found in bucket {}",
                    workflow_id, bucket_id
                ))
            })
    }

    async fn get_revision(
        &self,
        bucket_id: BucketId,
        workflow_id: WorkflowId,
        revision_number: i64,
    ) -> Result<WorkflowRevision, DomainError> {
        self.ensure_bucket(bucket_id).await?;

        let store = self.store.read().await;

        store
            .workflows
            .get(&workflow_id.value())
            .filter(|record| record.workflow.bucket_id() == bucket_id)
            .and_then(|record| {
                record
                    .revisions
                    .iter()
                    .find(|r| r.revision_number() == revision_number)
            })
            .cloned()
            .ok_or_else(|| {
                DomainError::not_found(format!(
                    "Revision {} of workflow {} not found in bucket {}",
                    revision_number, workflow_id, bucket_id
                ))
            })
    }

    async fn list_latest(
        &self,
        bucket_id: BucketId,
        filter: Option<&QueryExpression>,
        pagination: &Pagination,
        sort: &SortSpec,
    ) -> Result<Page<RevisionMetadata>, DomainError> {
        self.ensure_bucket(bucket_id).await?;

        let store = self.store.read().await;

        let mut metadata: Vec<RevisionMetadata> = store
            .workflows
            .values()
            .filter(|record| record.workflow.bucket_id() == bucket_id)
            .filter_map(latest_of)
            .filter(|revision| filter.is_none_or(|expr| expr.matches(revision)))
            .map(WorkflowRevision::metadata)
            .collect();

        metadata.sort_by(|a, b| compare_metadata(a, b, sort));

        Ok(slice_page(metadata, pagination))
    }

    async fn list_revisions(
        &self,
        bucket_id: BucketId,
        workflow_id: WorkflowId,
        pagination: &Pagination,
    ) -> Result<Page<RevisionMetadata>, DomainError> {
        self.ensure_bucket(bucket_id).await?;

        let store = self.store.read().await;

        let record = store
            .workflows
            .get(&workflow_id.value())
            .filter(|record| record.workflow.bucket_id() == bucket_id)
            .ok_or_else(|| {
                DomainError::not_found(format!(
                    "Workflow {} not found in bucket {}",
                    workflow_id, bucket_id
                ))
            })?;

        let mut metadata: Vec<RevisionMetadata> =
            record.revisions.iter().map(WorkflowRevision::metadata).collect();

        // History is served most recent first
        metadata.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.revision_number.cmp(&a.revision_number))
        });

        Ok(slice_page(metadata, pagination))
    }

    async fn delete_workflow(
        &self,
        bucket_id: BucketId,
        workflow_id: WorkflowId,
    ) -> Result<WorkflowRevision, DomainError> {
        self.ensure_bucket(bucket_id).await?;

        let mut store = self.store.write().await;

        let record = store
            .workflows
            .get(&workflow_id.value())
            .filter(|record| record.workflow.bucket_id() == bucket_id)
            .ok_or_else(|| {
                DomainError::not_found(format!(
                    "Workflow {} not found in bucket {}",
                    workflow_id, bucket_id
                ))
            })?;

        let latest = latest_of(record).cloned().ok_or_else(|| {
            DomainError::not_found(format!(
                "Workflow {} not found in bucket {}",
                workflow_id, bucket_id
            ))
        })?;

        // Owned revisions and entries go with the record
        store.workflows.remove(&workflow_id.value());

        Ok(latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bucket::NewBucket;
    use crate::domain::query::parse_query;
    use crate::domain::workflow::{KeyValue, ParsedWorkflow};
    use bytes::Bytes;

    async fn repo_with_bucket() -> (InMemoryWorkflowRepository, BucketId) {
        let buckets = Arc::new(InMemoryBucketRepository::new());
        let bucket = buckets
            .create(NewBucket::new("tools", "admin").unwrap())
            .await
            .unwrap();

        (InMemoryWorkflowRepository::new(buckets), bucket.id())
    }

    fn content(name: &str, project: &str) -> NewRevision {
        content_with_payload(name, project, b"<job/>".to_vec())
    }

    fn content_with_payload(name: &str, project: &str, payload: Vec<u8>) -> NewRevision {
        NewRevision::new(
            ParsedWorkflow {
                name: name.to_string(),
                project_name: project.to_string(),
                generic_information: vec![KeyValue::new("team", "ops")],
                variables: vec![KeyValue::new("cpu", "4")],
            },
            None,
            Bytes::from(payload),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_workflow_starts_at_revision_one() {
        let (repo, bucket_id) = repo_with_bucket().await;

        let revision = repo
            .create_workflow(bucket_id, content("Flow1", "P"))
            .await
            .unwrap();

        assert_eq!(revision.revision_number(), 1);
        assert_eq!(revision.bucket_id(), bucket_id);
    }

    #[tokio::test]
    async fn test_create_workflow_rejects_unknown_bucket() {
        let (repo, _) = repo_with_bucket().await;

        let result = repo
            .create_workflow(BucketId::new(999), content("Flow1", "P"))
            .await;

        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_revision_numbers_are_sequential() {
        let (repo, bucket_id) = repo_with_bucket().await;

        let first = repo
            .create_workflow(bucket_id, content("Flow1", "P"))
            .await
            .unwrap();

        for expected in 2..=5 {
            let revision = repo
                .create_revision(bucket_id, first.workflow_id(), content("Flow1", "P"))
                .await
                .unwrap();
            assert_eq!(revision.revision_number(), expected);
        }
    }

    #[tokio::test]
    async fn test_concurrent_creates_yield_gap_free_sequence() {
        let (repo, bucket_id) = repo_with_bucket().await;
        let repo = Arc::new(repo);

        let first = repo
            .create_workflow(bucket_id, content("Flow1", "P"))
            .await
            .unwrap();
        let workflow_id = first.workflow_id();

        let mut handles = Vec::new();
        for _ in 0..20 {
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                repo.create_revision(bucket_id, workflow_id, content("Flow1", "P"))
                    .await
                    .unwrap()
                    .revision_number()
            }));
        }

        let mut numbers = vec![first.revision_number()];
        for handle in handles {
            numbers.push(handle.await.unwrap());
        }
        numbers.sort_unstable();

        let expected: Vec<i64> = (1..=21).collect();
        assert_eq!(numbers, expected);
    }

    #[tokio::test]
    async fn test_get_latest_returns_newest_revision() {
        let (repo, bucket_id) = repo_with_bucket().await;

        let first = repo
            .create_workflow(bucket_id, content("Flow1", "P"))
            .await
            .unwrap();
        let second = repo
            .create_revision(bucket_id, first.workflow_id(), content("Flow1 v2", "P"))
            .await
            .unwrap();

        let latest = repo
            .get_latest(bucket_id, first.workflow_id())
            .await
            .unwrap();

        assert_eq!(latest.revision_number(), second.revision_number());
        assert_eq!(latest.name(), "Flow1 v2");
    }

    #[tokio::test]
    async fn test_get_revision_exact_lookup() {
        let (repo, bucket_id) = repo_with_bucket().await;

        let first = repo
            .create_workflow(bucket_id, content("Flow1", "P"))
            .await
            .unwrap();
        repo.create_revision(bucket_id, first.workflow_id(), content("Flow1 v2", "P"))
            .await
            .unwrap();

        let revision = repo
            .get_revision(bucket_id, first.workflow_id(), 1)
            .await
            .unwrap();
        assert_eq!(revision.name(), "Flow1");

        let missing = repo.get_revision(bucket_id, first.workflow_id(), 3).await;
        assert!(matches!(missing, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_payload_round_trip_is_byte_identical() {
        let (repo, bucket_id) = repo_with_bucket().await;

        let payload = br#"<job name="F" projectName="P"><variables/></job>"#.to_vec();
        let created = repo
            .create_workflow(bucket_id, content_with_payload("F", "P", payload.clone()))
            .await
            .unwrap();

        let fetched = repo
            .get_latest(bucket_id, created.workflow_id())
            .await
            .unwrap();

        assert_eq!(fetched.xml_payload().as_ref(), payload.as_slice());
    }

    #[tokio::test]
    async fn test_delete_removes_workflow_and_history() {
        let (repo, bucket_id) = repo_with_bucket().await;

        let first = repo
            .create_workflow(bucket_id, content("Flow1", "P"))
            .await
            .unwrap();
        repo.create_revision(bucket_id, first.workflow_id(), content("Flow1 v2", "P"))
            .await
            .unwrap();

        let deleted = repo
            .delete_workflow(bucket_id, first.workflow_id())
            .await
            .unwrap();
        assert_eq!(deleted.name(), "Flow1 v2");

        let latest = repo.get_latest(bucket_id, first.workflow_id()).await;
        assert!(matches!(latest, Err(DomainError::NotFound { .. })));

        let by_number = repo.get_revision(bucket_id, first.workflow_id(), 1).await;
        assert!(matches!(by_number, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_second_delete_reports_not_found() {
        let (repo, bucket_id) = repo_with_bucket().await;

        let created = repo
            .create_workflow(bucket_id, content("Flow1", "P"))
            .await
            .unwrap();

        repo.delete_workflow(bucket_id, created.workflow_id())
            .await
            .unwrap();

        let second = repo.delete_workflow(bucket_id, created.workflow_id()).await;
        assert!(matches!(second, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_list_latest_returns_one_entry_per_workflow() {
        let (repo, bucket_id) = repo_with_bucket().await;

        let first = repo
            .create_workflow(bucket_id, content("Flow1", "P"))
            .await
            .unwrap();
        repo.create_revision(bucket_id, first.workflow_id(), content("Flow1 v2", "P"))
            .await
            .unwrap();
        repo.create_workflow(bucket_id, content("Flow2", "P"))
            .await
            .unwrap();

        let page = repo
            .list_latest(bucket_id, None, &Pagination::default(), &SortSpec::default())
            .await
            .unwrap();

        assert_eq!(page.total_elements, 2);

        let names: Vec<&str> = page.content.iter().map(|m| m.name.as_str()).collect();
        assert!(names.contains(&"Flow1 v2"));
        assert!(names.contains(&"Flow2"));
        assert!(!names.contains(&"Flow1"));
    }

    #[tokio::test]
    async fn test_list_latest_filter_matches_latest_revision_only() {
        let (repo, bucket_id) = repo_with_bucket().await;

        let first = repo
            .create_workflow(bucket_id, content("Flow1", "P"))
            .await
            .unwrap();

        let filter = parse_query(r#"name = "Flow1""#).unwrap();

        let page = repo
            .list_latest(
                bucket_id,
                Some(&filter),
                &Pagination::default(),
                &SortSpec::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.total_elements, 1);

        // A new latest revision under a different name drops the workflow
        // from the filtered listing
        repo.create_revision(bucket_id, first.workflow_id(), content("Renamed", "P"))
            .await
            .unwrap();

        let page = repo
            .list_latest(
                bucket_id,
                Some(&filter),
                &Pagination::default(),
                &SortSpec::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.total_elements, 0);
    }

    #[tokio::test]
    async fn test_list_latest_pagination_covers_set_exactly() {
        let (repo, bucket_id) = repo_with_bucket().await;

        for i in 0..7 {
            repo.create_workflow(bucket_id, content(&format!("Flow{}", i), "P"))
                .await
                .unwrap();
        }

        let sort = SortSpec::parse("name").unwrap();
        let mut seen = Vec::new();

        for page_index in 0..3 {
            let pagination = Pagination::new(Some(page_index), Some(3)).unwrap();
            let page = repo
                .list_latest(bucket_id, None, &pagination, &sort)
                .await
                .unwrap();

            assert_eq!(page.total_elements, 7);
            assert_eq!(page.total_pages(), 3);
            seen.extend(page.content.into_iter().map(|m| m.name));
        }

        let expected: Vec<String> = (0..7).map(|i| format!("Flow{}", i)).collect();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn test_list_latest_multi_field_sort() {
        let (repo, bucket_id) = repo_with_bucket().await;

        repo.create_workflow(bucket_id, content("B", "P1")).await.unwrap();
        repo.create_workflow(bucket_id, content("A", "P2")).await.unwrap();
        repo.create_workflow(bucket_id, content("A", "P1")).await.unwrap();

        let sort = SortSpec::parse("name:asc,project_name:desc").unwrap();
        let page = repo
            .list_latest(bucket_id, None, &Pagination::default(), &sort)
            .await
            .unwrap();

        let keys: Vec<(String, String)> = page
            .content
            .iter()
            .map(|m| (m.name.clone(), m.project_name.clone()))
            .collect();

        assert_eq!(
            keys,
            vec![
                ("A".to_string(), "P2".to_string()),
                ("A".to_string(), "P1".to_string()),
                ("B".to_string(), "P1".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_list_revisions_most_recent_first() {
        let (repo, bucket_id) = repo_with_bucket().await;

        let first = repo
            .create_workflow(bucket_id, content("Flow1", "P"))
            .await
            .unwrap();
        repo.create_revision(bucket_id, first.workflow_id(), content("Flow1", "P"))
            .await
            .unwrap();
        repo.create_revision(bucket_id, first.workflow_id(), content("Flow1", "P"))
            .await
            .unwrap();

        let page = repo
            .list_revisions(bucket_id, first.workflow_id(), &Pagination::default())
            .await
            .unwrap();

        let numbers: Vec<i64> = page.content.iter().map(|m| m.revision_number).collect();
        assert_eq!(numbers, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn test_workflow_invisible_from_other_bucket() {
        let buckets = Arc::new(InMemoryBucketRepository::new());
        let bucket_a = buckets
            .create(NewBucket::new("a", "admin").unwrap())
            .await
            .unwrap();
        let bucket_b = buckets
            .create(NewBucket::new("b", "admin").unwrap())
            .await
            .unwrap();
        let repo = InMemoryWorkflowRepository::new(buckets);

        let created = repo
            .create_workflow(bucket_a.id(), content("Flow1", "P"))
            .await
            .unwrap();

        let from_other = repo.get_latest(bucket_b.id(), created.workflow_id()).await;
        assert!(matches!(from_other, Err(DomainError::NotFound { .. })));
    }
}
