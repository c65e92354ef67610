//! Application state for shared services

use std::sync::Arc;

use bytes::Bytes;

use crate::domain::bucket::{Bucket, BucketId, BucketRepository};
use crate::domain::page::{Page, Pagination, SortSpec};
use crate::domain::workflow::{
    RevisionMetadata, WorkflowId, WorkflowRepository, WorkflowRevision,
};
use crate::domain::DomainError;
use crate::infrastructure::services::{BucketService, CreateBucketRequest, WorkflowService};

/// Application state containing shared services using dynamic dispatch
#[derive(Clone)]
pub struct AppState {
    pub bucket_service: Arc<dyn BucketServiceTrait>,
    pub workflow_service: Arc<dyn WorkflowServiceTrait>,
}

/// Trait for bucket service operations
#[async_trait::async_trait]
pub trait BucketServiceTrait: Send + Sync {
    async fn create(&self, request: CreateBucketRequest) -> Result<Bucket, DomainError>;
    async fn get_required(&self, id: BucketId) -> Result<Bucket, DomainError>;
    async fn list(&self, owner: Option<&str>) -> Result<Vec<Bucket>, DomainError>;
    async fn ping(&self) -> Result<(), DomainError>;
}

/// Trait for workflow service operations
#[async_trait::async_trait]
pub trait WorkflowServiceTrait: Send + Sync {
    async fn create_workflow(
        &self,
        bucket_id: BucketId,
        layout: Option<String>,
        payload: Bytes,
    ) -> Result<WorkflowRevision, DomainError>;

    async fn create_workflows_from_archive(
        &self,
        bucket_id: BucketId,
        layout: Option<String>,
        archive: Bytes,
    ) -> Result<Vec<WorkflowRevision>, DomainError>;

    async fn create_revision(
        &self,
        bucket_id: BucketId,
        workflow_id: WorkflowId,
        layout: Option<String>,
        payload: Bytes,
    ) -> Result<WorkflowRevision, DomainError>;

    async fn get_latest(
        &self,
        bucket_id: BucketId,
        workflow_id: WorkflowId,
    ) -> Result<WorkflowRevision, DomainError>;

    async fn get_revision(
        &self,
        bucket_id: BucketId,
        workflow_id: WorkflowId,
        revision_number: i64,
    ) -> Result<WorkflowRevision, DomainError>;

    async fn list(
        &self,
        bucket_id: BucketId,
        query: Option<String>,
        pagination: Pagination,
        sort: SortSpec,
    ) -> Result<Page<RevisionMetadata>, DomainError>;

    async fn list_revisions(
        &self,
        bucket_id: BucketId,
        workflow_id: WorkflowId,
        pagination: Pagination,
    ) -> Result<Page<RevisionMetadata>, DomainError>;

    async fn delete(
        &self,
        bucket_id: BucketId,
        workflow_id: WorkflowId,
    ) -> Result<WorkflowRevision, DomainError>;

    async fn export_archive(
        &self,
        bucket_id: BucketId,
        workflow_ids: Vec<WorkflowId>,
    ) -> Result<Bytes, DomainError>;
}

// Implement traits for the actual services

#[async_trait::async_trait]
impl<R: BucketRepository + 'static> BucketServiceTrait for BucketService<R> {
    async fn create(&self, request: CreateBucketRequest) -> Result<Bucket, DomainError> {
        BucketService::create(self, request).await
    }

    async fn get_required(&self, id: BucketId) -> Result<Bucket, DomainError> {
        BucketService::get_required(self, id).await
    }

    async fn list(&self, owner: Option<&str>) -> Result<Vec<Bucket>, DomainError> {
        BucketService::list(self, owner).await
    }

    async fn ping(&self) -> Result<(), DomainError> {
        BucketService::ping(self).await
    }
}

#[async_trait::async_trait]
impl<R: WorkflowRepository + 'static> WorkflowServiceTrait for WorkflowService<R> {
    async fn create_workflow(
        &self,
        bucket_id: BucketId,
        layout: Option<String>,
        payload: Bytes,
    ) -> Result<WorkflowRevision, DomainError> {
        WorkflowService::create_workflow(self, bucket_id, layout, payload).await
    }

    async fn create_workflows_from_archive(
        &self,
        bucket_id: BucketId,
        layout: Option<String>,
        archive: Bytes,
    ) -> Result<Vec<WorkflowRevision>, DomainError> {
        WorkflowService::create_workflows_from_archive(self, bucket_id, layout, archive).await
    }

    async fn create_revision(
        &self,
        bucket_id: BucketId,
        workflow_id: WorkflowId,
        layout: Option<String>,
        payload: Bytes,
    ) -> Result<WorkflowRevision, DomainError> {
        WorkflowService::create_revision(self, bucket_id, workflow_id, layout, payload).await
    }

    async fn get_latest(
        &self,
        bucket_id: BucketId,
        workflow_id: WorkflowId,
    ) -> Result<WorkflowRevision, DomainError> {
        WorkflowService::get_latest(self, bucket_id, workflow_id).await
    }

    async fn get_revision(
        &self,
        bucket_id: BucketId,
        workflow_id: WorkflowId,
        revision_number: i64,
    ) -> Result<WorkflowRevision, DomainError> {
        WorkflowService::get_revision(self, bucket_id, workflow_id, revision_number).await
    }

    async fn list(
        &self,
        bucket_id: BucketId,
        query: Option<String>,
        pagination: Pagination,
        sort: SortSpec,
    ) -> Result<Page<RevisionMetadata>, DomainError> {
        WorkflowService::list(self, bucket_id, query.as_deref(), &pagination, &sort).await
    }

    async fn list_revisions(
        &self,
        bucket_id: BucketId,
        workflow_id: WorkflowId,
        pagination: Pagination,
    ) -> Result<Page<RevisionMetadata>, DomainError> {
        WorkflowService::list_revisions(self, bucket_id, workflow_id, &pagination).await
    }

    async fn delete(
        &self,
        bucket_id: BucketId,
        workflow_id: WorkflowId,
    ) -> Result<WorkflowRevision, DomainError> {
        WorkflowService::delete(self, bucket_id, workflow_id).await
    }

    async fn export_archive(
        &self,
        bucket_id: BucketId,
        workflow_ids: Vec<WorkflowId>,
    ) -> Result<Bytes, DomainError> {
        WorkflowService::export_archive(self, bucket_id, &workflow_ids).await
    }
}

impl AppState {
    /// Build an in-memory application state (tests and local development)
    pub fn in_memory() -> Self {
        use crate::infrastructure::bucket::InMemoryBucketRepository;
        use crate::infrastructure::workflow::InMemoryWorkflowRepository;

        let bucket_repository = Arc::new(InMemoryBucketRepository::new());
        let workflow_repository = Arc::new(InMemoryWorkflowRepository::new(Arc::clone(
            &bucket_repository,
        )));

        Self {
            bucket_service: Arc::new(BucketService::new(bucket_repository)),
            workflow_service: Arc::new(WorkflowService::new(workflow_repository)),
        }
    }
}
