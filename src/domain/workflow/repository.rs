//! Workflow repository trait: the revision store contract

use async_trait::async_trait;

use super::entity::{NewRevision, RevisionMetadata, WorkflowId, WorkflowRevision};
use crate::domain::bucket::BucketId;
use crate::domain::page::{Page, Pagination, SortSpec};
use crate::domain::query::QueryExpression;
use crate::domain::DomainError;

/// Repository trait for workflow and revision persistence
///
/// Creation and deletion are the only mutating operations; implementations
/// must make both atomic, and must assign revision numbers race-free under
/// concurrent creators targeting the same workflow.
#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    /// Create a new workflow in the bucket with its first revision
    async fn create_workflow(
        &self,
        bucket_id: BucketId,
        content: NewRevision,
    ) -> Result<WorkflowRevision, DomainError>;

    /// Append a revision to an existing workflow, assigning the next
    /// sequence number
    async fn create_revision(
        &self,
        bucket_id: BucketId,
        workflow_id: WorkflowId,
        content: NewRevision,
    ) -> Result<WorkflowRevision, DomainError>;

    /// Get the most recently created revision of a workflow
    async fn get_latest(
        &self,
        bucket_id: BucketId,
        workflow_id: WorkflowId,
    ) -> Result<WorkflowRevision, DomainError>;

    /// Get one revision by its sequence number
    async fn get_revision(
        &self,
        bucket_id: BucketId,
        workflow_id: WorkflowId,
        revision_number: i64,
    ) -> Result<WorkflowRevision, DomainError>;

    /// List the latest revision of every workflow in the bucket matching
    /// the optional filter, sorted and sliced into one page
    async fn list_latest(
        &self,
        bucket_id: BucketId,
        filter: Option<&QueryExpression>,
        pagination: &Pagination,
        sort: &SortSpec,
    ) -> Result<Page<RevisionMetadata>, DomainError>;

    /// List a workflow's revision history, most recent first
    async fn list_revisions(
        &self,
        bucket_id: BucketId,
        workflow_id: WorkflowId,
        pagination: &Pagination,
    ) -> Result<Page<RevisionMetadata>, DomainError>;

    /// Delete a workflow with all its revisions and owned entries,
    /// returning the latest revision's metadata
    async fn delete_workflow(
        &self,
        bucket_id: BucketId,
        workflow_id: WorkflowId,
    ) -> Result<WorkflowRevision, DomainError>;
}
