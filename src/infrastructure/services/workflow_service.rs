//! Workflow service - upload parsing, revision store orchestration and
//! archive import/export

use std::sync::Arc;

use bytes::Bytes;
use futures::future::try_join_all;
use tracing::debug;

use crate::domain::bucket::BucketId;
use crate::domain::page::{Page, Pagination, SortSpec};
use crate::domain::query::parse_query;
use crate::domain::workflow::{
    NewRevision, RevisionMetadata, WorkflowId, WorkflowRepository, WorkflowRevision,
};
use crate::domain::DomainError;
use crate::infrastructure::archive::{self, ExportEntry};
use crate::infrastructure::parser;

/// Workflow service validating uploads and driving the revision store
#[derive(Debug)]
pub struct WorkflowService<R: WorkflowRepository> {
    repository: Arc<R>,
}

impl<R: WorkflowRepository> WorkflowService<R> {
    /// Create a new WorkflowService with the given repository
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Parse an uploaded document into validated revision content
    fn prepare_content(
        payload: Bytes,
        layout: Option<String>,
    ) -> Result<NewRevision, DomainError> {
        let parsed = parser::parse_workflow(&payload)?;
        NewRevision::new(parsed, layout, payload)
    }

    /// Create a workflow from a single uploaded XML document
    pub async fn create_workflow(
        &self,
        bucket_id: BucketId,
        layout: Option<String>,
        payload: Bytes,
    ) -> Result<WorkflowRevision, DomainError> {
        let content = Self::prepare_content(payload, layout)?;

        debug!(bucket_id = %bucket_id, name = content.name(), "Creating workflow");

        self.repository.create_workflow(bucket_id, content).await
    }

    /// Create one workflow per XML entry of an uploaded ZIP archive
    ///
    /// Every entry is unpacked and validated before the first workflow is
    /// created, so a bad entry fails the request without partial imports.
    pub async fn create_workflows_from_archive(
        &self,
        bucket_id: BucketId,
        layout: Option<String>,
        archive: Bytes,
    ) -> Result<Vec<WorkflowRevision>, DomainError> {
        let entries = archive::extract_xml_entries(&archive)?;

        let mut contents = Vec::with_capacity(entries.len());
        for entry in entries {
            let content =
                Self::prepare_content(entry.content, layout.clone()).map_err(|e| {
                    DomainError::invalid_xml(format!("Entry '{}': {}", entry.name, e))
                })?;
            contents.push(content);
        }

        debug!(
            bucket_id = %bucket_id,
            count = contents.len(),
            "Importing workflows from archive"
        );

        let mut created = Vec::with_capacity(contents.len());
        for content in contents {
            created.push(self.repository.create_workflow(bucket_id, content).await?);
        }

        Ok(created)
    }

    /// Append a revision to an existing workflow
    pub async fn create_revision(
        &self,
        bucket_id: BucketId,
        workflow_id: WorkflowId,
        layout: Option<String>,
        payload: Bytes,
    ) -> Result<WorkflowRevision, DomainError> {
        let content = Self::prepare_content(payload, layout)?;

        debug!(
            bucket_id = %bucket_id,
            workflow_id = %workflow_id,
            "Creating workflow revision"
        );

        self.repository
            .create_revision(bucket_id, workflow_id, content)
            .await
    }

    /// Get the latest revision of a workflow
    pub async fn get_latest(
        &self,
        bucket_id: BucketId,
        workflow_id: WorkflowId,
    ) -> Result<WorkflowRevision, DomainError> {
        self.repository.get_latest(bucket_id, workflow_id).await
    }

    /// Get one revision by sequence number
    pub async fn get_revision(
        &self,
        bucket_id: BucketId,
        workflow_id: WorkflowId,
        revision_number: i64,
    ) -> Result<WorkflowRevision, DomainError> {
        self.repository
            .get_revision(bucket_id, workflow_id, revision_number)
            .await
    }

    /// List latest-revision metadata for the bucket's workflows
    pub async fn list(
        &self,
        bucket_id: BucketId,
        query: Option<&str>,
        pagination: &Pagination,
        sort: &SortSpec,
    ) -> Result<Page<RevisionMetadata>, DomainError> {
        let filter = query.map(parse_query).transpose()?;

        self.repository
            .list_latest(bucket_id, filter.as_ref(), pagination, sort)
            .await
    }

    /// List a workflow's revision history, most recent first
    pub async fn list_revisions(
        &self,
        bucket_id: BucketId,
        workflow_id: WorkflowId,
        pagination: &Pagination,
    ) -> Result<Page<RevisionMetadata>, DomainError> {
        self.repository
            .list_revisions(bucket_id, workflow_id, pagination)
            .await
    }

    /// Delete a workflow with its whole history, returning the latest
    /// revision's metadata
    pub async fn delete(
        &self,
        bucket_id: BucketId,
        workflow_id: WorkflowId,
    ) -> Result<WorkflowRevision, DomainError> {
        debug!(bucket_id = %bucket_id, workflow_id = %workflow_id, "Deleting workflow");

        self.repository.delete_workflow(bucket_id, workflow_id).await
    }

    /// Pack the latest payloads of the given workflows into a ZIP archive
    ///
    /// Reads complete before the archive is assembled, so client I/O
    /// failures while streaming the response cannot touch stored state.
    pub async fn export_archive(
        &self,
        bucket_id: BucketId,
        workflow_ids: &[WorkflowId],
    ) -> Result<Bytes, DomainError> {
        let revisions = try_join_all(
            workflow_ids
                .iter()
                .map(|workflow_id| self.repository.get_latest(bucket_id, *workflow_id)),
        )
        .await?;

        let entries: Vec<ExportEntry> = revisions
            .iter()
            .map(|revision| ExportEntry {
                workflow_id: revision.workflow_id().value(),
                name: revision.name().to_string(),
                content: revision.xml_payload().clone(),
            })
            .collect();

        archive::build_archive(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bucket::{BucketRepository, NewBucket};
    use crate::infrastructure::archive::extract_xml_entries;
    use crate::infrastructure::bucket::InMemoryBucketRepository;
    use crate::infrastructure::workflow::InMemoryWorkflowRepository;

    const FLOW1: &[u8] = br#"<job name="Flow1" projectName="CI">
        <variables><variable name="cpu" value="4"/></variables>
    </job>"#;

    const FLOW2: &[u8] = br#"<job name="Flow2" projectName="CI"/>"#;

    async fn service_with_bucket() -> (WorkflowService<InMemoryWorkflowRepository>, BucketId) {
        let buckets = Arc::new(InMemoryBucketRepository::new());
        let bucket = buckets
            .create(NewBucket::new("tools", "admin").unwrap())
            .await
            .unwrap();

        let repository = Arc::new(InMemoryWorkflowRepository::new(buckets));
        (WorkflowService::new(repository), bucket.id())
    }

    fn zip_of(files: &[(&str, &[u8])]) -> Bytes {
        use std::io::{Cursor, Write};
        use zip::write::SimpleFileOptions;
        use zip::ZipWriter;

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in files {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content).unwrap();
        }

        Bytes::from(writer.finish().unwrap().into_inner())
    }

    #[tokio::test]
    async fn test_create_workflow_extracts_metadata() {
        let (service, bucket_id) = service_with_bucket().await;

        let revision = service
            .create_workflow(bucket_id, Some("layout".to_string()), Bytes::from_static(FLOW1))
            .await
            .unwrap();

        assert_eq!(revision.name(), "Flow1");
        assert_eq!(revision.project_name(), "CI");
        assert_eq!(revision.revision_number(), 1);
        assert_eq!(revision.layout(), Some("layout"));
        assert_eq!(revision.variables().len(), 1);
    }

    #[tokio::test]
    async fn test_create_workflow_rejects_malformed_xml() {
        let (service, bucket_id) = service_with_bucket().await;

        let result = service
            .create_workflow(bucket_id, None, Bytes::from_static(b"<job name="))
            .await;

        assert!(matches!(result, Err(DomainError::InvalidXml { .. })));
    }

    #[tokio::test]
    async fn test_revision_sequence_and_latest() {
        let (service, bucket_id) = service_with_bucket().await;

        let first = service
            .create_workflow(bucket_id, None, Bytes::from_static(FLOW1))
            .await
            .unwrap();
        assert_eq!(first.revision_number(), 1);

        let second = service
            .create_revision(bucket_id, first.workflow_id(), None, Bytes::from_static(FLOW1))
            .await
            .unwrap();
        assert_eq!(second.revision_number(), 2);

        let latest = service
            .get_latest(bucket_id, first.workflow_id())
            .await
            .unwrap();
        assert_eq!(latest.revision_number(), 2);
    }

    #[tokio::test]
    async fn test_archive_import_creates_one_workflow_per_entry() {
        let (service, bucket_id) = service_with_bucket().await;

        let archive = zip_of(&[
            ("flow1.xml", FLOW1),
            ("flow2.xml", FLOW2),
            ("notes.txt", b"skipped"),
        ]);

        let created = service
            .create_workflows_from_archive(bucket_id, None, archive)
            .await
            .unwrap();

        assert_eq!(created.len(), 2);
        assert!(created.iter().all(|r| r.revision_number() == 1));

        let page = service
            .list(bucket_id, None, &Pagination::default(), &SortSpec::default())
            .await
            .unwrap();
        assert_eq!(page.total_elements, 2);
    }

    #[tokio::test]
    async fn test_archive_import_fails_whole_request_on_bad_entry() {
        let (service, bucket_id) = service_with_bucket().await;

        let archive = zip_of(&[("flow1.xml", FLOW1), ("broken.xml", b"<job name=")]);

        let result = service
            .create_workflows_from_archive(bucket_id, None, archive)
            .await;
        assert!(matches!(result, Err(DomainError::InvalidXml { .. })));

        // Nothing was created
        let page = service
            .list(bucket_id, None, &Pagination::default(), &SortSpec::default())
            .await
            .unwrap();
        assert_eq!(page.total_elements, 0);
    }

    #[tokio::test]
    async fn test_export_archive_round_trips_payloads() {
        let (service, bucket_id) = service_with_bucket().await;

        let first = service
            .create_workflow(bucket_id, None, Bytes::from_static(FLOW1))
            .await
            .unwrap();
        let second = service
            .create_workflow(bucket_id, None, Bytes::from_static(FLOW2))
            .await
            .unwrap();

        let archive = service
            .export_archive(bucket_id, &[first.workflow_id(), second.workflow_id()])
            .await
            .unwrap();

        let entries = extract_xml_entries(&archive).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "Flow1.xml");
        assert_eq!(entries[0].content.as_ref(), FLOW1);
        assert_eq!(entries[1].content.as_ref(), FLOW2);
    }

    #[tokio::test]
    async fn test_export_archive_missing_workflow_fails() {
        let (service, bucket_id) = service_with_bucket().await;

        let first = service
            .create_workflow(bucket_id, None, Bytes::from_static(FLOW1))
            .await
            .unwrap();

        let result = service
            .export_archive(bucket_id, &[first.workflow_id(), WorkflowId::new(999)])
            .await;

        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_list_rejects_bad_query() {
        let (service, bucket_id) = service_with_bucket().await;

        let result = service
            .list(
                bucket_id,
                Some("name ="),
                &Pagination::default(),
                &SortSpec::default(),
            )
            .await;

        assert!(matches!(result, Err(DomainError::InvalidQuery { .. })));
    }

    #[tokio::test]
    async fn test_list_filters_by_name() {
        let (service, bucket_id) = service_with_bucket().await;

        service
            .create_workflow(bucket_id, None, Bytes::from_static(FLOW1))
            .await
            .unwrap();
        service
            .create_workflow(bucket_id, None, Bytes::from_static(FLOW2))
            .await
            .unwrap();

        let page = service
            .list(
                bucket_id,
                Some(r#"name = "Flow1""#),
                &Pagination::default(),
                &SortSpec::default(),
            )
            .await
            .unwrap();

        assert_eq!(page.total_elements, 1);
        assert_eq!(page.content[0].name, "Flow1");
    }

    #[tokio::test]
    async fn test_delete_then_get_latest_not_found() {
        let (service, bucket_id) = service_with_bucket().await;

        let created = service
            .create_workflow(bucket_id, None, Bytes::from_static(FLOW1))
            .await
            .unwrap();

        let deleted = service
            .delete(bucket_id, created.workflow_id())
            .await
            .unwrap();
        assert_eq!(deleted.name(), "Flow1");

        let result = service.get_latest(bucket_id, created.workflow_id()).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }
}
